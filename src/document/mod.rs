// Copyright (c) 2025 - Cowboy AI, Inc.
//! Batch Document Model
//!
//! A batch document is an ordered list of definitions. Only operation
//! definitions carry executable units; everything else is kept so the
//! splitter can report it by kind.
//!
//! ```text
//! Document
//!   ├── OperationDefinition (mutation | query | subscription)
//!   │     └── Selection*
//!   │           ├── Field ── Argument*, Selection*
//!   │           ├── InlineFragment
//!   │           └── FragmentSpread
//!   ├── FragmentDefinition
//!   └── TypeSystemDefinition
//! ```
//!
//! The model is serde-(de)serializable with a `kind` tag, so documents can be
//! built from text via [`Document::parse`] or received as JSON.
//!
//! # Example
//!
//! ```rust
//! use cim_mutations::document::Document;
//!
//! let doc = Document::parse("mutation Save { save(id: 1) }").unwrap();
//! assert_eq!(doc.definitions.len(), 1);
//! ```

mod lexer;
mod parser;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while reading or analysing a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The document text is malformed
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A top-level definition is not an operation definition
    #[error("Unrecognized DefinitionNode.kind {kind}")]
    UnsupportedDefinitionKind { kind: String },

    /// A top-level selection is not a plain field
    #[error("Unrecognized SelectionNode.kind {kind}")]
    UnsupportedSelectionKind { kind: String },
}

/// An ordered sequence of definitions submitted as one request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

impl Document {
    /// Parse document text
    pub fn parse(source: &str) -> Result<Self, DocumentError> {
        parser::Parser::new(source)?.parse_document()
    }

    /// A document holding a single operation
    pub fn from_operation(operation: OperationDefinition) -> Self {
        Self {
            definitions: vec![Definition::OperationDefinition(operation)],
        }
    }

    /// Iterate over the operation definitions, skipping everything else
    pub fn operations(&self) -> impl Iterator<Item = &OperationDefinition> {
        self.definitions.iter().filter_map(|def| match def {
            Definition::OperationDefinition(op) => Some(op),
            _ => None,
        })
    }
}

/// Top-level definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Definition {
    OperationDefinition(OperationDefinition),
    FragmentDefinition(FragmentDefinition),
    TypeSystemDefinition(TypeSystemDefinition),
}

impl Definition {
    /// Node kind name, as reported in errors
    pub fn kind(&self) -> &'static str {
        match self {
            Definition::OperationDefinition(_) => "OperationDefinition",
            Definition::FragmentDefinition(_) => "FragmentDefinition",
            Definition::TypeSystemDefinition(def) => def.keyword.kind(),
        }
    }
}

/// Operation type keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub operation: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variable_definitions: Vec<VariableDefinition>,
    pub selections: Vec<Selection>,
}

impl OperationDefinition {
    /// Structural copy of this operation selecting only `field`
    pub fn with_single_field(&self, field: Field) -> Self {
        Self {
            operation: self.operation,
            name: self.name.clone(),
            variable_definitions: self.variable_definitions.clone(),
            selections: vec![Selection::Field(field)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    /// Type reference as written, e.g. `[ID!]!`
    pub type_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<InputValue>,
}

/// Selection within a selection set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
    FragmentSpread(FragmentSpread),
}

impl Selection {
    pub fn kind(&self) -> &'static str {
        match self {
            Selection::Field(_) => "Field",
            Selection::InlineFragment(_) => "InlineFragment",
            Selection::FragmentSpread(_) => "FragmentSpread",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: InputValue) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: InputValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_condition: Option<String>,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentSpread {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

/// Type-system definitions are kept opaque; only their kind and name matter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSystemDefinition {
    pub keyword: TypeSystemKeyword,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub extension: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSystemKeyword {
    Schema,
    Scalar,
    Type,
    Interface,
    Union,
    Enum,
    Input,
    Directive,
}

impl TypeSystemKeyword {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "schema" => Self::Schema,
            "scalar" => Self::Scalar,
            "type" => Self::Type,
            "interface" => Self::Interface,
            "union" => Self::Union,
            "enum" => Self::Enum,
            "input" => Self::Input,
            "directive" => Self::Directive,
            _ => return None,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema => "SchemaDefinition",
            Self::Scalar => "ScalarTypeDefinition",
            Self::Type => "ObjectTypeDefinition",
            Self::Interface => "InterfaceTypeDefinition",
            Self::Union => "UnionTypeDefinition",
            Self::Enum => "EnumTypeDefinition",
            Self::Input => "InputObjectTypeDefinition",
            Self::Directive => "DirectiveDefinition",
        }
    }
}

/// Argument or default value as written in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum InputValue {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<InputValue>),
    Object(BTreeMap<String, InputValue>),
}

impl InputValue {
    /// Bind variables and convert to JSON
    ///
    /// Returns the name of the first unbound variable on failure.
    pub fn bind<'a>(&'a self, variables: &Map<String, Value>) -> Result<Value, &'a str> {
        Ok(match self {
            InputValue::Variable(name) => {
                return variables.get(name).cloned().ok_or(name.as_str());
            }
            InputValue::Int(n) => Value::from(*n),
            InputValue::Float(n) => Value::from(*n),
            InputValue::String(s) | InputValue::Enum(s) => Value::String(s.clone()),
            InputValue::Boolean(b) => Value::Bool(*b),
            InputValue::Null => Value::Null,
            InputValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.bind(variables))
                    .collect::<Result<_, _>>()?,
            ),
            InputValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| Ok::<_, &'a str>((key.clone(), value.bind(variables)?)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}
