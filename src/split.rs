// Copyright (c) 2025 - Cowboy AI, Inc.
//! Document Splitting and Result-Key Uniquification
//!
//! A batch document is split into one sub-document per top-level field so
//! the execution engine resolves exactly one unit per call:
//!
//! ```text
//! mutation A { save  save  ping }       mutation A { save }   → save
//! mutation B { save }              ──►  mutation A { save }   → save_1
//!                                       mutation A { ping }   → ping
//!                                       mutation B { save }   → save_2
//! ```
//!
//! Result keys depend only on declaration order, never on execution order,
//! so they can be computed before anything runs.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::document::{Definition, Document, DocumentError, Selection};

/// One invocation of a unit within a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitCall {
    /// Field (unit) name as written in the document
    pub name: String,
    /// Collision-free key under which the unit's result and state appear
    pub result_key: String,
}

/// A single-field sub-document paired with its call
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOperation {
    pub document: Document,
    pub call: UnitCall,
}

/// Assign collision-free keys to names in declaration order
///
/// The i-th repeat of a name becomes `name_{i}`. A generated key that is
/// already taken (for example by a field literally named `f_1`) advances
/// the counter until a free key is found.
///
/// # Examples
///
/// ```rust
/// use cim_mutations::split::make_repeated_unique;
///
/// let keys = make_repeated_unique(["f", "g", "f", "f"]);
/// assert_eq!(keys, vec!["f", "g", "f_1", "f_2"]);
/// ```
pub fn make_repeated_unique<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();

    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            let mut count = counts.get(name).copied().unwrap_or(0);
            let mut key = candidate(name, count);
            while used.contains(&key) {
                count += 1;
                key = candidate(name, count);
            }
            counts.insert(name.to_string(), count + 1);
            used.insert(key.clone());
            key
        })
        .collect()
}

fn candidate(name: &str, occurrence: usize) -> String {
    if occurrence == 0 {
        name.to_string()
    } else {
        format!("{name}_{occurrence}")
    }
}

/// Split a batch document into single-field units in declaration order
///
/// Fails before producing anything if a top-level definition is not an
/// operation or a top-level selection is not a plain field.
pub fn split_document(document: &Document) -> Result<Vec<UnitOperation>, DocumentError> {
    let mut units = Vec::new();

    for definition in &document.definitions {
        let Definition::OperationDefinition(operation) = definition else {
            return Err(DocumentError::UnsupportedDefinitionKind {
                kind: definition.kind().to_string(),
            });
        };

        for selection in &operation.selections {
            let Selection::Field(field) = selection else {
                return Err(DocumentError::UnsupportedSelectionKind {
                    kind: selection.kind().to_string(),
                });
            };
            units.push((
                field.name.clone(),
                Document::from_operation(operation.with_single_field(field.clone())),
            ));
        }
    }

    let keys = make_repeated_unique(units.iter().map(|(name, _)| name));

    Ok(units
        .into_iter()
        .zip(keys)
        .map(|((name, document), result_key)| UnitOperation {
            document,
            call: UnitCall { name, result_key },
        })
        .collect())
}

/// The ordered unit calls of a document, without building sub-documents
pub fn unit_calls(document: &Document) -> Result<Vec<UnitCall>, DocumentError> {
    Ok(split_document(document)?
        .into_iter()
        .map(|unit| unit.call)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{OperationType, Selection};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn keys(source: &str) -> Vec<String> {
        unit_calls(&Document::parse(source).unwrap())
            .unwrap()
            .into_iter()
            .map(|call| call.result_key)
            .collect()
    }

    #[test]
    fn test_repeated_field_keys() {
        assert_eq!(keys("mutation { f f f }"), vec!["f", "f_1", "f_2"]);
    }

    #[test]
    fn test_keys_span_operations_in_declaration_order() {
        assert_eq!(
            keys("mutation A { save ping } mutation B { save }"),
            vec!["save", "ping", "save_1"]
        );
    }

    #[test]
    fn test_generated_key_collision_advances() {
        assert_eq!(
            make_repeated_unique(["f", "f_1", "f"]),
            vec!["f", "f_1", "f_2"]
        );
        assert_eq!(
            make_repeated_unique(["f", "f", "f_1"]),
            vec!["f", "f_1", "f_1_1"]
        );
    }

    #[test]
    fn test_sub_documents_hold_one_field() {
        let doc = Document::parse("mutation M($x: Int) { a(v: $x) { id } b }").unwrap();
        let units = split_document(&doc).unwrap();

        assert_eq!(units.len(), 2);
        for unit in &units {
            let ops: Vec<_> = unit.document.operations().collect();
            assert_eq!(ops.len(), 1);
            assert_eq!(ops[0].operation, OperationType::Mutation);
            assert_eq!(ops[0].name.as_deref(), Some("M"));
            assert_eq!(ops[0].variable_definitions.len(), 1);
            assert_eq!(ops[0].selections.len(), 1);
            let Selection::Field(field) = &ops[0].selections[0] else {
                panic!("expected field");
            };
            assert_eq!(field.name, unit.call.name);
        }
        // The input is left untouched.
        assert_eq!(doc.operations().next().unwrap().selections.len(), 2);
    }

    #[test]
    fn test_inline_fragment_is_rejected() {
        let doc = Document::parse("mutation { a ... on Mutation { b } }").unwrap();
        assert_eq!(
            split_document(&doc),
            Err(DocumentError::UnsupportedSelectionKind {
                kind: "InlineFragment".into()
            })
        );
    }

    #[test]
    fn test_non_operation_definition_is_rejected() {
        let doc = Document::parse("mutation { a } input Thing { x: Int }").unwrap();
        assert_eq!(
            split_document(&doc),
            Err(DocumentError::UnsupportedDefinitionKind {
                kind: "InputObjectTypeDefinition".into()
            })
        );
    }

    proptest! {
        #[test]
        fn prop_keys_are_unique(names in prop::collection::vec("[ab](_[12])?", 0..24)) {
            let keys = make_repeated_unique(&names);
            let distinct: HashSet<_> = keys.iter().collect();
            prop_assert_eq!(distinct.len(), keys.len());
        }

        #[test]
        fn prop_first_occurrence_keeps_its_name(names in prop::collection::vec("[a-c]", 0..24)) {
            let keys = make_repeated_unique(&names);
            let mut seen = HashSet::new();
            for (name, key) in names.iter().zip(&keys) {
                if seen.insert(name.clone()) {
                    prop_assert_eq!(name, key);
                } else {
                    let prefix = format!("{name}_");
                    prop_assert!(key.starts_with(&prefix));
                }
            }
        }

        #[test]
        fn prop_keys_are_deterministic(names in prop::collection::vec("[a-c]{1,2}", 0..24)) {
            prop_assert_eq!(make_repeated_unique(&names), make_repeated_unique(&names));
        }
    }
}
