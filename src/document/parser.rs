// Copyright (c) 2025 - Cowboy AI, Inc.
//! Recursive-descent parser for operation documents.
//!
//! Executable definitions are parsed in full. Type-system definitions are
//! skipped structurally and kept as opaque [`TypeSystemDefinition`]s.

use std::collections::BTreeMap;

use super::lexer::{Lexer, Token, TokenKind};
use super::*;

/// Deepest nesting of selection sets, values and list types accepted
pub(crate) const MAX_DEPTH: usize = 64;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

// ==================== TOKEN HELPERS ====================

impl Parser {
    pub(crate) fn new(input: &str) -> Result<Self, DocumentError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn check_name(&self, name: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Name(n) if n == name)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> DocumentError {
        DocumentError::Parse {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> DocumentError {
        let token = self.peek();
        self.error_at(
            token,
            format!("expected {}, found {}", expected, token.kind.name()),
        )
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, DocumentError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.name()))
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, DocumentError>,
    ) -> Result<T, DocumentError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_at(
                self.peek(),
                format!("nesting exceeds {MAX_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect_name(&mut self) -> Result<String, DocumentError> {
        match self.peek().kind.clone() {
            TokenKind::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("name")),
        }
    }
}

// ==================== DEFINITIONS ====================

impl Parser {
    pub(crate) fn parse_document(mut self) -> Result<Document, DocumentError> {
        let mut definitions = Vec::new();
        while !self.check(&TokenKind::Eof) {
            definitions.push(self.parse_definition()?);
        }
        if definitions.is_empty() {
            return Err(self.unexpected("a definition"));
        }
        Ok(Document { definitions })
    }

    fn parse_definition(&mut self) -> Result<Definition, DocumentError> {
        if self.check(&TokenKind::LBrace) {
            let selections = self.parse_selection_set()?;
            return Ok(Definition::OperationDefinition(OperationDefinition {
                operation: OperationType::Query,
                name: None,
                variable_definitions: Vec::new(),
                selections,
            }));
        }

        // Descriptions only precede type-system definitions.
        if self.check(&TokenKind::String(String::new())) {
            self.advance();
        }

        let token = self.peek().clone();
        let TokenKind::Name(keyword) = &token.kind else {
            return Err(self.unexpected("a definition"));
        };

        match keyword.as_str() {
            "query" | "mutation" | "subscription" => {
                Ok(Definition::OperationDefinition(self.parse_operation()?))
            }
            "fragment" => Ok(Definition::FragmentDefinition(self.parse_fragment()?)),
            "extend" => {
                self.advance();
                self.parse_type_system(true)
            }
            other if TypeSystemKeyword::from_keyword(other).is_some() => {
                self.parse_type_system(false)
            }
            other => Err(self.error_at(&token, format!("unknown definition '{other}'"))),
        }
    }

    fn parse_operation(&mut self) -> Result<OperationDefinition, DocumentError> {
        let operation = match self.expect_name()?.as_str() {
            "query" => OperationType::Query,
            "mutation" => OperationType::Mutation,
            _ => OperationType::Subscription,
        };

        let name = if matches!(self.peek().kind, TokenKind::Name(_)) {
            Some(self.expect_name()?)
        } else {
            None
        };

        let mut variable_definitions = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !self.eat(&TokenKind::RParen) {
                variable_definitions.push(self.parse_variable_definition()?);
            }
        }

        self.reject_directives()?;
        let selections = self.parse_selection_set()?;

        Ok(OperationDefinition {
            operation,
            name,
            variable_definitions,
            selections,
        })
    }

    fn parse_variable_definition(&mut self) -> Result<VariableDefinition, DocumentError> {
        self.expect(&TokenKind::Dollar)?;
        let name = self.expect_name()?;
        self.expect(&TokenKind::Colon)?;
        let type_ref = self.parse_type_ref()?;
        let default_value = if self.eat(&TokenKind::Equals) {
            Some(self.parse_value(true)?)
        } else {
            None
        };
        Ok(VariableDefinition {
            name,
            type_ref,
            default_value,
        })
    }

    fn parse_type_ref(&mut self) -> Result<String, DocumentError> {
        let mut rendered = if self.eat(&TokenKind::LBracket) {
            let inner = self.nested(Self::parse_type_ref)?;
            self.expect(&TokenKind::RBracket)?;
            format!("[{inner}]")
        } else {
            self.expect_name()?
        };
        if self.eat(&TokenKind::Bang) {
            rendered.push('!');
        }
        Ok(rendered)
    }

    fn parse_fragment(&mut self) -> Result<FragmentDefinition, DocumentError> {
        self.advance();
        let name = self.expect_name()?;
        if !self.check_name("on") {
            return Err(self.unexpected("'on'"));
        }
        self.advance();
        let type_condition = self.expect_name()?;
        self.reject_directives()?;
        let selections = self.parse_selection_set()?;
        Ok(FragmentDefinition {
            name,
            type_condition,
            selections,
        })
    }

    fn parse_type_system(&mut self, extension: bool) -> Result<Definition, DocumentError> {
        let token = self.advance();
        let keyword = match &token.kind {
            TokenKind::Name(word) => TypeSystemKeyword::from_keyword(word),
            _ => None,
        }
        .ok_or_else(|| self.error_at(&token, "expected a type-system definition"))?;

        let name = match keyword {
            TypeSystemKeyword::Schema => None,
            TypeSystemKeyword::Directive => {
                self.expect(&TokenKind::At)?;
                Some(self.expect_name()?)
            }
            _ => Some(self.expect_name()?),
        };

        self.skip_type_system_body();

        Ok(Definition::TypeSystemDefinition(TypeSystemDefinition {
            keyword,
            name,
            extension,
        }))
    }

    // Consumes tokens up to the end of the current type-system definition:
    // the close of its `{ ... }` body, or the start of the next definition.
    fn skip_type_system_body(&mut self) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek().kind.clone();
            match kind {
                TokenKind::Eof => return,
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && matches!(kind, TokenKind::RBrace) {
                        self.advance();
                        return;
                    }
                }
                TokenKind::String(_) if depth == 0 => return,
                TokenKind::Name(ref word) if depth == 0 && starts_definition(word) => return,
                _ => {}
            }
            self.advance();
        }
    }
}

fn starts_definition(word: &str) -> bool {
    matches!(
        word,
        "query" | "mutation" | "subscription" | "fragment" | "extend"
    ) || TypeSystemKeyword::from_keyword(word).is_some()
}

// ==================== SELECTIONS ====================

impl Parser {
    fn parse_selection_set(&mut self) -> Result<Vec<Selection>, DocumentError> {
        self.nested(Self::parse_selections)
    }

    fn parse_selections(&mut self) -> Result<Vec<Selection>, DocumentError> {
        self.expect(&TokenKind::LBrace)?;
        let mut selections = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            selections.push(self.parse_selection()?);
        }
        if selections.is_empty() {
            let token = self.tokens[self.pos - 1].clone();
            return Err(self.error_at(&token, "selection set cannot be empty"));
        }
        Ok(selections)
    }

    fn parse_selection(&mut self) -> Result<Selection, DocumentError> {
        if self.eat(&TokenKind::Spread) {
            if self.check_name("on") {
                self.advance();
                let type_condition = Some(self.expect_name()?);
                self.reject_directives()?;
                let selections = self.parse_selection_set()?;
                return Ok(Selection::InlineFragment(InlineFragment {
                    type_condition,
                    selections,
                }));
            }
            if self.check(&TokenKind::LBrace) {
                let selections = self.parse_selection_set()?;
                return Ok(Selection::InlineFragment(InlineFragment {
                    type_condition: None,
                    selections,
                }));
            }
            let name = self.expect_name()?;
            self.reject_directives()?;
            return Ok(Selection::FragmentSpread(FragmentSpread { name }));
        }

        let name_token = self.peek().clone();
        let name = self.expect_name()?;
        if self.check(&TokenKind::Colon) {
            return Err(self.error_at(&name_token, "field aliases are not supported"));
        }

        let mut arguments = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !self.eat(&TokenKind::RParen) {
                let name = self.expect_name()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_value(false)?;
                arguments.push(Argument { name, value });
            }
        }

        self.reject_directives()?;

        let selections = if self.check(&TokenKind::LBrace) {
            self.parse_selection_set()?
        } else {
            Vec::new()
        };

        Ok(Selection::Field(Field {
            name,
            arguments,
            selections,
        }))
    }

    fn reject_directives(&self) -> Result<(), DocumentError> {
        if self.check(&TokenKind::At) {
            return Err(self.error_at(self.peek(), "directives are not supported"));
        }
        Ok(())
    }
}

// ==================== VALUES ====================

impl Parser {
    fn parse_value(&mut self, constant: bool) -> Result<InputValue, DocumentError> {
        let token = self.advance();
        Ok(match token.kind.clone() {
            TokenKind::Dollar if !constant => InputValue::Variable(self.expect_name()?),
            TokenKind::Int(n) => InputValue::Int(n),
            TokenKind::Float(n) => InputValue::Float(n),
            TokenKind::String(s) => InputValue::String(s),
            TokenKind::Name(name) => match name.as_str() {
                "true" => InputValue::Boolean(true),
                "false" => InputValue::Boolean(false),
                "null" => InputValue::Null,
                _ => InputValue::Enum(name),
            },
            TokenKind::LBracket => {
                let mut items = Vec::new();
                while !self.eat(&TokenKind::RBracket) {
                    items.push(self.nested(|parser| parser.parse_value(constant))?);
                }
                InputValue::List(items)
            }
            TokenKind::LBrace => {
                let mut fields = BTreeMap::new();
                while !self.eat(&TokenKind::RBrace) {
                    let key = self.expect_name()?;
                    self.expect(&TokenKind::Colon)?;
                    let value = self.nested(|parser| parser.parse_value(constant))?;
                    fields.insert(key, value);
                }
                InputValue::Object(fields)
            }
            TokenKind::Dollar => {
                return Err(self.error_at(&token, "variables are not allowed in default values"))
            }
            other => {
                return Err(self.error_at(
                    &token,
                    format!("expected a value, found {}", other.name()),
                ))
            }
        })
    }
}
