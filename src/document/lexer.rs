// Copyright (c) 2025 - Cowboy AI, Inc.
//! Lexer for operation document text.

use super::DocumentError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    String(String),

    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Colon,    // :
    Equals,   // =
    Bang,     // !
    Dollar,   // $
    At,       // @
    Pipe,     // |
    Amp,      // &
    Spread,   // ...

    Eof,
}

impl TokenKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            TokenKind::Name(_) => "name",
            TokenKind::Int(_) => "integer",
            TokenKind::Float(_) => "float",
            TokenKind::String(_) => "string",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Colon => ":",
            TokenKind::Equals => "=",
            TokenKind::Bang => "!",
            TokenKind::Dollar => "$",
            TokenKind::At => "@",
            TokenKind::Pipe => "|",
            TokenKind::Amp => "&",
            TokenKind::Spread => "...",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

pub(crate) struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize all input, always ending with `Eof`.
    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, DocumentError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> DocumentError {
        DocumentError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    // Commas are insignificant, like whitespace.
    fn skip_ignored(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}' => {
                    self.next_char();
                }
                '#' => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.next_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, DocumentError> {
        self.skip_ignored();
        let (line, column) = (self.line, self.column);
        let token = |kind| Token { kind, line, column };

        let Some(c) = self.next_char() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Equals,
            '!' => TokenKind::Bang,
            '$' => TokenKind::Dollar,
            '@' => TokenKind::At,
            '|' => TokenKind::Pipe,
            '&' => TokenKind::Amp,
            '.' => {
                if self.next_char() == Some('.') && self.next_char() == Some('.') {
                    TokenKind::Spread
                } else {
                    return Err(self.error(line, column, "expected '...'"));
                }
            }
            '"' => TokenKind::String(self.read_string(line, column)?),
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::from(c);
                while let Some(c) = self.peek_char() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        self.next_char();
                    } else {
                        break;
                    }
                }
                TokenKind::Name(name)
            }
            c if c == '-' || c.is_ascii_digit() => self.read_number(c, line, column)?,
            other => {
                return Err(self.error(line, column, format!("unexpected character '{other}'")));
            }
        };

        Ok(token(kind))
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<String, DocumentError> {
        let mut value = String::new();
        loop {
            match self.next_char() {
                None | Some('\n') => return Err(self.error(line, column, "unterminated string")),
                Some('"') => return Ok(value),
                Some('\\') => match self.next_char() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('b') => value.push('\u{8}'),
                    Some('f') => value.push('\u{c}'),
                    Some('u') => {
                        let mut hex = String::new();
                        for _ in 0..4 {
                            match self.next_char() {
                                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                                _ => {
                                    return Err(self.error(line, column, "invalid unicode escape"))
                                }
                            }
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| self.error(line, column, "invalid unicode escape"))?;
                        value.push(code);
                    }
                    Some(c @ ('"' | '\\' | '/')) => value.push(c),
                    _ => return Err(self.error(line, column, "invalid escape sequence")),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn read_number(
        &mut self,
        first: char,
        line: usize,
        column: usize,
    ) -> Result<TokenKind, DocumentError> {
        let mut text = String::from(first);
        let mut is_float = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '+' | '-' if text.ends_with(|c| c == 'e' || c == 'E') => {}
                _ => break,
            }
            text.push(c);
            self.next_char();
        }

        let invalid = || DocumentError::Parse {
            line,
            column,
            message: format!("invalid number '{text}'"),
        };
        if is_float {
            text.parse().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse().map(TokenKind::Int).map_err(|_| invalid())
        }
    }
}
