// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Block syntax: `Type Name? { key: value ... nested blocks }`.
//!
//! Values are strings (`"..."`), integers, `true`/`false`, bare words, references (`@Name`) and
//! reference lists (`[@A, @B]`). `//` starts a line comment. `;` may separate items.

use super::{ParseDiagnostic, ParseOutcome, SyntaxParser};
use crate::model::{Property, Reference, SourceSpan, SyntaxNode, SyntaxTree, Value};

pub const DOCUMENT_TYPE: &str = "Document";
pub const ROOT_CONTAINMENT: &str = "elements";
pub const NESTED_CONTAINMENT: &str = "children";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockParseError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { offset: usize, ch: char },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("integer out of range at offset {offset}: {text}")]
    IntegerOutOfRange { offset: usize, text: String },
    #[error("expected {expected} at offset {offset}, found {found}")]
    Expected { offset: usize, expected: &'static str, found: String },
    #[error("unexpected '}}' at offset {offset}")]
    UnbalancedBrace { offset: usize },
}

impl BlockParseError {
    pub fn offset(&self) -> usize {
        match self {
            Self::UnexpectedChar { offset, .. }
            | Self::UnterminatedString { offset }
            | Self::IntegerOutOfRange { offset, .. }
            | Self::Expected { offset, .. }
            | Self::UnbalancedBrace { offset } => *offset,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockParser;

impl SyntaxParser for BlockParser {
    fn parse(&self, text: &str, generation: u64) -> ParseOutcome {
        match parse_block_document(text, generation) {
            Ok(tree) => ParseOutcome { tree: Some(tree), diagnostics: Vec::new() },
            Err(err) => {
                let offset = err.offset().min(text.len());
                ParseOutcome {
                    tree: None,
                    diagnostics: vec![ParseDiagnostic {
                        message: err.to_string(),
                        span: SourceSpan::new(offset, offset),
                    }],
                }
            }
        }
    }
}

/// Parses and links a block document.
pub fn parse_block_document(text: &str, generation: u64) -> Result<SyntaxTree, BlockParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0, text_len: text.len() };

    let (properties, children) = parser.parse_items()?;
    if let Some(token) = parser.peek() {
        return Err(BlockParseError::UnbalancedBrace { offset: token.span.start });
    }

    let whole = SourceSpan::new(0, text.len());
    let mut root = SyntaxNode::new(DOCUMENT_TYPE, None).with_span(whole, Some(whole));
    for property in properties {
        root = root.with_property(property);
    }
    for child in children {
        root = root.with_child(ROOT_CONTAINMENT, child);
    }

    let mut tree = SyntaxTree::new(root, generation);
    tree.link();
    Ok(tree)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semicolon,
    At,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            Self::Ident(value) => format!("identifier '{value}'"),
            Self::Str(_) => "string".to_owned(),
            Self::Int(value) => format!("integer {value}"),
            Self::LBrace => "'{'".to_owned(),
            Self::RBrace => "'}'".to_owned(),
            Self::LBracket => "'['".to_owned(),
            Self::RBracket => "']'".to_owned(),
            Self::Colon => "':'".to_owned(),
            Self::Comma => "','".to_owned(),
            Self::Semicolon => "';'".to_owned(),
            Self::At => "'@'".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    span: SourceSpan,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

fn tokenize(text: &str) -> Result<Vec<Token>, BlockParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let single = |kind| Token { kind, span: SourceSpan::new(start, start + 1) };
        match ch {
            c if c.is_whitespace() => {}
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                while let Some((_, c)) = chars.peek() {
                    if *c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '{' => tokens.push(single(TokenKind::LBrace)),
            '}' => tokens.push(single(TokenKind::RBrace)),
            '[' => tokens.push(single(TokenKind::LBracket)),
            ']' => tokens.push(single(TokenKind::RBracket)),
            ':' => tokens.push(single(TokenKind::Colon)),
            ',' => tokens.push(single(TokenKind::Comma)),
            ';' => tokens.push(single(TokenKind::Semicolon)),
            '@' => tokens.push(single(TokenKind::At)),
            '"' => {
                let mut value = String::new();
                let mut end = None;
                while let Some((idx, c)) = chars.next() {
                    match c {
                        '"' => {
                            end = Some(idx + 1);
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        '\n' => break,
                        other => value.push(other),
                    }
                }
                let Some(end) = end else {
                    return Err(BlockParseError::UnterminatedString { offset: start });
                };
                tokens.push(Token { kind: TokenKind::Str(value), span: SourceSpan::new(start, end) });
            }
            c if c.is_ascii_digit() || (c == '-' && matches!(chars.peek(), Some((_, d)) if d.is_ascii_digit())) => {
                let mut end = start + c.len_utf8();
                while let Some((idx, d)) = chars.peek().copied() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = idx + d.len_utf8();
                    chars.next();
                }
                let raw = &text[start..end];
                let value = raw.parse::<i64>().map_err(|_| BlockParseError::IntegerOutOfRange {
                    offset: start,
                    text: raw.to_owned(),
                })?;
                tokens.push(Token { kind: TokenKind::Int(value), span: SourceSpan::new(start, end) });
            }
            c if is_ident_start(c) => {
                let mut end = start + c.len_utf8();
                while let Some((idx, d)) = chars.peek().copied() {
                    if !is_ident_continue(d) {
                        break;
                    }
                    end = idx + d.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(text[start..end].to_owned()),
                    span: SourceSpan::new(start, end),
                });
            }
            other => return Err(BlockParseError::UnexpectedChar { offset: start, ch: other }),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    text_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    fn error_here(&self, expected: &'static str) -> BlockParseError {
        match self.peek() {
            Some(token) => BlockParseError::Expected {
                offset: token.span.start,
                expected,
                found: token.kind.describe(),
            },
            None => BlockParseError::Expected {
                offset: self.text_len,
                expected,
                found: "end of input".to_owned(),
            },
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<(String, SourceSpan), BlockParseError> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident(value), span }) => {
                let result = (value.clone(), *span);
                self.pos += 1;
                Ok(result)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    /// Items until a closing brace (not consumed) or end of input.
    fn parse_items(&mut self) -> Result<(Vec<Property>, Vec<SyntaxNode>), BlockParseError> {
        let mut properties = Vec::new();
        let mut children = Vec::new();

        loop {
            match self.peek_kind_at(0) {
                None | Some(TokenKind::RBrace) => break,
                Some(TokenKind::Semicolon) => {
                    self.pos += 1;
                }
                Some(TokenKind::Ident(_)) => {
                    if matches!(self.peek_kind_at(1), Some(TokenKind::Colon)) {
                        properties.push(self.parse_property()?);
                    } else {
                        children.push(self.parse_block()?);
                    }
                }
                Some(_) => return Err(self.error_here("property or construct")),
            }
        }

        Ok((properties, children))
    }

    fn parse_block(&mut self) -> Result<SyntaxNode, BlockParseError> {
        let (node_type, type_span) = self.expect_ident("construct type")?;
        let name = match self.peek_kind_at(0) {
            Some(TokenKind::Ident(_)) => Some(self.expect_ident("construct name")?.0),
            _ => None,
        };

        let open = match self.peek() {
            Some(Token { kind: TokenKind::LBrace, span }) => *span,
            _ => return Err(self.error_here("'{'")),
        };
        self.pos += 1;

        let (properties, children) = self.parse_items()?;
        let close = match self.next() {
            Some(Token { kind: TokenKind::RBrace, span }) => span,
            _ => return Err(self.error_here("'}'")),
        };

        let mut node = SyntaxNode::new(node_type, name).with_span(
            SourceSpan::new(type_span.start, close.end),
            Some(SourceSpan::new(open.end, close.start)),
        );
        for property in properties {
            node = node.with_property(property);
        }
        for child in children {
            node = node.with_child(NESTED_CONTAINMENT, child);
        }
        Ok(node)
    }

    fn parse_property(&mut self) -> Result<Property, BlockParseError> {
        let (key, key_span) = self.expect_ident("property name")?;
        // Colon was checked by the caller.
        self.pos += 1;
        let (value, value_end) = self.parse_value()?;
        Ok(Property::new(key, value, SourceSpan::new(key_span.start, value_end)))
    }

    fn parse_reference(&mut self) -> Result<Reference, BlockParseError> {
        let at = match self.peek() {
            Some(Token { kind: TokenKind::At, span }) => *span,
            _ => return Err(self.error_here("'@'")),
        };
        self.pos += 1;
        let (name, name_span) = self.expect_ident("reference name")?;
        Ok(Reference::new(name, SourceSpan::new(at.start, name_span.end)))
    }

    fn parse_value(&mut self) -> Result<(Value, usize), BlockParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("value"));
        };

        match token.kind {
            TokenKind::Str(value) => {
                self.pos += 1;
                Ok((Value::Str(value), token.span.end))
            }
            TokenKind::Int(value) => {
                self.pos += 1;
                Ok((Value::Int(value), token.span.end))
            }
            TokenKind::Ident(word) => {
                self.pos += 1;
                let value = match word.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::Str(word),
                };
                Ok((value, token.span.end))
            }
            TokenKind::At => {
                let reference = self.parse_reference()?;
                let end = reference.span().end;
                Ok((Value::Ref(reference), end))
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let mut references = Vec::new();
                loop {
                    match self.peek_kind_at(0) {
                        Some(TokenKind::RBracket) => break,
                        Some(TokenKind::At) => references.push(self.parse_reference()?),
                        _ => return Err(self.error_here("reference or ']'")),
                    }
                    match self.peek_kind_at(0) {
                        Some(TokenKind::Comma) => self.pos += 1,
                        Some(TokenKind::RBracket) => {}
                        _ => return Err(self.error_here("',' or ']'")),
                    }
                }
                let close = self.next().map(|t| t.span.end).unwrap_or(self.text_len);
                Ok((Value::RefList(references), close))
            }
            _ => Err(self.error_here("value")),
        }
    }
}
