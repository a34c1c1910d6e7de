//! Binding path grammar
//!
//! Single-pass recursive descent over the raw binding string:
//!
//! ```text
//! path        := segment brackets* ('.' segment brackets*)*
//! segment     := (nested | expression | identifier)+
//! nested      := '{{' path '}}'
//! expression  := '`' [^`]+ '`'
//! brackets    := '[' ws (query | quoted | segment) ws ']'
//! query       := (quoted | segment) ws '='+ ws (quoted | segment)?
//! quoted      := "'" [^'"]+ "'" | '"' [^'"]+ '"'
//! ```
//!
//! Manual implementation (no regex) so every failure reports the character
//! position it happened at.

use crate::error::{Result, ViewbindError};

use super::ast::{
    to_concatenated_node, to_expression, to_nested, to_path, to_query, to_quoted_value, to_value,
    AnyNode, PathNode,
};

const SEGMENT_SEPARATOR: char = '.';
const OPEN_CURL: char = '{';
const CLOSE_CURL: char = '}';
const OPEN_BRACKET: char = '[';
const CLOSE_BRACKET: char = ']';
const EQUALS: char = '=';
const SINGLE_QUOTE: char = '\'';
const DOUBLE_QUOTE: char = '"';
const BACK_TICK: char = '`';

/// Characters that terminate an identifier
#[inline]
fn is_identifier_char(ch: char) -> bool {
    !matches!(
        ch,
        ' ' | '"' | '\'' | '(' | ')' | '*' | '.' | '=' | '[' | ']' | '`' | '{' | '}'
    )
}

/// Parse a raw binding string into its path AST
pub fn parse(input: &str) -> Result<PathNode> {
    let mut grammar = Grammar::new(input);
    let path = grammar.parse_path()?;

    if let Some(ch) = grammar.ch() {
        return Err(grammar.error(format!("Unexpected character: {}", ch)));
    }

    Ok(path)
}

struct Grammar<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Grammar<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    #[inline]
    fn ch(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error(&self, details: impl Into<String>) -> ViewbindError {
        ViewbindError::Syntax {
            input: self.input.to_string(),
            position: self.pos,
            details: details.into(),
        }
    }

    /// Consume `expected` or fail
    fn expect(&mut self, expected: char) -> Result<()> {
        match self.ch() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("Expected char: {} but got: {}", expected, ch))),
            None => Err(self.error(format!("Expected char: {} but got end of input", expected))),
        }
    }

    fn whitespace(&mut self) {
        while self.ch() == Some(' ') {
            self.advance();
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut value = String::new();
        while let Some(ch) = self.ch() {
            if !keep(ch) {
                break;
            }
            value.push(ch);
            self.advance();
        }
        value
    }

    fn identifier(&mut self) -> Option<AnyNode> {
        let value = self.take_while(is_identifier_char);
        (!value.is_empty()).then(|| to_value(value))
    }

    fn expression(&mut self) -> Result<Option<AnyNode>> {
        if self.ch() != Some(BACK_TICK) {
            return Ok(None);
        }
        self.advance();

        let source = self.take_while(|ch| ch != BACK_TICK);
        self.expect(BACK_TICK)?;

        if source.is_empty() {
            return Err(self.error("Empty expression"));
        }
        Ok(Some(to_expression(source)))
    }

    fn nested_path(&mut self) -> Result<Option<AnyNode>> {
        if self.ch() != Some(OPEN_CURL) {
            return Ok(None);
        }
        if self.peek() != Some(OPEN_CURL) {
            self.advance();
            return Err(self.error("Expected char: { (nested references open with '{{')"));
        }
        self.advance();
        self.advance();

        let nested = self.parse_path()?;
        self.expect(CLOSE_CURL)?;
        self.expect(CLOSE_CURL)?;

        Ok(Some(to_nested(nested.path)))
    }

    fn simple_segment(&mut self) -> Result<Option<AnyNode>> {
        if let Some(node) = self.nested_path()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.expression()? {
            return Ok(Some(node));
        }
        Ok(self.identifier())
    }

    /// Adjacent simple segments fuse into one concatenated segment
    fn segment(&mut self) -> Result<Option<AnyNode>> {
        let mut parts = Vec::new();
        while let Some(part) = self.simple_segment()? {
            parts.push(part);
        }

        if parts.is_empty() {
            return Ok(None);
        }
        Ok(Some(to_concatenated_node(parts)))
    }

    fn optionally_quoted_segment(&mut self) -> Result<Option<AnyNode>> {
        self.whitespace();

        match self.ch() {
            Some(quote @ (SINGLE_QUOTE | DOUBLE_QUOTE)) => {
                self.advance();
                let value = self.take_while(|ch| ch != SINGLE_QUOTE && ch != DOUBLE_QUOTE);
                self.expect(quote)?;
                Ok((!value.is_empty()).then(|| to_quoted_value(value)))
            }
            _ => self.simple_segment(),
        }
    }

    /// Accepts `=`, `==` and `===`
    fn equals(&mut self) -> bool {
        if self.ch() != Some(EQUALS) {
            return false;
        }
        while self.ch() == Some(EQUALS) {
            self.advance();
        }
        true
    }

    fn parse_bracket(&mut self) -> Result<Option<AnyNode>> {
        if self.ch() != Some(OPEN_BRACKET) {
            return Ok(None);
        }
        self.advance();
        self.whitespace();

        let first = self
            .optionally_quoted_segment()?
            .ok_or_else(|| self.error("Expected identifier"))?;
        self.whitespace();

        let node = if self.equals() {
            self.whitespace();
            let second = self.optionally_quoted_segment()?;
            self.whitespace();
            to_query(first, second)
        } else {
            first
        };

        self.expect(CLOSE_BRACKET)?;
        Ok(Some(node))
    }

    fn parse_segment_and_brackets(&mut self) -> Result<Vec<AnyNode>> {
        let mut parsed = Vec::new();

        if let Some(first) = self.segment()? {
            parsed.push(first);
            while let Some(bracket) = self.parse_bracket()? {
                parsed.push(bracket);
            }
        }

        Ok(parsed)
    }

    fn parse_path(&mut self) -> Result<PathNode> {
        let mut parts = Vec::new();

        loop {
            let next = self.parse_segment_and_brackets()?;
            let was_empty = next.is_empty();
            parts.extend(next);

            match self.ch() {
                None | Some(CLOSE_CURL) => break,
                Some(ch) if was_empty => {
                    return Err(self.error(format!("Unexpected character: {}", ch)));
                }
                Some(_) => self.expect(SEGMENT_SEPARATOR)?,
            }
        }

        Ok(to_path(parts))
    }
}
