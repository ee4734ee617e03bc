//! Registry Syntax Scanner
//!
//! A delimiter-matching scanner over the object-literal subset of TypeScript
//! that the sensor registry is written in. It produces a tree of values with
//! byte spans so that extraction and text rewriting never depend on
//! indentation or non-greedy pattern matching.
//!
//! ## Recognised constructs
//!
//! - object literals (`{ key: value, ... }`) with identifier, quoted or
//!   numeric keys
//! - array literals (`[ ... ]`)
//! - string literals (`'..'`, `".."`, and template literals with `${..}`)
//! - line and block comments
//! - everything else is an opaque expression that still records any object
//!   or array literals nested inside it
//!
//! Anything outside a top-level delimiter (imports, `export const X =`, type
//! annotations) is skipped. Only unbalanced delimiters and unterminated
//! strings or comments are errors.

use std::ops::Range;

use thiserror::Error;

/// Byte range into the scanned source
pub type Span = Range<usize>;

/// Fatal scan error with a 1-based source position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// A scanned value
#[derive(Debug, Clone)]
pub enum Value {
    Object(ObjectNode),
    Array(ArrayNode),
    Str(StrNode),
    Expr(ExprNode),
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::Object(o) => o.span.clone(),
            Value::Array(a) => a.span.clone(),
            Value::Str(s) => s.span.clone(),
            Value::Expr(e) => e.span.clone(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// String contents, for non-interpolated literals only
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) if !s.interpolated => Some(&s.value),
            _ => None,
        }
    }

    /// Direct child values in document order
    pub fn children(&self) -> Vec<&Value> {
        match self {
            Value::Object(o) => o
                .members
                .iter()
                .map(|m| match m {
                    Member::Property(p) => &p.value,
                    Member::Other(v) => v,
                })
                .collect(),
            Value::Array(a) => a.items.iter().collect(),
            Value::Str(s) => s.nested.iter().collect(),
            Value::Expr(e) => e.nested.iter().collect(),
        }
    }
}

/// Object literal
#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// From the opening `{` to just past the closing `}`
    pub span: Span,
    pub members: Vec<Member>,
}

impl ObjectNode {
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.members.iter().filter_map(|m| match m {
            Member::Property(p) => Some(p),
            Member::Other(_) => None,
        })
    }

    /// First property with this key
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties().find(|p| p.key == key)
    }

    /// The first member, if it is a `key: value` property
    pub fn first_property(&self) -> Option<&Property> {
        match self.members.first() {
            Some(Member::Property(p)) => Some(p),
            _ => None,
        }
    }

    /// Offset of the closing `}`
    pub fn close_offset(&self) -> usize {
        self.span.end - 1
    }
}

/// Member of an object literal
#[derive(Debug, Clone)]
pub enum Member {
    Property(Property),
    /// Spread, shorthand, method or anything else that is not `key: value`
    Other(Value),
}

/// A `key: value` property
#[derive(Debug, Clone)]
pub struct Property {
    pub key: String,
    pub key_span: Span,
    pub value: Value,
    /// Offset of the `,` following the value, if any
    pub comma: Option<usize>,
}

impl Property {
    /// From the key to the end of the value (comma excluded)
    pub fn span(&self) -> Span {
        self.key_span.start..self.value.span().end
    }
}

#[derive(Debug, Clone)]
pub struct ArrayNode {
    pub span: Span,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct StrNode {
    /// Includes the quotes
    pub span: Span,
    /// Unescaped literal text (interpolations omitted)
    pub value: String,
    pub interpolated: bool,
    /// Values found inside `${..}` interpolations
    pub nested: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub span: Span,
    pub nested: Vec<Value>,
}

/// Walk control returned by visitors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// Pre-order walk over a value and its descendants
pub fn walk<'a, F>(value: &'a Value, visitor: &mut F)
where
    F: FnMut(&'a Value) -> Visit,
{
    if visitor(value) == Visit::Descend {
        for child in value.children() {
            walk(child, visitor);
        }
    }
}

/// A scanned source file
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Top-level object/array literals (and values found in top-level groups)
    pub roots: Vec<Value>,
}

impl Document {
    pub fn walk<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a Value) -> Visit,
    {
        for root in &self.roots {
            walk(root, visitor);
        }
    }

    /// Top-level object literals
    pub fn root_objects(&self) -> impl Iterator<Item = &ObjectNode> {
        self.roots.iter().filter_map(Value::as_object)
    }
}

/// Scan a registry source into a [`Document`]
pub fn parse_document(src: &str) -> Result<Document, SyntaxError> {
    let mut parser = Parser::new(src);
    let mut roots = Vec::new();
    let mut prev = None;

    loop {
        parser.skip_trivia()?;
        match parser.peek() {
            None => break,
            Some(b'{') => roots.push(Value::Object(parser.parse_object()?)),
            Some(b'[') => roots.push(Value::Array(parser.parse_array()?)),
            Some(b'(') => {
                let open = parser.pos;
                parser.pos += 1;
                roots.extend(parser.parse_sequence(b')', open)?);
            }
            Some(close @ (b'}' | b']' | b')')) => {
                return Err(parser.error(parser.pos, format!("unexpected '{}'", close as char)));
            }
            Some(quote @ (b'\'' | b'"' | b'`')) => {
                let s = parser.parse_string(quote)?;
                roots.extend(s.nested);
            }
            Some(b'/') if regex_allowed(prev) && parser.skip_regex() => {}
            Some(_) => parser.pos += 1,
        }
        prev = parser.pos.checked_sub(1).map(|i| parser.bytes[i]);
    }

    Ok(Document { roots })
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        let (line, column) = line_col(self.src, offset);
        SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    self.pos = line_end(self.src, self.pos);
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    match self.src[self.pos + 2..].find("*/") {
                        Some(i) => self.pos += i + 4,
                        None => return Err(self.error(self.pos, "unterminated block comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Parse one value up to the next `,` `;` or closing delimiter.
    ///
    /// A lone object, array or string literal is returned as itself; any
    /// longer expression becomes [`Value::Expr`].
    fn parse_value(&mut self) -> Result<Value, SyntaxError> {
        self.skip_trivia()?;
        let start = self.pos;
        let mut end = start;
        let mut nested = Vec::new();
        let mut tokens = 0usize;
        let mut prev = None;

        loop {
            match self.peek() {
                None | Some(b',' | b';' | b'}' | b']' | b')') => break,
                Some(b'{') => nested.push(Value::Object(self.parse_object()?)),
                Some(b'[') => nested.push(Value::Array(self.parse_array()?)),
                Some(quote @ (b'\'' | b'"' | b'`')) => {
                    nested.push(Value::Str(self.parse_string(quote)?));
                }
                Some(b'(') => {
                    let open = self.pos;
                    self.pos += 1;
                    nested.extend(self.parse_sequence(b')', open)?);
                    tokens += 1;
                }
                Some(b'/') if regex_allowed(prev) && self.skip_regex() => tokens += 1,
                Some(_) => {
                    self.pos += 1;
                    tokens += 1;
                }
            }
            prev = self.pos.checked_sub(1).map(|i| self.bytes[i]);
            end = self.pos;
            self.skip_trivia()?;
        }

        if tokens == 0 && nested.len() == 1 {
            if let Some(only) = nested.pop() {
                return Ok(only);
            }
        }

        Ok(Value::Expr(ExprNode {
            span: start..end,
            nested,
        }))
    }

    /// Parse values until `close`; the opener has already been consumed
    fn parse_sequence(&mut self, close: u8, open: usize) -> Result<Vec<Value>, SyntaxError> {
        let mut values = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => {
                    let opener = self.bytes[open] as char;
                    return Err(self.error(open, format!("unclosed '{}'", opener)));
                }
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(values);
                }
                Some(b',' | b';') => self.pos += 1,
                Some(other @ (b'}' | b']' | b')')) => {
                    return Err(self.mismatched(close, other));
                }
                Some(_) => values.push(self.parse_value()?),
            }
        }
    }

    fn mismatched(&self, expected: u8, found: u8) -> SyntaxError {
        self.error(
            self.pos,
            format!(
                "mismatched '{}', expected '{}'",
                found as char, expected as char
            ),
        )
    }

    fn parse_object(&mut self) -> Result<ObjectNode, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let mut members = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error(open, "unclosed '{'")),
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b',' | b';') => {
                    self.pos += 1;
                    continue;
                }
                Some(other @ (b']' | b')')) => return Err(self.mismatched(b'}', other)),
                Some(_) => {}
            }

            match self.try_property_key()? {
                Some((key, key_span)) => {
                    let value = self.parse_value()?;
                    self.skip_trivia()?;
                    let comma = (self.peek() == Some(b',')).then_some(self.pos);
                    members.push(Member::Property(Property {
                        key,
                        key_span,
                        value,
                        comma,
                    }));
                }
                None => members.push(Member::Other(self.parse_value()?)),
            }
        }

        Ok(ObjectNode {
            span: open..self.pos,
            members,
        })
    }

    fn parse_array(&mut self) -> Result<ArrayNode, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let items = self.parse_sequence(b']', open)?;
        Ok(ArrayNode {
            span: open..self.pos,
            items,
        })
    }

    /// Consume `key:` if present, otherwise leave the position untouched
    fn try_property_key(&mut self) -> Result<Option<(String, Span)>, SyntaxError> {
        let start = self.pos;
        let key = match self.peek() {
            Some(quote @ (b'\'' | b'"')) => self.parse_string(quote)?.value,
            Some(b) if is_ident_start(b) || b.is_ascii_digit() => {
                while self.peek().is_some_and(is_ident_continue) {
                    self.pos += 1;
                }
                self.src[start..self.pos].to_string()
            }
            _ => return Ok(None),
        };
        let key_end = self.pos;

        self.skip_trivia()?;
        if self.peek() == Some(b':') && self.peek_at(1) != Some(b':') {
            self.pos += 1;
            Ok(Some((key, start..key_end)))
        } else {
            self.pos = start;
            Ok(None)
        }
    }

    /// Consume a regex literal at `/`, flags included. Leaves the position
    /// untouched and returns false when no closing `/` is found on the line.
    fn skip_regex(&mut self) -> bool {
        let mut i = self.pos + 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(i) {
                None | Some(b'\n' | b'\r') => return false,
                Some(b'\\') => i += 2,
                Some(b'[') => {
                    in_class = true;
                    i += 1;
                }
                Some(b']') => {
                    in_class = false;
                    i += 1;
                }
                Some(b'/') if !in_class => break,
                Some(_) => i += 1,
            }
        }
        i += 1;
        while self.bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
        }
        self.pos = i;
        true
    }

    fn parse_string(&mut self, quote: u8) -> Result<StrNode, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut nested = Vec::new();
        let mut interpolated = false;
        let mut chunk = self.pos;

        loop {
            match self.peek() {
                None => return Err(self.error(start, "unterminated string literal")),
                Some(b'\n') if quote != b'`' => {
                    return Err(self.error(start, "unterminated string literal"));
                }
                Some(b'\\') => {
                    value.push_str(&self.src[chunk..self.pos]);
                    let Some(escaped) = self.src[self.pos + 1..].chars().next() else {
                        return Err(self.error(start, "unterminated string literal"));
                    };
                    if let Some(c) = unescape(escaped) {
                        value.push(c);
                    }
                    self.pos += 1 + escaped.len_utf8();
                    chunk = self.pos;
                }
                Some(b) if b == quote => {
                    value.push_str(&self.src[chunk..self.pos]);
                    self.pos += 1;
                    break;
                }
                Some(b'$') if quote == b'`' && self.peek_at(1) == Some(b'{') => {
                    value.push_str(&self.src[chunk..self.pos]);
                    let open = self.pos + 1;
                    self.pos += 2;
                    nested.extend(self.parse_sequence(b'}', open)?);
                    interpolated = true;
                    chunk = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }

        Ok(StrNode {
            span: start..self.pos,
            value,
            interpolated,
            nested,
        })
    }
}

/// A `/` after `prev` starts an operand (regex) rather than a division
fn regex_allowed(prev: Option<u8>) -> bool {
    match prev {
        None => true,
        Some(b) => matches!(
            b,
            b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b';' | b'>'
        ),
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn unescape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        // line continuation
        '\n' => None,
        other => Some(other),
    }
}

fn floor_boundary(src: &str, offset: usize) -> usize {
    let mut offset = offset.min(src.len());
    while !src.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// 1-based line and column (in characters) of a byte offset
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let before = &src[..floor_boundary(src, offset)];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    (line, column)
}

/// 1-based line number of a byte offset
pub fn line_number(src: &str, offset: usize) -> usize {
    line_col(src, offset).0
}

/// Offset of the first byte of the line containing `offset`
pub fn line_start(src: &str, offset: usize) -> usize {
    let offset = floor_boundary(src, offset);
    src[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Offset of the `\n` ending the line containing `offset` (or the source length)
pub fn line_end(src: &str, offset: usize) -> usize {
    let offset = floor_boundary(src, offset);
    src[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(src.len())
}
