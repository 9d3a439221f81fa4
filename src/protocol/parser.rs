//! Recursive-descent parser for the restricted M2MXML dialect.
//!
//! The dialect has elements and double-quoted attributes only: no text
//! content, no entities, no escapes, no comments. Names are ASCII
//! alphanumeric. The parser never modifies its input; names and attribute
//! values are handed to the [`ElementHandler`] as slices of it.

use tracing::{debug, trace};

use super::error::{Result, SyntaxError};

/// Default cap on attributes per element.
pub const MAX_ATTRIBUTES: usize = 32;

/// Attributes of one start tag, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Attributes<'a> {
    /// Value of the first attribute called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// Attribute pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the tag carried no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Receives element events. Returning an error aborts the parse with it.
pub trait ElementHandler {
    /// A start tag was read.
    fn start_element(&mut self, name: &str, attributes: &Attributes<'_>) -> Result<()>;

    /// The element opened by the matching start tag is complete.
    fn end_element(&mut self, name: &str) -> Result<()>;
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a [u8] {
        &self.input.as_bytes()[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.rest().first().copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &[u8]) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn quoted(&mut self) -> Option<&'a str> {
        let len = self.rest().iter().position(|&c| c == b'"')?;
        let value = &self.input[self.pos..self.pos + len];
        self.pos += len + 1;
        Some(value)
    }

    fn opens_child(&self) -> bool {
        let rest = self.rest();
        rest.first() == Some(&b'<') && rest.get(1) != Some(&b'/')
    }
}

/// Micro-XML parser remembering its most recent syntax error.
#[derive(Debug, Clone)]
pub struct Parser {
    max_depth: usize,
    max_attributes: usize,
    last_error: Option<SyntaxError>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(super::MAX_DEPTH)
    }
}

impl Parser {
    /// Create a parser accepting elements nested up to `max_depth` below the root.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            max_attributes: MAX_ATTRIBUTES,
            last_error: None,
        }
    }

    /// Override the per-element attribute cap.
    #[must_use]
    pub const fn with_max_attributes(mut self, max_attributes: usize) -> Self {
        self.max_attributes = max_attributes;
        self
    }

    /// Most recent syntax error, if any parse has failed on syntax.
    #[must_use]
    pub const fn last_error(&self) -> Option<SyntaxError> {
        self.last_error
    }

    /// Parse one root element, feeding events to `handler`.
    ///
    /// Input following the root element is ignored.
    pub fn parse<H>(&mut self, input: &str, handler: &mut H) -> Result<()>
    where
        H: ElementHandler + ?Sized,
    {
        let mut cursor = Cursor { input, pos: 0 };
        let result = self.element(&mut cursor, handler, 0);
        if let Err(super::Error::Syntax(err)) = &result {
            debug!(offset = cursor.pos, error = %err, "syntax error");
            self.last_error = Some(*err);
        }
        result
    }

    fn element<H>(&self, cursor: &mut Cursor<'_>, handler: &mut H, depth: usize) -> Result<()>
    where
        H: ElementHandler + ?Sized,
    {
        cursor.skip_whitespace();
        if !cursor.eat(b"<") {
            return Err(SyntaxError::BeginElementExpected.into());
        }
        let name = cursor.name();
        if name.is_empty() {
            return Err(SyntaxError::ElementNameExpected.into());
        }
        if depth > self.max_depth {
            return Err(SyntaxError::UnexpectedDepth { depth }.into());
        }

        let attributes = self.attributes(cursor)?;
        trace!(depth, name, attributes = attributes.len(), "start element");

        if cursor.eat(b"/>") {
            handler.start_element(name, &attributes)?;
            return handler.end_element(name);
        }
        if !cursor.eat(b">") {
            return Err(SyntaxError::EndOfElementExpected.into());
        }
        handler.start_element(name, &attributes)?;

        loop {
            cursor.skip_whitespace();
            if !cursor.opens_child() {
                break;
            }
            self.element(cursor, handler, depth + 1)?;
        }

        if !cursor.eat(b"</") {
            return Err(SyntaxError::EndTagExpected.into());
        }
        if !cursor.eat(name.as_bytes()) {
            return Err(SyntaxError::MismatchedEndTag.into());
        }
        cursor.skip_whitespace();
        if !cursor.eat(b">") {
            return Err(SyntaxError::IncompleteEndTag.into());
        }
        trace!(depth, name, "end element");
        handler.end_element(name)
    }

    fn attributes<'a>(&self, cursor: &mut Cursor<'a>) -> Result<Attributes<'a>> {
        let mut attributes = Attributes::default();
        loop {
            cursor.skip_whitespace();
            match cursor.peek() {
                Some(b'/' | b'>') => return Ok(attributes),
                None => return Err(SyntaxError::EndOfElementExpected.into()),
                Some(c) if !c.is_ascii_alphanumeric() => {
                    return Err(SyntaxError::AttributeNameExpected.into());
                }
                Some(_) => {}
            }
            if attributes.len() >= self.max_attributes {
                return Err(SyntaxError::TooManyAttributes {
                    max: self.max_attributes,
                }
                .into());
            }
            let key = cursor.name();
            cursor.skip_whitespace();
            if !cursor.eat(b"=") {
                return Err(SyntaxError::SeparatorExpected.into());
            }
            cursor.skip_whitespace();
            if !cursor.eat(b"\"") {
                return Err(SyntaxError::AttributeValueExpected.into());
            }
            let value = cursor
                .quoted()
                .ok_or(SyntaxError::UnterminatedAttributeValue)?;
            attributes.pairs.push((key, value));
        }
    }
}
