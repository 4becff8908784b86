//! Pull-based token stream over quick-xml
//!
//! The whole input is tokenised up front into start, end and text tokens
//! carrying resolved namespace URIs and source positions. Empty elements
//! produce a single start token whose [`XmlToken::is_end`] is also true.
//! A well-formedness error stops tokenisation: tokens before the error stay
//! available and [`XmlInputStream::is_error`] reports the failure.

use crate::error::Result;
use crate::limits::Limits;
use crate::names::split_qname;
use crate::namespaces::{XmlNamespaces, XML_NAMESPACE};
use crate::xml::node::XmlAttribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::VecDeque;

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Start tag (or empty element)
    Start,
    /// End tag
    End,
    /// Character data
    Text,
}

/// One token from the stream
#[derive(Debug, Clone, PartialEq)]
pub struct XmlToken {
    kind: TokenKind,
    empty: bool,
    /// Local name
    pub name: String,
    /// Prefix (empty when unprefixed)
    pub prefix: String,
    /// Resolved namespace URI (empty when none)
    pub uri: String,
    /// Attributes other than namespace declarations
    pub attributes: Vec<XmlAttribute>,
    /// Namespace declarations made on this element
    pub namespaces: XmlNamespaces,
    /// Character data for text tokens
    pub chars: String,
    /// Source line (1-based)
    pub line: u32,
    /// Source column (1-based)
    pub column: u32,
}

impl XmlToken {
    fn new(kind: TokenKind, line: u32, column: u32) -> Self {
        Self {
            kind,
            empty: false,
            name: String::new(),
            prefix: String::new(),
            uri: String::new(),
            attributes: Vec::new(),
            namespaces: XmlNamespaces::new(),
            chars: String::new(),
            line,
            column,
        }
    }

    /// Token kind
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Check if this token opens an element
    pub fn is_start(&self) -> bool {
        self.kind == TokenKind::Start
    }

    /// Check if this token closes an element (true for empty elements too)
    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End || self.empty
    }

    /// Check if this is character data
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }

    /// Check if this is the end tag matching `start`
    pub fn is_end_for(&self, start: &XmlToken) -> bool {
        self.kind == TokenKind::End && self.name == start.name && self.prefix == start.prefix
    }

    /// Value of the unprefixed attribute `name`
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.prefix.is_empty())
            .map(|a| a.value.as_str())
    }

    /// `prefix:name` or `name`
    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.prefix, self.name)
        }
    }
}

/// A tokenizer failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    /// Description from the tokenizer
    pub message: String,
    /// Line of the failure
    pub line: u32,
    /// Column of the failure
    pub column: u32,
}

/// Pre-tokenised XML input
#[derive(Debug)]
pub struct XmlInputStream {
    tokens: VecDeque<XmlToken>,
    error: Option<StreamError>,
    encoding: Option<String>,
    xml_version: Option<String>,
}

impl XmlInputStream {
    /// Tokenise `text` with default limits
    pub fn new(text: &str) -> Result<Self> {
        Self::with_limits(text, &Limits::default())
    }

    /// Tokenise `text`, failing when it exceeds `limits`
    pub fn with_limits(text: &str, limits: &Limits) -> Result<Self> {
        limits.check_document_size(text.len())?;
        Tokenizer::new(text, limits).run()
    }

    /// Look at the next token without consuming it
    pub fn peek(&self) -> Option<&XmlToken> {
        self.tokens.front()
    }

    /// Consume the next token
    pub fn next(&mut self) -> Option<XmlToken> {
        self.tokens.pop_front()
    }

    /// Check if tokens remain
    pub fn is_good(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Check if the tokenizer hit a well-formedness error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The tokenizer failure, if any
    pub fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    /// Encoding named in the XML declaration
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Version named in the XML declaration
    pub fn xml_version(&self) -> Option<&str> {
        self.xml_version.as_deref()
    }

    /// Consume the run of text tokens at the front, returning their characters
    pub fn skip_text(&mut self) -> String {
        let mut chars = String::new();
        while self.peek().map_or(false, XmlToken::is_text) {
            if let Some(token) = self.next() {
                chars.push_str(&token.chars);
            }
        }
        chars
    }

    /// Consume everything up to and including the end tag matching `start`
    ///
    /// `start` must already have been consumed.
    pub fn skip_past_end(&mut self, start: &XmlToken) {
        if start.is_end() {
            return;
        }
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Start if !token.empty => depth += 1,
                TokenKind::End if depth == 0 => {
                    if token.is_end_for(start) {
                        return;
                    }
                }
                TokenKind::End => depth -= 1,
                _ => {}
            }
        }
    }
}

struct Tokenizer<'a> {
    text: &'a str,
    limits: &'a Limits,
    line_starts: Vec<usize>,
    scopes: Vec<XmlNamespaces>,
    tokens: VecDeque<XmlToken>,
    encoding: Option<String>,
    xml_version: Option<String>,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str, limits: &'a Limits) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            text,
            limits,
            line_starts,
            scopes: Vec::new(),
            tokens: VecDeque::new(),
            encoding: None,
            xml_version: None,
        }
    }

    fn run(mut self) -> Result<XmlInputStream> {
        let mut reader = Reader::from_str(self.text);
        reader.trim_text(true);

        let mut error = None;
        loop {
            let offset = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.limits.check_depth(self.scopes.len() + 1)?;
                    let token = self.start_token(&e, offset, false);
                    match token {
                        Ok(token) => self.push_start(token)?,
                        Err(message) => {
                            error = Some(self.stream_error(message, offset));
                            break;
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    self.limits.check_depth(self.scopes.len() + 1)?;
                    let token = self.start_token(&e, offset, true);
                    self.scopes.pop();
                    match token {
                        Ok(token) => self.push_start(token)?,
                        Err(message) => {
                            error = Some(self.stream_error(message, offset));
                            break;
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let (line, column) = self.position(offset);
                    let mut token = XmlToken::new(TokenKind::End, line, column);
                    let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let (prefix, name) = split(&qname);
                    token.uri = self.resolve(&prefix);
                    token.prefix = prefix;
                    token.name = name;
                    self.scopes.pop();
                    self.tokens.push_back(token);
                }
                Ok(Event::Text(e)) => match e.unescape() {
                    Ok(text) => self.push_text(text.to_string(), offset),
                    Err(err) => {
                        error = Some(self.stream_error(err.to_string(), offset));
                        break;
                    }
                },
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                    self.push_text(text, offset);
                }
                Ok(Event::Decl(d)) => {
                    if let Ok(version) = d.version() {
                        self.xml_version = Some(String::from_utf8_lossy(&version).to_string());
                    }
                    if let Some(Ok(encoding)) = d.encoding() {
                        self.encoding = Some(String::from_utf8_lossy(&encoding).to_string());
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    error = Some(self.stream_error(e.to_string(), reader.buffer_position()));
                    break;
                }
                // comments, processing instructions, doctype
                _ => {}
            }
        }

        if error.is_none() && !self.scopes.is_empty() {
            error = Some(self.stream_error(
                "unexpected end of input inside an element".to_string(),
                self.text.len(),
            ));
        }

        Ok(XmlInputStream {
            tokens: self.tokens,
            error,
            encoding: self.encoding,
            xml_version: self.xml_version,
        })
    }

    /// Builds a start token and pushes its namespace scope
    fn start_token(
        &mut self,
        e: &BytesStart<'_>,
        offset: usize,
        empty: bool,
    ) -> std::result::Result<XmlToken, String> {
        let (line, column) = self.position(offset);
        let mut token = XmlToken::new(TokenKind::Start, line, column);
        token.empty = empty;

        let mut raw = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.to_string();
            if key == "xmlns" {
                token.namespaces.add(value, "");
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                token.namespaces.add(value, prefix);
            } else {
                raw.push((key, value));
            }
        }
        self.scopes.push(token.namespaces.clone());

        let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (prefix, name) = split(&qname);
        token.uri = self.resolve(&prefix);
        token.prefix = prefix;
        token.name = name;

        for (key, value) in raw {
            let (prefix, name) = split(&key);
            // unprefixed attributes are in no namespace
            let uri = if prefix.is_empty() {
                String::new()
            } else {
                self.resolve(&prefix)
            };
            token.attributes.push(XmlAttribute {
                name,
                prefix,
                uri,
                value,
            });
        }
        Ok(token)
    }

    fn push_start(&mut self, token: XmlToken) -> Result<()> {
        self.limits
            .check_start_tag(token.attributes.len(), token.namespaces.len())?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn push_text(&mut self, text: String, offset: usize) {
        if text.is_empty() || self.scopes.is_empty() {
            return;
        }
        let (line, column) = self.position(offset);
        let mut token = XmlToken::new(TokenKind::Text, line, column);
        token.chars = text;
        self.tokens.push_back(token);
    }

    fn resolve(&self, prefix: &str) -> String {
        if prefix == "xml" {
            return XML_NAMESPACE.to_string();
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.uri_for(prefix))
            .unwrap_or_default()
            .to_string()
    }

    fn stream_error(&self, message: String, offset: usize) -> StreamError {
        let (line, column) = self.position(offset);
        StreamError {
            message,
            line,
            column,
        }
    }

    /// Line and column of the first non-blank byte at or after `offset`
    fn position(&self, offset: usize) -> (u32, u32) {
        let bytes = self.text.as_bytes();
        let mut offset = offset.min(bytes.len());
        while offset < bytes.len() && bytes[offset].is_ascii_whitespace() {
            offset += 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map_or(offset - start, |s| s.chars().count());
        (line as u32 + 1, column as u32 + 1)
    }
}

fn split(qname: &str) -> (String, String) {
    let (prefix, local) = split_qname(qname);
    (prefix.to_string(), local.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_positions() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a x=\"1\">\n  <b/>\n  text\n</a>";
        let mut stream = XmlInputStream::new(xml).unwrap();
        assert_eq!(stream.encoding(), Some("UTF-8"));
        assert_eq!(stream.xml_version(), Some("1.0"));

        let a = stream.next().unwrap();
        assert!(a.is_start() && !a.is_end());
        assert_eq!((a.line, a.column), (2, 1));
        assert_eq!(a.attribute("x"), Some("1"));

        let b = stream.next().unwrap();
        assert!(b.is_start() && b.is_end());
        assert_eq!((b.line, b.column), (3, 3));

        let text = stream.next().unwrap();
        assert!(text.is_text());
        assert_eq!(text.chars, "text");
        assert_eq!(text.line, 4);

        let end = stream.next().unwrap();
        assert!(end.is_end_for(&a));
        assert!(!stream.is_good());
        assert!(!stream.is_error());
    }

    #[test]
    fn test_namespace_resolution() {
        let xml = r#"<a xmlns="urn:default" xmlns:p="urn:p"><p:b p:attr="v" plain="w"/><c xmlns="urn:inner"/></a>"#;
        let mut stream = XmlInputStream::new(xml).unwrap();
        let a = stream.next().unwrap();
        assert_eq!(a.uri, "urn:default");
        assert_eq!(a.namespaces.len(), 2);

        let b = stream.next().unwrap();
        assert_eq!(b.prefix, "p");
        assert_eq!(b.uri, "urn:p");
        assert_eq!(b.attributes[0].uri, "urn:p");
        assert_eq!(b.attributes[1].uri, "");

        let c = stream.next().unwrap();
        assert_eq!(c.uri, "urn:inner");
        let end = stream.next().unwrap();
        assert_eq!(end.uri, "urn:default");
    }

    #[test]
    fn test_skip_past_end() {
        let xml = "<a><skip><x><y/></x></skip><keep/></a>";
        let mut stream = XmlInputStream::new(xml).unwrap();
        stream.next();
        let skip = stream.next().unwrap();
        stream.skip_past_end(&skip);
        assert_eq!(stream.peek().map(|t| t.name.as_str()), Some("keep"));
    }

    #[test]
    fn test_skip_text() {
        let xml = "<a>hello<b/></a>";
        let mut stream = XmlInputStream::new(xml).unwrap();
        stream.next();
        assert_eq!(stream.skip_text(), "hello");
        assert_eq!(stream.peek().map(|t| t.name.as_str()), Some("b"));
        assert_eq!(stream.skip_text(), "");
    }

    #[test]
    fn test_malformed_keeps_prefix() {
        let xml = "<a><b></c></a>";
        let mut stream = XmlInputStream::new(xml).unwrap();
        assert!(stream.is_error());
        assert_eq!(stream.next().map(|t| t.name), Some("a".to_string()));
        assert_eq!(stream.next().map(|t| t.name), Some("b".to_string()));
    }

    #[test]
    fn test_unclosed_is_error() {
        let stream = XmlInputStream::new("<a><b/>").unwrap();
        assert!(stream.is_error());
    }

    #[test]
    fn test_depth_limit() {
        let mut limits = Limits::default();
        limits.max_depth = 2;
        let result = XmlInputStream::with_limits("<a><b><c/></b></a>", &limits);
        assert!(result.is_err());
    }
}
