//! Generic XML fragments
//!
//! Notes, annotations and math are carried as opaque XML trees. An
//! [`XmlNode::Fragment`] is a bare sequence of nodes without an enclosing
//! tag, the shape produced when parsing text with several top-level items.

use crate::error::{Error, Result};
use crate::namespaces::XmlNamespaces;
use crate::xml::output::{WriterSettings, XmlOutputStream};
use crate::xml::stream::XmlInputStream;

/// An attribute on an XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Local name
    pub name: String,
    /// Prefix (empty when unprefixed)
    pub prefix: String,
    /// Namespace URI (empty when none)
    pub uri: String,
    /// Value
    pub value: String,
}

impl XmlAttribute {
    /// Create an unprefixed attribute
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            uri: String::new(),
            value: value.into(),
        }
    }

    /// `prefix:name` or `name`
    pub fn qualified_name(&self) -> String {
        qualify(&self.prefix, &self.name)
    }
}

/// An XML element with its subtree
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Local name
    pub name: String,
    /// Prefix (empty when unprefixed)
    pub prefix: String,
    /// Namespace URI (empty when none)
    pub uri: String,
    /// Attributes other than namespace declarations
    pub attributes: Vec<XmlAttribute>,
    /// Namespace declarations made on this element
    pub namespaces: XmlNamespaces,
    /// Child nodes
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an element with no namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            uri: String::new(),
            attributes: Vec::new(),
            namespaces: XmlNamespaces::new(),
            children: Vec::new(),
        }
    }

    /// Create an element that declares `uri` as its default namespace
    pub fn with_default_namespace(name: impl Into<String>, uri: &str) -> Self {
        let mut element = Self::new(name);
        element.uri = uri.to_string();
        element.namespaces.add(uri, "");
        element
    }

    /// Local name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `prefix:name` or `name`
    pub fn qualified_name(&self) -> String {
        qualify(&self.prefix, &self.name)
    }

    /// Child nodes
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Option<&XmlNode> {
        self.children.get(index)
    }

    /// Number of child nodes
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Append a child; a fragment contributes its children instead
    pub fn add_child(&mut self, child: XmlNode) {
        match child {
            XmlNode::Fragment(nodes) => self.children.extend(nodes),
            node => self.children.push(node),
        }
    }

    /// Insert a child at `index` (clamped to the end)
    pub fn insert_child(&mut self, index: usize, child: XmlNode) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Remove and return the child at `index`
    pub fn remove_child(&mut self, index: usize) -> Option<XmlNode> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Position of the first child element named `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.as_element().map_or(false, |e| e.name == name))
    }

    /// Iterate over child elements, skipping text
    pub fn element_children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Value of the unprefixed attribute `name`
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.prefix.is_empty())
            .map(|a| a.value.as_str())
    }

    /// Add or replace an unprefixed attribute
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name == name && a.prefix.is_empty())
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute::new(name, value)),
        }
    }

    /// URI this element itself declares for `prefix`
    pub fn declared_namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.uri_for(prefix)
    }

    /// Prefixes used in the subtree that no element of the subtree declares
    ///
    /// The empty prefix counts as used by an unprefixed element with a
    /// namespace. The reserved `xml` prefix never counts.
    pub fn free_prefixes(&self) -> Vec<String> {
        let mut bound = Vec::new();
        let mut free = Vec::new();
        self.collect_free_prefixes(&mut bound, &mut free);
        free
    }

    fn collect_free_prefixes(&self, bound: &mut Vec<String>, free: &mut Vec<String>) {
        let before = bound.len();
        bound.extend(self.namespaces.iter().map(|(prefix, _)| prefix.to_string()));

        if !self.prefix.is_empty() || !self.uri.is_empty() {
            note_free_prefix(&self.prefix, bound, free);
        }
        for attr in self.attributes.iter().filter(|a| !a.prefix.is_empty()) {
            note_free_prefix(&attr.prefix, bound, free);
        }
        for child in self.children.iter().filter_map(XmlNode::as_element) {
            child.collect_free_prefixes(bound, free);
        }
        bound.truncate(before);
    }

    /// Declare on this element the free prefixes it takes from `source`
    ///
    /// Used when the element leaves the container that declared them.
    /// Prefixes that `target` binds to the same URI are left alone.
    pub fn bind_free_prefixes(&mut self, source: &XmlNamespaces, target: &XmlNamespaces) {
        for prefix in self.free_prefixes() {
            if let Some(uri) = source.uri_for(&prefix) {
                if target.uri_for(&prefix) != Some(uri) {
                    self.namespaces.add(uri, prefix);
                }
            }
        }
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => out.push_str(&e.text_content()),
                XmlNode::Fragment(_) => {}
            }
        }
        out
    }

    /// Serialize the element compactly
    pub fn to_xml_string(&self) -> String {
        XmlNode::Element(self.clone()).to_xml_string()
    }
}

/// A node in a generic XML tree
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// An element
    Element(XmlElement),
    /// Character data
    Text(String),
    /// A sequence of nodes with no enclosing tag
    Fragment(Vec<XmlNode>),
}

impl XmlNode {
    /// Create a text node
    pub fn text(text: impl Into<String>) -> Self {
        XmlNode::Text(text.into())
    }

    /// [`XmlElement::bind_free_prefixes`] over every element at the top level
    pub fn bind_free_prefixes(&mut self, source: &XmlNamespaces, target: &XmlNamespaces) {
        match self {
            XmlNode::Element(e) => e.bind_free_prefixes(source, target),
            XmlNode::Fragment(nodes) => {
                for node in nodes {
                    node.bind_free_prefixes(source, target);
                }
            }
            XmlNode::Text(_) => {}
        }
    }

    /// Check if this is an element
    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Element(_))
    }

    /// Check if this is a text node
    pub fn is_text(&self) -> bool {
        matches!(self, XmlNode::Text(_))
    }

    /// Check if this is a bare sequence
    pub fn is_fragment(&self) -> bool {
        matches!(self, XmlNode::Fragment(_))
    }

    /// The element, if this is one
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// The element, mutably, if this is one
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Element name; empty for text and fragments
    pub fn name(&self) -> &str {
        match self {
            XmlNode::Element(e) => &e.name,
            _ => "",
        }
    }

    /// Children of an element or fragment
    pub fn children(&self) -> &[XmlNode] {
        match self {
            XmlNode::Element(e) => &e.children,
            XmlNode::Fragment(nodes) => nodes,
            XmlNode::Text(_) => &[],
        }
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Option<&XmlNode> {
        self.children().get(index)
    }

    /// Number of children
    pub fn num_children(&self) -> usize {
        self.children().len()
    }

    /// Check if the node carries no content at all
    pub fn is_empty(&self) -> bool {
        match self {
            XmlNode::Element(_) => false,
            XmlNode::Text(t) => t.is_empty(),
            XmlNode::Fragment(nodes) => nodes.iter().all(XmlNode::is_empty),
        }
    }

    /// Parse XML text into a node
    ///
    /// A single top-level element is returned as itself, a lone run of text
    /// as [`XmlNode::Text`], anything else as a [`XmlNode::Fragment`].
    /// Prefixes declared in `outer` are in scope for the content.
    pub fn parse(text: &str, outer: Option<&XmlNamespaces>) -> Result<XmlNode> {
        let mut wrapper = String::from("<sedml-fragment");
        if let Some(outer) = outer {
            for (prefix, uri) in outer.iter() {
                let uri = escape_attribute(uri);
                if prefix.is_empty() {
                    wrapper.push_str(&format!(" xmlns=\"{}\"", uri));
                } else {
                    wrapper.push_str(&format!(" xmlns:{}=\"{}\"", prefix, uri));
                }
            }
        }
        wrapper.push('>');
        wrapper.push_str(text);
        wrapper.push_str("</sedml-fragment>");

        let mut stream = XmlInputStream::new(&wrapper)?;
        if let Some(err) = stream.error() {
            return Err(Error::Xml(err.message.clone()));
        }
        let root = XmlNode::read_from(&mut stream)
            .ok_or_else(|| Error::Xml("no content".to_string()))?;
        let XmlNode::Element(root) = root else {
            return Err(Error::Xml("no content".to_string()));
        };

        let mut children = root.children;
        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(XmlNode::Fragment(children))
        }
    }

    /// Read one complete element subtree from `stream`
    ///
    /// Returns `None` when the next token is not a start tag. Stops early if
    /// the stream runs dry.
    pub fn read_from(stream: &mut XmlInputStream) -> Option<XmlNode> {
        if !stream.peek().map_or(false, |t| t.is_start()) {
            return None;
        }
        let start = stream.next()?;
        let mut element = XmlElement {
            name: start.name.clone(),
            prefix: start.prefix.clone(),
            uri: start.uri.clone(),
            attributes: start.attributes.clone(),
            namespaces: start.namespaces.clone(),
            children: Vec::new(),
        };
        if start.is_end() {
            return Some(XmlNode::Element(element));
        }

        while let Some(next) = stream.peek() {
            if next.is_end_for(&start) {
                stream.next();
                break;
            } else if next.is_start() {
                if let Some(child) = XmlNode::read_from(stream) {
                    element.children.push(child);
                }
            } else if next.is_text() {
                let chars = next.chars.clone();
                stream.next();
                element.children.push(XmlNode::Text(chars));
            } else {
                // stray end tag
                stream.next();
            }
        }
        Some(XmlNode::Element(element))
    }

    /// Serialize compactly, without an XML declaration
    pub fn to_xml_string(&self) -> String {
        let settings = WriterSettings::new()
            .with_indent(0)
            .with_xml_declaration(false);
        let mut out = XmlOutputStream::new(&settings);
        match out.write_node(self).and_then(|_| out.into_string()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize XML fragment");
                String::new()
            }
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        XmlNode::Element(element)
    }
}

/// Declarations in scope inside the innermost element of `chain`
pub fn scope_of<'a>(chain: impl IntoIterator<Item = &'a XmlElement>) -> XmlNamespaces {
    let mut scope = XmlNamespaces::new();
    for element in chain {
        for (prefix, uri) in element.namespaces.iter() {
            scope.add(uri, prefix);
        }
    }
    scope
}

fn note_free_prefix(prefix: &str, bound: &[String], free: &mut Vec<String>) {
    if prefix == "xml" || bound.iter().any(|b| b == prefix) || free.iter().any(|f| f == prefix) {
        return;
    }
    free.push(prefix.to_string());
}

pub(crate) fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}:{}", prefix, name)
    }
}

fn escape_attribute(value: &str) -> String {
    quick_xml::escape::escape(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XHTML_NAMESPACE;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_element() {
        let node = XmlNode::parse("<p xmlns=\"http://www.w3.org/1999/xhtml\">Hi</p>", None).unwrap();
        let p = node.as_element().unwrap();
        assert_eq!(p.name(), "p");
        assert_eq!(p.uri, XHTML_NAMESPACE);
        assert_eq!(p.text_content(), "Hi");
    }

    #[test]
    fn test_parse_fragment_and_text() {
        let node = XmlNode::parse("<a/><b/>", None).unwrap();
        assert!(node.is_fragment());
        assert_eq!(node.num_children(), 2);

        let text = XmlNode::parse("just words", None).unwrap();
        assert_eq!(text, XmlNode::text("just words"));

        let empty = XmlNode::parse("", None).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_with_outer_namespaces() {
        let mut outer = XmlNamespaces::new();
        outer.add("urn:x", "x");
        let node = XmlNode::parse("<x:item/>", Some(&outer)).unwrap();
        let item = node.as_element().unwrap();
        assert_eq!(item.uri, "urn:x");
        // the declaration stays on the context, not the fragment
        assert!(item.namespaces.is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(XmlNode::parse("<a><b></a>", None).is_err());
    }

    #[test]
    fn test_element_children() {
        let mut el = XmlElement::new("body");
        el.add_child(XmlNode::Fragment(vec![
            XmlElement::new("p").into(),
            XmlNode::text("t"),
        ]));
        el.insert_child(0, XmlElement::new("hr").into());
        assert_eq!(el.num_children(), 3);
        assert_eq!(el.index_of("p"), Some(1));
        assert_eq!(el.element_children().count(), 2);
        assert!(el.remove_child(5).is_none());
        assert_eq!(el.remove_child(0).map(|n| n.name().to_string()), Some("hr".to_string()));
    }

    #[test]
    fn test_free_prefixes_of_nested_content() {
        let node = XmlNode::parse(
            "<c:more xmlns:k=\"urn:k\"><d:x k:flag=\"1\"/><e:y xmlns:e=\"urn:e\"/></c:more>",
            Some(&scope_of(&[wrapper_with(&[("c", "urn:c"), ("d", "urn:d")])])),
        )
        .unwrap();
        let more = node.as_element().unwrap();
        assert_eq!(more.free_prefixes(), vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_bind_free_prefixes_skips_shared_bindings() {
        let wrapper = wrapper_with(&[("c", "urn:c"), ("d", "urn:d")]);
        let source = scope_of([&wrapper]);
        let mut node = XmlNode::parse("<c:more><d:x/></c:more>", Some(&source)).unwrap();

        let mut target = XmlNamespaces::new();
        target.add("urn:d", "d");
        node.bind_free_prefixes(&source, &target);

        let more = node.as_element().unwrap();
        assert_eq!(more.declared_namespace_uri("c"), Some("urn:c"));
        assert_eq!(more.declared_namespace_uri("d"), None);
        assert_eq!(
            more.to_xml_string(),
            "<c:more xmlns:c=\"urn:c\"><d:x/></c:more>"
        );
    }

    fn wrapper_with(decls: &[(&str, &str)]) -> XmlElement {
        let mut wrapper = XmlElement::new("annotation");
        for (prefix, uri) in decls {
            wrapper.namespaces.add(*uri, *prefix);
        }
        wrapper
    }

    #[test]
    fn test_to_xml_string() {
        let mut p = XmlElement::with_default_namespace("p", XHTML_NAMESPACE);
        p.add_child(XmlNode::text("a < b"));
        assert_eq!(
            p.to_xml_string(),
            "<p xmlns=\"http://www.w3.org/1999/xhtml\">a &lt; b</p>"
        );
        assert_eq!(XmlElement::new("br").to_xml_string(), "<br/>");
    }
}
