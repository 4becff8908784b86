//! XML output sink
//!
//! A thin layer over `quick_xml::Writer` that works in terms of
//! start-element / attribute / end-element calls. The start tag of the
//! current element is held back until its first child or its end, so
//! elements without content come out self-closed.

use crate::error::{Error, Result};
use crate::namespaces::XmlNamespaces;
use crate::xml::node::{qualify, XmlElement, XmlNode};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Settings controlling how documents are written
#[derive(Debug, Clone)]
pub struct WriterSettings {
    /// Spaces per nesting level; 0 writes everything on one line
    pub indent: usize,
    /// Whether to emit `<?xml version="1.0" encoding="UTF-8"?>`
    pub xml_declaration: bool,
    /// Name of the program writing the document
    pub program_name: Option<String>,
    /// Version of the program writing the document
    pub program_version: Option<String>,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            indent: 2,
            xml_declaration: true,
            program_name: None,
            program_version: None,
        }
    }
}

impl WriterSettings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the indentation width
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Enable or disable the XML declaration
    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    /// Record the writing program in a header comment
    pub fn with_program(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self.program_version = Some(version.into());
        self
    }

    /// Text of the "Created by" header comment, when a program is set
    pub fn header_comment(&self) -> Option<String> {
        let (name, version) = match (&self.program_name, &self.program_version) {
            (Some(n), Some(v)) if !n.is_empty() => (n, v),
            _ => return None,
        };
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M");
        Some(format!(
            " Created by {} version {} on {} with sedml-rs version {}. ",
            name,
            version,
            now,
            crate::VERSION
        ))
    }
}

/// Output sink producing XML text
pub struct XmlOutputStream {
    writer: Writer<Vec<u8>>,
    pending: Option<BytesStart<'static>>,
}

impl XmlOutputStream {
    /// Create a sink using the layout in `settings`
    pub fn new(settings: &WriterSettings) -> Self {
        let writer = if settings.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', settings.indent)
        } else {
            Writer::new(Vec::new())
        };
        Self {
            writer,
            pending: None,
        }
    }

    /// Write `<?xml version="1.0" encoding="UTF-8"?>`
    pub fn write_xml_decl(&mut self) -> Result<()> {
        self.flush_pending()?;
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    /// Write a comment; `text` must not contain `--`
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(text)))?;
        Ok(())
    }

    /// Open an element
    pub fn start_element(&mut self, name: &str, prefix: &str) -> Result<()> {
        self.flush_pending()?;
        self.pending = Some(BytesStart::new(qualify(prefix, name)));
        Ok(())
    }

    /// Add an attribute to the element just opened
    pub fn write_attribute(&mut self, name: &str, prefix: &str, value: &str) -> Result<()> {
        let start = self.pending.as_mut().ok_or_else(|| {
            Error::Xml(format!("attribute '{}' written outside a start tag", name))
        })?;
        let key = qualify(prefix, name);
        start.push_attribute((key.as_str(), value));
        Ok(())
    }

    /// Add namespace declarations to the element just opened
    pub fn write_namespaces(&mut self, namespaces: &XmlNamespaces) -> Result<()> {
        for (prefix, uri) in namespaces.iter() {
            if prefix.is_empty() {
                self.write_attribute("xmlns", "", uri)?;
            } else {
                self.write_attribute(prefix, "xmlns", uri)?;
            }
        }
        Ok(())
    }

    /// Write character data
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Append a whole XML subtree
    pub fn write_node(&mut self, node: &XmlNode) -> Result<()> {
        match node {
            XmlNode::Element(e) => self.write_element(e),
            XmlNode::Text(t) => self.write_text(t),
            XmlNode::Fragment(nodes) => {
                for child in nodes {
                    self.write_node(child)?;
                }
                Ok(())
            }
        }
    }

    /// Append a whole element subtree
    pub fn write_element(&mut self, element: &XmlElement) -> Result<()> {
        self.start_element(&element.name, &element.prefix)?;
        self.write_namespaces(&element.namespaces)?;
        for attr in &element.attributes {
            self.write_attribute(&attr.name, &attr.prefix, &attr.value)?;
        }
        for child in &element.children {
            self.write_node(child)?;
        }
        self.end_element(&element.name, &element.prefix)
    }

    /// Close an element
    pub fn end_element(&mut self, name: &str, prefix: &str) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Empty(start))?;
        } else {
            self.writer
                .write_event(Event::End(BytesEnd::new(qualify(prefix, name))))?;
        }
        Ok(())
    }

    /// Finish writing and return the text
    pub fn into_string(mut self) -> Result<String> {
        self.flush_pending()?;
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::Xml(format!("output is not UTF-8: {}", e)))
    }

    fn flush_pending(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}
