//! Element nodes and their views
//!
//! Nodes are stored in the owning [`Document`]'s arena. Callers never hold
//! a node directly; they hold a [`NodeId`] and borrow an [`ElementRef`]
//! or [`ElementMut`] view from the document when they need one.

pub mod annotation;
pub mod attributes;
pub(crate) mod base;
pub mod checks;
pub mod kinds;
pub mod notes;

pub use attributes::{AttributeValue, ExpectedAttributes, FieldSpec, FromAttributeValue, ValueType};
pub use kinds::{ElementKind, KindCode, ListKind};
pub use notes::NotesShape;

use crate::arena::NodeId;
use crate::document::{Document, DocumentId};
use crate::element::attributes::BASE_ATTRIBUTES;
use crate::element::base::ElementBase;
use crate::element::checks::Compatibility;
use crate::error::{OperationError, OperationResult};
use crate::namespaces::{is_sedml_namespace, SedNamespaces, XmlNamespaces};
use crate::xml::node::{XmlElement, XmlNode};
use std::any::Any;
use std::rc::Rc;

/// A node in the element tree
#[derive(Debug, Clone)]
pub(crate) struct ElementNode {
    pub(crate) base: ElementBase,
    pub(crate) kind: ElementKind,
    pub(crate) children: Vec<NodeId>,
}

impl ElementNode {
    pub(crate) fn new(base: ElementBase, kind: ElementKind) -> Self {
        Self {
            base,
            kind,
            children: Vec::new(),
        }
    }

    fn is_complete(&self, level: u32, version: u32) -> bool {
        let id_set = self.base.id(level, version).is_some();
        self.kind.has_required_attributes(id_set) && self.kind.has_required_elements()
    }
}

fn serialize(element: &Option<XmlElement>) -> Option<String> {
    element.as_ref().map(XmlElement::to_xml_string)
}

/// Read-only view of an element
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
    node: &'a ElementNode,
}

impl<'a> ElementRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId, node: &'a ElementNode) -> Self {
        Self { doc, id, node }
    }

    /// Handle of the element
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Kind payload
    pub fn kind(&self) -> &'a ElementKind {
        &self.node.kind
    }

    /// Kind type code
    pub fn kind_code(&self) -> KindCode {
        self.node.kind.code()
    }

    /// XML element name
    pub fn element_name(&self) -> &'static str {
        self.node.kind.element_name()
    }

    /// Check if the element belongs to its document's tree
    pub fn is_attached(&self) -> bool {
        self.node.base.document == Some(self.doc.id())
    }

    /// Effective SED-ML level: the document's when attached
    pub fn level(&self) -> u32 {
        if self.is_attached() {
            self.doc.level()
        } else {
            self.node.base.level
        }
    }

    /// Effective SED-ML version: the document's when attached
    pub fn version(&self) -> u32 {
        if self.is_attached() {
            self.doc.version()
        } else {
            self.node.base.version
        }
    }

    /// `id`, hidden when the element may not carry one at this version
    pub fn id(&self) -> Option<&'a str> {
        self.node.base.id(self.level(), self.version())
    }

    /// Check if `id` is set
    pub fn is_set_id(&self) -> bool {
        self.id().is_some()
    }

    /// `name`, hidden when the element may not carry one at this version
    pub fn name(&self) -> Option<&'a str> {
        self.node.base.name(self.level(), self.version())
    }

    /// Check if `name` is set
    pub fn is_set_name(&self) -> bool {
        self.name().is_some()
    }

    /// `metaid`
    pub fn meta_id(&self) -> Option<&'a str> {
        self.node.base.meta_id.as_deref()
    }

    /// Check if `metaid` is set
    pub fn is_set_meta_id(&self) -> bool {
        self.node.base.meta_id.is_some()
    }

    /// Source line of the start tag (0 when built in memory)
    pub fn line(&self) -> u32 {
        self.node.base.line
    }

    /// Source column of the start tag (0 when built in memory)
    pub fn column(&self) -> u32 {
        self.node.base.column
    }

    /// Character data read directly inside the element
    pub fn text(&self) -> &'a str {
        &self.node.base.text
    }

    /// Parent element
    pub fn parent(&self) -> Option<NodeId> {
        self.node.base.parent
    }

    /// Owning document, when attached
    pub fn document_id(&self) -> Option<DocumentId> {
        self.node.base.document
    }

    /// Child elements in document order
    pub fn children(&self) -> &'a [NodeId] {
        &self.node.children
    }

    /// Namespace URI of the element
    pub fn element_namespace(&self) -> &'a str {
        &self.node.base.element_namespace
    }

    /// Namespace declarations in scope for the element
    ///
    /// The element's own declarations if it made any, else the document's
    /// when attached, else the ones it was created with.
    pub fn namespaces(&self) -> &'a XmlNamespaces {
        if let Some(own) = &self.node.base.own_namespaces {
            return own;
        }
        if self.is_attached() {
            self.doc.namespaces().namespaces()
        } else {
            &self.node.base.seed_namespaces
        }
    }

    fn inherited_namespaces(&self) -> &'a XmlNamespaces {
        if self.is_attached() {
            self.doc.namespaces().namespaces()
        } else {
            &self.node.base.seed_namespaces
        }
    }

    /// Prefix bound to the element's namespace
    pub fn prefix(&self) -> &'a str {
        let ns = self.element_namespace();
        self.namespaces()
            .prefix_for(ns)
            .or_else(|| self.inherited_namespaces().prefix_for(ns))
            .unwrap_or("")
    }

    /// Prefix of the first SED-ML namespace in scope
    pub fn sedml_prefix(&self) -> &'a str {
        self.namespaces()
            .iter()
            .find(|(_, uri)| is_sedml_namespace(uri))
            .map(|(prefix, _)| prefix)
            .unwrap_or_else(|| self.prefix())
    }

    /// Application data attached to the element
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.node.base.user_data.clone()
    }

    /// Check if application data is attached
    pub fn is_set_user_data(&self) -> bool {
        self.node.base.user_data.is_some()
    }

    /// Nearest ancestor of the given kind
    pub fn ancestor_of_kind(&self, code: KindCode) -> Option<NodeId> {
        let mut current = self.parent();
        while let Some(id) = current {
            let node = self.doc.node(id)?;
            if node.kind.code() == code {
                return Some(id);
            }
            current = node.base.parent;
        }
        None
    }

    /// Topmost ancestor (the element itself when it has no parent)
    pub fn root_element(&self) -> NodeId {
        let mut top = self.id;
        while let Some(parent) = self.doc.node(top).and_then(|n| n.base.parent) {
            top = parent;
        }
        top
    }

    /// The `<notes>` envelope
    pub fn notes(&self) -> Option<&'a XmlElement> {
        self.node.base.notes.as_ref()
    }

    /// Notes serialized as XML
    pub fn notes_string(&self) -> Option<String> {
        serialize(&self.node.base.notes)
    }

    /// Check if notes are set
    pub fn is_set_notes(&self) -> bool {
        self.node.base.notes.is_some()
    }

    /// The `<annotation>` wrapper
    pub fn annotation(&self) -> Option<&'a XmlElement> {
        self.node.base.annotation.as_ref()
    }

    /// Annotation serialized as XML
    pub fn annotation_string(&self) -> Option<String> {
        serialize(&self.node.base.annotation)
    }

    /// Check if an annotation is set
    pub fn is_set_annotation(&self) -> bool {
        self.node.base.annotation.is_some()
    }

    /// Names accepted by the reflection methods
    pub fn attribute_names(&self) -> Vec<&'static str> {
        BASE_ATTRIBUTES
            .iter()
            .copied()
            .chain(self.node.kind.fields().iter().map(|f| f.name))
            .collect()
    }

    /// Value of an attribute by name
    ///
    /// Fails with `AttributeNotRecognized` for names the element does not
    /// have and with `Failed` when the attribute is unset.
    pub fn get_attribute(&self, name: &str) -> OperationResult<AttributeValue> {
        let value = match name {
            "id" => self.id().map(AttributeValue::from),
            "name" => self.name().map(AttributeValue::from),
            "metaid" => self.meta_id().map(AttributeValue::from),
            _ => self.node.kind.get_field(name)?,
        };
        value.ok_or(OperationError::Failed)
    }

    /// Value of an attribute converted to `T`
    pub fn get_attribute_as<T: FromAttributeValue>(&self, name: &str) -> OperationResult<T> {
        let value = self.get_attribute(name)?;
        T::from_attribute_value(value).ok_or(OperationError::InvalidAttributeValue)
    }

    /// Check if an attribute is set; unknown names are never set
    pub fn is_set_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_ok()
    }

    pub(crate) fn compatibility(&self) -> Compatibility<'a> {
        let (level, version) = (self.level(), self.version());
        Compatibility {
            level,
            version,
            element_namespace: self.element_namespace(),
            complete: self.node.is_complete(level, version),
        }
    }

    /// Check whether `other` may be added below this element
    ///
    /// Fails with `Failed` for no element, `InvalidObject` when required
    /// attributes or elements are missing, then with a level, version or
    /// namespace mismatch.
    pub fn check_compatibility(&self, other: Option<&ElementRef<'_>>) -> OperationResult {
        let other = other.map(ElementRef::compatibility);
        checks::check_compatibility(&self.compatibility(), other.as_ref())
    }

    /// Check if both elements use the same level, version and namespace
    pub fn matches_sedml_namespaces(&self, other: &ElementRef<'_>) -> bool {
        self.level() == other.level()
            && self.version() == other.version()
            && self.element_namespace() == other.element_namespace()
    }

    /// Check that the declared SED-ML namespace agrees with level/version
    pub fn has_valid_level_version_namespace_combination(&self) -> bool {
        match SedNamespaces::new(self.level(), self.version()) {
            Ok(mut sedns) => {
                sedns.namespaces_mut().clear();
                sedns.add_namespaces(self.namespaces());
                sedns.is_valid_combination()
            }
            Err(_) => false,
        }
    }

    /// Serialize the element and its subtree
    pub fn to_xml_string(&self) -> String {
        crate::traversal::element_to_string(self.doc, self.id)
    }
}

/// Mutable view of an element
pub struct ElementMut<'a> {
    id: NodeId,
    node: &'a mut ElementNode,
    level: u32,
    version: u32,
    toplevel: Option<&'a XmlNamespaces>,
}

impl<'a> ElementMut<'a> {
    pub(crate) fn new(
        id: NodeId,
        node: &'a mut ElementNode,
        level: u32,
        version: u32,
        toplevel: Option<&'a XmlNamespaces>,
    ) -> Self {
        Self {
            id,
            node,
            level,
            version,
            toplevel,
        }
    }

    /// Handle of the element
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Kind payload
    pub fn kind(&self) -> &ElementKind {
        &self.node.kind
    }

    /// Mutable kind payload
    pub fn kind_mut(&mut self) -> &mut ElementKind {
        &mut self.node.kind
    }

    /// Effective SED-ML level
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Effective SED-ML version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// `id`, hidden when the element may not carry one at this version
    pub fn id(&self) -> Option<&str> {
        self.node.base.id(self.level, self.version)
    }

    /// `name`, hidden when the element may not carry one at this version
    pub fn name(&self) -> Option<&str> {
        self.node.base.name(self.level, self.version)
    }

    /// `metaid`
    pub fn meta_id(&self) -> Option<&str> {
        self.node.base.meta_id.as_deref()
    }

    /// Set `id`; an empty string clears it
    pub fn set_id(&mut self, sid: &str) -> OperationResult {
        self.node.base.set_id(sid, self.level, self.version)
    }

    /// Clear `id`
    pub fn unset_id(&mut self) {
        self.node.base.id = None;
    }

    /// Set `name`; an empty string clears it
    pub fn set_name(&mut self, name: &str) -> OperationResult {
        self.node.base.set_name(name, self.level, self.version)
    }

    /// Clear `name`
    pub fn unset_name(&mut self) {
        self.node.base.name = None;
    }

    /// Set `metaid`; an empty string clears it
    pub fn set_meta_id(&mut self, meta_id: &str) -> OperationResult {
        self.node.base.set_meta_id(meta_id)
    }

    /// Clear `metaid`
    pub fn unset_meta_id(&mut self) {
        self.node.base.meta_id = None;
    }

    /// Change the element's namespace URI
    pub fn set_element_namespace(&mut self, uri: &str) {
        self.node.base.element_namespace = uri.to_string();
    }

    /// Replace the element's own namespace declarations
    pub fn set_namespaces(&mut self, namespaces: Option<&XmlNamespaces>) {
        self.node.base.own_namespaces = namespaces.cloned();
    }

    /// Attach application data
    pub fn set_user_data(&mut self, data: Rc<dyn Any>) {
        self.node.base.user_data = Some(data);
    }

    /// Drop application data
    pub fn unset_user_data(&mut self) {
        self.node.base.user_data = None;
    }

    /// Replace the notes; see [`notes`] for the accepted shapes
    pub fn set_notes(&mut self, node: &XmlNode) -> OperationResult {
        notes::set_notes(&mut self.node.base.notes, node, self.toplevel)
    }

    /// Replace the notes with parsed text; an empty string removes them
    ///
    /// With `add_xhtml_markup`, plain text is wrapped in an XHTML `<p>`.
    pub fn set_notes_str(&mut self, text: &str, add_xhtml_markup: bool) -> OperationResult {
        notes::set_notes_str(&mut self.node.base.notes, text, add_xhtml_markup, self.toplevel)
    }

    /// Merge content into the notes
    pub fn append_notes(&mut self, node: &XmlNode) -> OperationResult {
        notes::append_notes(&mut self.node.base.notes, node, self.toplevel)
    }

    /// Merge parsed text into the notes
    pub fn append_notes_str(&mut self, text: &str, add_xhtml_markup: bool) -> OperationResult {
        notes::append_notes_str(&mut self.node.base.notes, text, add_xhtml_markup, self.toplevel)
    }

    /// Remove the notes
    pub fn unset_notes(&mut self) {
        self.node.base.notes = None;
    }

    /// Replace the annotation with a copy of `node`; `None` removes it
    pub fn set_annotation(&mut self, node: Option<&XmlNode>) {
        annotation::set_annotation(&mut self.node.base.annotation, node);
    }

    /// Replace the annotation with parsed text; an empty string removes it
    pub fn set_annotation_str(&mut self, text: &str) -> OperationResult {
        annotation::set_annotation_str(&mut self.node.base.annotation, text, self.toplevel)
    }

    /// Add top-level annotation elements
    pub fn append_annotation(&mut self, node: &XmlNode) -> OperationResult {
        annotation::append_annotation(&mut self.node.base.annotation, node)
    }

    /// Add top-level annotation elements parsed from text
    pub fn append_annotation_str(&mut self, text: &str) -> OperationResult {
        annotation::append_annotation_str(&mut self.node.base.annotation, text, self.toplevel)
    }

    /// Remove a top-level annotation element by name and optional URI
    pub fn remove_top_level_annotation_element(
        &mut self,
        name: &str,
        uri: Option<&str>,
    ) -> OperationResult {
        annotation::remove_top_level_element(&mut self.node.base.annotation, name, uri)
    }

    /// Replace the top-level annotation element with the same name
    pub fn replace_top_level_annotation_element(&mut self, node: &XmlNode) -> OperationResult {
        annotation::replace_top_level_element(&mut self.node.base.annotation, node)
    }

    /// Replace the top-level annotation element named like the parsed text
    pub fn replace_top_level_annotation_element_str(&mut self, text: &str) -> OperationResult {
        annotation::replace_top_level_element_str(
            &mut self.node.base.annotation,
            text,
            self.toplevel,
        )
    }

    /// Remove the annotation
    pub fn unset_annotation(&mut self) {
        self.node.base.annotation = None;
    }

    /// Set an attribute by name
    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) -> OperationResult {
        let value = value.into();
        if !BASE_ATTRIBUTES.contains(&name) {
            return self.node.kind.set_field(name, value);
        }
        let text = value
            .into_string()
            .ok_or(OperationError::InvalidAttributeValue)?;
        match name {
            "id" => self.set_id(&text),
            "name" => self.set_name(&text),
            _ => self.set_meta_id(&text),
        }
    }

    /// Clear an attribute by name
    pub fn unset_attribute(&mut self, name: &str) -> OperationResult {
        match name {
            "id" => self.unset_id(),
            "name" => self.unset_name(),
            "metaid" => self.unset_meta_id(),
            _ => return self.node.kind.unset_field(name),
        }
        Ok(())
    }
}
