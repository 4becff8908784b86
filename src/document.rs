//! SED-ML documents
//!
//! A [`Document`] owns every element node in a generation-checked arena,
//! the document-level namespace table and the diagnostic log. Elements are
//! addressed by [`NodeId`]; a node is *attached* while it is reachable from
//! the root and *floating* after creation or detachment.

use crate::arena::{Arena, NodeId};
use crate::diagnostics::{DiagnosticCode, DiagnosticLog};
use crate::element::base::ElementBase;
use crate::element::kinds::{DocumentData, ElementKind, ListKind};
use crate::element::{ElementMut, ElementNode, ElementRef};
use crate::error::{OperationError, OperationResult, Result};
use crate::namespaces::SedNamespaces;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a document, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// A SED-ML document
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    nodes: Arena<ElementNode>,
    namespaces: SedNamespaces,
    diagnostics: DiagnosticLog,
    root: NodeId,
}

impl Document {
    /// Create an empty document for a level/version pair
    ///
    /// Fails with [`Error::Construction`](crate::Error::Construction) for
    /// an unsupported pair.
    pub fn new(level: u32, version: u32) -> Result<Self> {
        Ok(Self::from_namespaces(SedNamespaces::new(level, version)?))
    }

    /// Create an empty document using `namespaces`
    pub fn from_namespaces(namespaces: SedNamespaces) -> Self {
        let id = DocumentId::next();
        let kind = ElementKind::Document(DocumentData {
            level: Some(namespaces.level()),
            version: Some(namespaces.version()),
        });
        let mut base = ElementBase::for_kind(
            &kind,
            namespaces.level(),
            namespaces.version(),
            namespaces.uri(),
        );
        base.document = Some(id);

        let mut nodes = Arena::new();
        let root = nodes.insert(ElementNode::new(base, kind));
        tracing::trace!(document = %id, "document created");
        Self {
            id,
            nodes,
            namespaces,
            diagnostics: DiagnosticLog::new(),
            root,
        }
    }

    /// Identity of the document
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// SED-ML level
    pub fn level(&self) -> u32 {
        self.namespaces.level()
    }

    /// SED-ML version
    pub fn version(&self) -> u32 {
        self.namespaces.version()
    }

    /// Level, version and document-level namespace declarations
    pub fn namespaces(&self) -> &SedNamespaces {
        &self.namespaces
    }

    /// Mutable document-level namespace declarations
    pub fn namespaces_mut(&mut self) -> &mut SedNamespaces {
        &mut self.namespaces
    }

    /// Findings recorded while reading
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Mutable access to the findings
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticLog {
        &mut self.diagnostics
    }

    /// The `sedML` root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, attached or floating
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        self.nodes.get_mut(id)
    }

    /// Check if `id` no longer refers to a live node
    pub fn has_been_deleted(&self, id: NodeId) -> bool {
        !self.nodes.contains(id)
    }

    /// Check if `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .map_or(false, |n| n.base.document == Some(self.id))
    }

    /// Read-only view of an element
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        let node = self.nodes.get(id)?;
        Some(ElementRef::new(self, id, node))
    }

    /// Mutable view of an element
    pub fn element_mut(&mut self, id: NodeId) -> Option<ElementMut<'_>> {
        let (level, version) = (self.level(), self.version());
        let doc_id = self.id;
        let toplevel = self.namespaces.namespaces();
        let node = self.nodes.get_mut(id)?;
        if node.base.document == Some(doc_id) {
            Some(ElementMut::new(id, node, level, version, Some(toplevel)))
        } else {
            let (level, version) = (node.base.level, node.base.version);
            Some(ElementMut::new(id, node, level, version, None))
        }
    }

    /// Kind payload of an element
    pub fn kind(&self, id: NodeId) -> Option<&ElementKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    /// Mutable kind payload of an element
    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut ElementKind> {
        self.nodes.get_mut(id).map(|n| &mut n.kind)
    }

    /// Create a floating element for this document's level and version
    pub fn create_element(&mut self, kind: ElementKind) -> NodeId {
        let namespaces = self.namespaces.clone();
        self.create_element_with_namespaces(kind, &namespaces)
    }

    /// Create a floating element for another level/version
    pub fn create_element_with_namespaces(
        &mut self,
        kind: ElementKind,
        namespaces: &SedNamespaces,
    ) -> NodeId {
        let base = ElementBase::for_kind(
            &kind,
            namespaces.level(),
            namespaces.version(),
            namespaces.uri(),
        );
        self.nodes.insert(ElementNode::new(base, kind))
    }

    /// Child elements of `id`; empty for a dead handle
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Number of child elements of `id`
    pub fn num_children(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Child `index` of `id`
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.base.parent)
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// `id` and all its descendants in document order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    fn set_document(&mut self, id: NodeId, document: Option<DocumentId>) {
        for n in self.subtree(id) {
            if let Some(node) = self.nodes.get_mut(n) {
                node.base.document = document;
            }
        }
    }

    /// Append `child` to the children of `parent`
    ///
    /// The child is detached from any previous parent first and the whole
    /// subtree takes on the parent's document membership. Attaching a node
    /// below itself or attaching the root fails.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> OperationResult {
        if !self.nodes.contains(parent) || !self.nodes.contains(child) || child == self.root {
            return Err(OperationError::Failed);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(OperationError::Failed);
        }
        if self.parent(child) == Some(parent) {
            return Ok(());
        }
        self.detach(child)?;

        let document = match self.nodes.get_mut(parent) {
            Some(p) => {
                p.children.push(child);
                p.base.document
            }
            None => return Err(OperationError::Failed),
        };
        if let Some(c) = self.nodes.get_mut(child) {
            c.base.parent = Some(parent);
        }
        self.set_document(child, document);
        tracing::trace!(parent = %parent, child = %child, "element attached");
        Ok(())
    }

    /// Remove `id` from its parent, leaving it floating
    pub fn detach(&mut self, id: NodeId) -> OperationResult {
        if id == self.root || !self.nodes.contains(id) {
            return Err(OperationError::Failed);
        }
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.base.parent = None;
        }
        self.set_document(id, None);
        Ok(())
    }

    /// Detach `id` and free its whole subtree
    ///
    /// Every handle into the subtree reports [`has_been_deleted`] afterwards.
    ///
    /// [`has_been_deleted`]: Document::has_been_deleted
    pub fn remove(&mut self, id: NodeId) -> OperationResult {
        self.detach(id)?;
        for n in self.subtree(id) {
            self.nodes.remove(n);
        }
        Ok(())
    }

    /// Copy the subtree at `id` as a new floating subtree
    pub fn deep_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id)?;
        let copy = ElementNode::new(node.base.detached_copy(), node.kind.clone());
        let children = node.children.clone();
        let new_id = self.nodes.insert(copy);
        for child in children {
            if let Some(child_copy) = self.deep_clone(child) {
                if let Some(c) = self.nodes.get_mut(child_copy) {
                    c.base.parent = Some(new_id);
                }
                if let Some(n) = self.nodes.get_mut(new_id) {
                    n.children.push(child_copy);
                }
            }
        }
        Some(new_id)
    }

    /// The `listOf*` child of `owner` holding `kind`, if present
    pub fn list_of(&self, owner: NodeId, kind: ListKind) -> Option<NodeId> {
        self.children(owner)
            .iter()
            .copied()
            .find(|c| matches!(self.kind(*c), Some(ElementKind::ListOf(k)) if *k == kind))
    }

    /// The `listOf*` child of `owner` holding `kind`, created when missing
    pub fn ensure_list(&mut self, owner: NodeId, kind: ListKind) -> OperationResult<NodeId> {
        let owner_kind = self.kind(owner).ok_or(OperationError::Failed)?;
        if !owner_kind.child_lists().contains(&kind) {
            return Err(OperationError::InvalidObject);
        }
        if let Some(existing) = self.list_of(owner, kind) {
            return Ok(existing);
        }
        let list = self.create_element(ElementKind::ListOf(kind));
        self.attach(owner, list)?;
        Ok(list)
    }

    /// Append `item` to `list`
    ///
    /// The item must be of the list's item kind, compatible with the list
    /// and carry an id not already used by another item.
    pub fn add_to_list(&mut self, list: NodeId, item: NodeId) -> OperationResult {
        let list_ref = self.element(list).ok_or(OperationError::Failed)?;
        let ElementKind::ListOf(list_kind) = list_ref.kind() else {
            return Err(OperationError::InvalidObject);
        };
        let item_ref = self.element(item);
        if let Some(item_ref) = &item_ref {
            if item_ref.kind_code() != list_kind.item_kind() {
                return Err(OperationError::InvalidObject);
            }
        }
        list_ref.check_compatibility(item_ref.as_ref())?;

        if let Some(id) = item_ref.and_then(|i| i.id()) {
            let duplicate = list_ref
                .children()
                .iter()
                .filter(|c| **c != item)
                .any(|c| self.element(*c).and_then(|e| e.id()) == Some(id));
            if duplicate {
                return Err(OperationError::DuplicateObjectId);
            }
        }
        self.attach(list, item)
    }

    /// Append `item` to the matching list of `owner`, creating the list
    pub fn add_item(&mut self, owner: NodeId, item: NodeId) -> OperationResult {
        let item_code = self.kind(item).ok_or(OperationError::Failed)?.code();
        let owner_ref = self.element(owner).ok_or(OperationError::Failed)?;
        let list_kind = owner_ref
            .kind()
            .child_lists()
            .iter()
            .copied()
            .find(|k| k.item_kind() == item_code)
            .ok_or(OperationError::InvalidObject)?;
        owner_ref.check_compatibility(self.element(item).as_ref())?;
        let list = self.ensure_list(owner, list_kind)?;
        self.add_to_list(list, item)
    }

    /// Detach and return item `index` of `list`
    pub fn remove_list_item(&mut self, list: NodeId, index: usize) -> OperationResult<NodeId> {
        let item = self
            .child(list, index)
            .ok_or(OperationError::IndexOutOfRange)?;
        self.detach(item)?;
        Ok(item)
    }

    /// First attached element with `id`
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.subtree(self.root)
            .into_iter()
            .find(|n| self.element(*n).and_then(|e| e.id()) == Some(id))
    }

    /// First attached element with `metaid`
    pub fn element_by_meta_id(&self, meta_id: &str) -> Option<NodeId> {
        self.subtree(self.root)
            .into_iter()
            .find(|n| self.element(*n).and_then(|e| e.meta_id()) == Some(meta_id))
    }

    /// Attached elements below the root accepted by `filter`
    pub fn all_elements<F>(&self, filter: F) -> Vec<NodeId>
    where
        F: Fn(&ElementRef<'_>) -> bool,
    {
        self.subtree(self.root)
            .into_iter()
            .skip(1)
            .filter(|n| self.element(*n).map_or(false, |e| filter(&e)))
            .collect()
    }

    /// Record a finding at the position of element `id`
    ///
    /// Findings for floating elements have nowhere to go and are dropped.
    pub(crate) fn log_for(
        &mut self,
        id: NodeId,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) {
        let (line, column) = match self.nodes.get(id) {
            Some(node) if node.base.document == Some(self.id) => {
                (node.base.line, node.base.column)
            }
            _ => {
                tracing::warn!(
                    node = %id,
                    code = code.as_u32(),
                    "diagnostic dropped for floating element"
                );
                return;
            }
        };
        let (level, version) = (self.level(), self.version());
        self.diagnostics.log(code, level, version, message, line, column);
    }

    /// Report ids used by more than one attached element
    ///
    /// Logs `DuplicateComponentId` at every repeat and returns how many were
    /// found.
    pub fn check_consistency(&mut self) -> usize {
        let mut first_seen: HashMap<String, NodeId> = HashMap::new();
        let mut repeats = Vec::new();
        for n in self.subtree(self.root) {
            let Some(id) = self.element(n).and_then(|e| e.id()).map(str::to_string) else {
                continue;
            };
            match first_seen.get(&id) {
                Some(first) => repeats.push((n, id, *first)),
                None => {
                    first_seen.insert(id, n);
                }
            }
        }
        let count = repeats.len();
        for (n, id, first) in repeats {
            let (line, column) = self
                .element(first)
                .map_or((0, 0), |e| (e.line(), e.column()));
            let message = format!(
                "The id '{}' is already used by the element at line {} column {}.",
                id, line, column
            );
            self.log_for(n, DiagnosticCode::DuplicateComponentId, message);
        }
        count
    }
}
