//! Fields shared by every element node

use crate::arena::NodeId;
use crate::document::DocumentId;
use crate::element::kinds::ElementKind;
use crate::error::{OperationError, OperationResult};
use crate::names::{is_valid_sid, is_valid_xml_id};
use crate::namespaces::XmlNamespaces;
use crate::xml::node::XmlElement;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Common state of an element node
#[derive(Clone, Default)]
pub(crate) struct ElementBase {
    pub(crate) meta_id: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    /// Always the `<notes>` envelope
    pub(crate) notes: Option<XmlElement>,
    /// Always the `<annotation>` wrapper
    pub(crate) annotation: Option<XmlElement>,
    pub(crate) element_namespace: String,
    /// Declarations made on the element itself
    pub(crate) own_namespaces: Option<XmlNamespaces>,
    /// Declarations the node was created with; used while floating
    pub(crate) seed_namespaces: XmlNamespaces,
    /// Level/version the node was created with; used while floating
    pub(crate) level: u32,
    pub(crate) version: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) document: Option<DocumentId>,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) user_data: Option<Rc<dyn Any>>,
    pub(crate) id_allowed_pre_v4: bool,
    pub(crate) name_allowed_pre_v4: bool,
    pub(crate) text: String,
}

impl fmt::Debug for ElementBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementBase")
            .field("meta_id", &self.meta_id)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("element_namespace", &self.element_namespace)
            .field("level", &self.level)
            .field("version", &self.version)
            .field("parent", &self.parent)
            .field("document", &self.document)
            .field("line", &self.line)
            .field("column", &self.column)
            .field("user_data", &self.user_data.is_some())
            .finish_non_exhaustive()
    }
}

fn before_v4(level: u32, version: u32) -> bool {
    level == 1 && version < 4
}

impl ElementBase {
    pub(crate) fn for_kind(
        kind: &ElementKind,
        level: u32,
        version: u32,
        element_namespace: &str,
    ) -> Self {
        let mut seed_namespaces = XmlNamespaces::new();
        if !element_namespace.is_empty() {
            seed_namespaces.add(element_namespace, "");
        }
        Self {
            element_namespace: element_namespace.to_string(),
            seed_namespaces,
            level,
            version,
            id_allowed_pre_v4: kind.id_allowed_pre_v4(),
            name_allowed_pre_v4: kind.name_allowed_pre_v4(),
            ..Self::default()
        }
    }

    pub(crate) fn id_gated(&self, level: u32, version: u32) -> bool {
        !self.id_allowed_pre_v4 && before_v4(level, version)
    }

    pub(crate) fn name_gated(&self, level: u32, version: u32) -> bool {
        !self.name_allowed_pre_v4 && before_v4(level, version)
    }

    pub(crate) fn id(&self, level: u32, version: u32) -> Option<&str> {
        if self.id_gated(level, version) {
            return None;
        }
        self.id.as_deref()
    }

    pub(crate) fn name(&self, level: u32, version: u32) -> Option<&str> {
        if self.name_gated(level, version) {
            return None;
        }
        self.name.as_deref()
    }

    pub(crate) fn set_id(&mut self, sid: &str, level: u32, version: u32) -> OperationResult {
        if self.id_gated(level, version) {
            return Err(OperationError::UnexpectedAttribute);
        }
        if sid.is_empty() {
            self.id = None;
            return Ok(());
        }
        if !is_valid_sid(sid) {
            return Err(OperationError::InvalidAttributeValue);
        }
        self.id = Some(sid.to_string());
        Ok(())
    }

    pub(crate) fn set_name(&mut self, name: &str, level: u32, version: u32) -> OperationResult {
        if self.name_gated(level, version) {
            return Err(OperationError::UnexpectedAttribute);
        }
        self.name = (!name.is_empty()).then(|| name.to_string());
        Ok(())
    }

    pub(crate) fn set_meta_id(&mut self, meta_id: &str) -> OperationResult {
        if meta_id.is_empty() {
            self.meta_id = None;
            return Ok(());
        }
        if !is_valid_xml_id(meta_id) {
            return Err(OperationError::InvalidAttributeValue);
        }
        self.meta_id = Some(meta_id.to_string());
        Ok(())
    }

    /// Copy for a deep clone; tree links are not carried over
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            parent: None,
            document: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::kinds::{KindCode, ListKind};

    fn model_base() -> ElementBase {
        ElementBase::for_kind(&ElementKind::for_code(KindCode::Model).unwrap(), 1, 4, "")
    }

    #[test]
    fn test_set_id_rules() {
        let mut base = model_base();
        assert_eq!(base.set_id("m1", 1, 4), Ok(()));
        assert_eq!(base.id(1, 4), Some("m1"));
        assert_eq!(
            base.set_id("1m", 1, 4),
            Err(OperationError::InvalidAttributeValue)
        );
        assert_eq!(base.id(1, 4), Some("m1"));
        assert_eq!(base.set_id("", 1, 4), Ok(()));
        assert_eq!(base.id(1, 4), None);
    }

    #[test]
    fn test_gating_before_version4() {
        let mut list = ElementBase::for_kind(&ElementKind::ListOf(ListKind::Models), 1, 3, "");
        assert_eq!(
            list.set_id("lm", 1, 3),
            Err(OperationError::UnexpectedAttribute)
        );
        assert_eq!(
            list.set_name("models", 1, 3),
            Err(OperationError::UnexpectedAttribute)
        );
        list.id = Some("lm".to_string());
        assert_eq!(list.id(1, 3), None);
        assert_eq!(list.id(1, 4), Some("lm"));

        // models carry id in every version
        let mut model = model_base();
        assert_eq!(model.set_id("m", 1, 1), Ok(()));
    }

    #[test]
    fn test_meta_id() {
        let mut base = model_base();
        assert_eq!(base.set_meta_id("_a.b-c"), Ok(()));
        assert_eq!(
            base.set_meta_id("1abc"),
            Err(OperationError::InvalidAttributeValue)
        );
        assert_eq!(base.meta_id.as_deref(), Some("_a.b-c"));
        assert_eq!(base.set_meta_id(""), Ok(()));
        assert_eq!(base.meta_id, None);
    }

    #[test]
    fn test_detached_copy() {
        let mut base = model_base();
        base.id = Some("m".to_string());
        base.parent = Some(crate::arena::Arena::new().insert(()));
        let copy = base.detached_copy();
        assert_eq!(copy.parent, None);
        assert_eq!(copy.id.as_deref(), Some("m"));
    }
}
