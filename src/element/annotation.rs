//! Annotation content
//!
//! An annotation is an `<annotation>` wrapper holding foreign-namespace
//! elements, at most one per top-level element name.

use crate::diagnostics::DiagnosticCode;
use crate::error::{OperationError, OperationResult};
use crate::namespaces::{is_sedml_namespace, XmlNamespaces};
use crate::xml::node::{XmlElement, XmlNode};

/// Put `node` into an `<annotation>` wrapper unless it is one already
fn into_wrapper(node: &XmlNode) -> XmlElement {
    if let XmlNode::Element(e) = node {
        if e.name == "annotation" {
            return e.clone();
        }
    }
    let mut wrapper = XmlElement::new("annotation");
    wrapper.add_child(node.clone());
    wrapper
}

fn parse_content(text: &str, toplevel: Option<&XmlNamespaces>) -> OperationResult<XmlNode> {
    XmlNode::parse(text, toplevel).map_err(|_| OperationError::InvalidObject)
}

/// Replace the annotation; `None` or empty content removes it
pub(crate) fn set_annotation(slot: &mut Option<XmlElement>, node: Option<&XmlNode>) {
    *slot = node
        .filter(|n| !n.is_empty())
        .map(into_wrapper);
}

/// Replace the annotation with parsed `text`; an empty string removes it
pub(crate) fn set_annotation_str(
    slot: &mut Option<XmlElement>,
    text: &str,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    if text.is_empty() {
        *slot = None;
        return Ok(());
    }
    let node = parse_content(text, toplevel)?;
    set_annotation(slot, Some(&node));
    Ok(())
}

/// Add the top-level children of `node` to the annotation
///
/// Children whose element name is already present are skipped; the rest
/// are committed and `DuplicateAnnotationNamespace` reports the skips.
pub(crate) fn append_annotation(slot: &mut Option<XmlElement>, node: &XmlNode) -> OperationResult {
    if node.is_empty() {
        return Ok(());
    }
    let incoming = into_wrapper(node);
    let Some(current) = slot.as_mut() else {
        *slot = Some(incoming);
        return Ok(());
    };

    // children leave the incoming wrapper, so they take its declarations along
    let XmlElement {
        namespaces: source,
        children,
        ..
    } = incoming;
    let mut skipped = 0;
    for mut child in children {
        let collides = child
            .as_element()
            .map_or(false, |e| current.index_of(&e.name).is_some());
        if collides {
            skipped += 1;
        } else {
            child.bind_free_prefixes(&source, &current.namespaces);
            current.add_child(child);
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "annotation children skipped on append");
        return Err(OperationError::DuplicateAnnotationNamespace);
    }
    Ok(())
}

/// Append parsed `text` to the annotation
pub(crate) fn append_annotation_str(
    slot: &mut Option<XmlElement>,
    text: &str,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    if text.is_empty() {
        return Ok(());
    }
    let node = parse_content(text, toplevel)?;
    append_annotation(slot, &node)
}

fn declares(element: &XmlElement, uri: &str) -> bool {
    if element.prefix.is_empty() {
        element.uri == uri || element.namespaces.contains_uri(uri)
    } else {
        element.uri == uri
    }
}

/// Remove the top-level child named `name`, optionally checking its URI
///
/// Having no annotation at all is not an error. A wrapper left empty is
/// dropped.
pub(crate) fn remove_top_level_element(
    slot: &mut Option<XmlElement>,
    name: &str,
    uri: Option<&str>,
) -> OperationResult {
    let Some(annotation) = slot.as_mut() else {
        return Ok(());
    };
    let index = annotation
        .index_of(name)
        .ok_or(OperationError::AnnotationNameNotFound)?;
    if let Some(uri) = uri.filter(|u| !u.is_empty()) {
        let matches = annotation
            .child(index)
            .and_then(XmlNode::as_element)
            .map_or(false, |e| declares(e, uri));
        if !matches {
            return Err(OperationError::AnnotationNamespaceNotFound);
        }
    }
    annotation.remove_child(index);
    if annotation.children.is_empty() {
        *slot = None;
    }
    Ok(())
}

/// Replace the top-level child with the same name as `node`
///
/// A wrapper must hold exactly one child.
pub(crate) fn replace_top_level_element(
    slot: &mut Option<XmlElement>,
    node: &XmlNode,
) -> OperationResult {
    let replacement = if let Some(wrapper) = node.as_element().filter(|e| e.name == "annotation") {
        match wrapper.children.as_slice() {
            [only] => {
                let mut only = only.clone();
                only.bind_free_prefixes(&wrapper.namespaces, &XmlNamespaces::new());
                only
            }
            _ => return Err(OperationError::InvalidObject),
        }
    } else {
        node.clone()
    };
    remove_top_level_element(slot, replacement.name(), None)?;
    append_annotation(slot, &replacement)
}

/// Replace the top-level child named like the parsed `text`
pub(crate) fn replace_top_level_element_str(
    slot: &mut Option<XmlElement>,
    text: &str,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    let node = parse_content(text, toplevel)?;
    replace_top_level_element(slot, &node)
}

/// Check an annotation read from a document, returning the findings
///
/// `toplevel` holds the document's declarations, which give implicit
/// bindings for children that declare nothing themselves.
pub(crate) fn check_annotation(
    annotation: &XmlElement,
    toplevel: &XmlNamespaces,
    element_name: &str,
) -> Vec<(DiagnosticCode, String)> {
    let mut findings = Vec::new();
    let mut seen: Vec<&str> = Vec::new();

    for child in &annotation.children {
        let Some(element) = child.as_element() else {
            findings.push((
                DiagnosticCode::AnnotationNotElement,
                format!(
                    "The <annotation> on <{}> contains content that is not an XML element.",
                    element_name
                ),
            ));
            continue;
        };

        if !element.uri.is_empty() {
            if seen.contains(&element.uri.as_str()) {
                findings.push((
                    DiagnosticCode::DuplicateAnnotationNamespaces,
                    format!(
                        "There is more than one top-level element in the <annotation> of <{}> in the namespace '{}'.",
                        element_name, element.uri
                    ),
                ));
            } else {
                seen.push(&element.uri);
            }
        }

        if element.namespaces.is_empty() {
            if !toplevel.has_prefix(&element.prefix) {
                findings.push((
                    DiagnosticCode::MissingAnnotationNamespace,
                    format!(
                        "The top-level element <{}> of the <annotation> on <{}> does not declare a namespace.",
                        element.qualified_name(),
                        element_name
                    ),
                ));
            } else if element.prefix.is_empty() {
                findings.push((
                    DiagnosticCode::MissingAnnotationNamespace,
                    format!(
                        "The top-level element <{}> of the <annotation> on <{}> assumes the sedml namespace.",
                        element.name, element_name
                    ),
                ));
            }
            continue;
        }

        if element.namespaces.iter().any(|(_, uri)| is_sedml_namespace(uri)) {
            findings.push((
                DiagnosticCode::NamespaceInAnnotation,
                format!(
                    "The top-level element <{}> of the <annotation> on <{}> uses a SED-ML namespace.",
                    element.qualified_name(),
                    element_name
                ),
            ));
            break;
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "<a:info xmlns:a=\"urn:a\">one</a:info>";
    const B: &str = "<b:info2 xmlns:b=\"urn:b\"/>";

    fn node(text: &str) -> XmlNode {
        XmlNode::parse(text, None).unwrap()
    }

    fn names(slot: &Option<XmlElement>) -> Vec<String> {
        slot.as_ref()
            .map(|a| a.element_children().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_appended_children_keep_wrapper_declarations() {
        let mut slot = None;
        append_annotation(&mut slot, &node(A)).unwrap();
        append_annotation(
            &mut slot,
            &node("<annotation xmlns:c=\"urn:c\"><c:more><c:deeper/></c:more></annotation>"),
        )
        .unwrap();

        let annotation = slot.as_ref().unwrap();
        assert_eq!(
            annotation.to_xml_string(),
            "<annotation><a:info xmlns:a=\"urn:a\">one</a:info>\
             <c:more xmlns:c=\"urn:c\"><c:deeper/></c:more></annotation>"
        );
    }

    #[test]
    fn test_replace_from_wrapper_keeps_declarations() {
        let mut slot = None;
        append_annotation(&mut slot, &node("<c:more xmlns:c=\"urn:c\">v1</c:more>")).unwrap();
        replace_top_level_element(
            &mut slot,
            &node("<annotation xmlns:c=\"urn:c\"><c:more>v2</c:more></annotation>"),
        )
        .unwrap();
        assert_eq!(
            slot.as_ref().unwrap().to_xml_string(),
            "<annotation><c:more xmlns:c=\"urn:c\">v2</c:more></annotation>"
        );
    }

    #[test]
    fn test_set_wraps_and_unsets() {
        let mut slot = None;
        set_annotation(&mut slot, Some(&node(A)));
        assert_eq!(slot.as_ref().map(|a| a.name.as_str()), Some("annotation"));
        assert_eq!(names(&slot), vec!["info"]);

        set_annotation_str(&mut slot, "", None).unwrap();
        assert!(slot.is_none());
        assert_eq!(
            set_annotation_str(&mut slot, "<broken>", None),
            Err(OperationError::InvalidObject)
        );
    }

    #[test]
    fn test_append_skips_duplicates() {
        let mut slot = None;
        append_annotation_str(&mut slot, A, None).unwrap();
        append_annotation_str(&mut slot, B, None).unwrap();
        assert_eq!(names(&slot), vec!["info", "info2"]);

        let both = format!("<annotation>{}<c:more xmlns:c=\"urn:c\"/></annotation>", A);
        assert_eq!(
            append_annotation_str(&mut slot, &both, None),
            Err(OperationError::DuplicateAnnotationNamespace)
        );
        assert_eq!(names(&slot), vec!["info", "info2", "more"]);
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut slot = None;
        append_annotation(&mut slot, &XmlNode::Fragment(Vec::new())).unwrap();
        assert!(slot.is_none());
    }

    #[test]
    fn test_remove_top_level() {
        let mut slot = None;
        assert_eq!(remove_top_level_element(&mut slot, "info", None), Ok(()));

        append_annotation_str(&mut slot, A, None).unwrap();
        append_annotation_str(&mut slot, B, None).unwrap();
        assert_eq!(
            remove_top_level_element(&mut slot, "missing", None),
            Err(OperationError::AnnotationNameNotFound)
        );
        assert_eq!(
            remove_top_level_element(&mut slot, "info", Some("urn:other")),
            Err(OperationError::AnnotationNamespaceNotFound)
        );
        remove_top_level_element(&mut slot, "info", Some("urn:a")).unwrap();
        assert_eq!(names(&slot), vec!["info2"]);
        remove_top_level_element(&mut slot, "info2", None).unwrap();
        assert!(slot.is_none());
    }

    #[test]
    fn test_remove_matches_declared_default() {
        let mut slot = None;
        append_annotation_str(&mut slot, "<x xmlns=\"urn:x\"/>", None).unwrap();
        remove_top_level_element(&mut slot, "x", Some("urn:x")).unwrap();
        assert!(slot.is_none());
    }

    #[test]
    fn test_replace_top_level() {
        let mut slot = None;
        append_annotation_str(&mut slot, A, None).unwrap();
        append_annotation_str(&mut slot, B, None).unwrap();

        replace_top_level_element_str(&mut slot, "<a:info xmlns:a=\"urn:a\">two</a:info>", None)
            .unwrap();
        assert_eq!(names(&slot), vec!["info2", "info"]);
        let text = slot.as_ref().unwrap().text_content();
        assert_eq!(text, "two");

        let two = format!("<annotation>{}{}</annotation>", A, B);
        assert_eq!(
            replace_top_level_element_str(&mut slot, &two, None),
            Err(OperationError::InvalidObject)
        );
        assert_eq!(
            replace_top_level_element_str(&mut slot, "<zz xmlns=\"urn:z\"/>", None),
            Err(OperationError::AnnotationNameNotFound)
        );
    }

    #[test]
    fn test_check_annotation() {
        let mut toplevel = XmlNamespaces::new();
        toplevel.add("http://sed-ml.org/sed-ml/level1/version4", "");
        toplevel.add("urn:r", "r");

        let ann = node(
            "<annotation xmlns:r=\"urn:r\">\
             <a:one xmlns:a=\"urn:a\"/>\
             <a:two xmlns:a=\"urn:a\"/>\
             <r:three/>\
             <plain/>\
             </annotation>",
        );
        let codes: Vec<DiagnosticCode> = check_annotation(ann.as_element().unwrap(), &toplevel, "model")
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::DuplicateAnnotationNamespaces,
                DiagnosticCode::MissingAnnotationNamespace
            ]
        );
    }

    #[test]
    fn test_check_annotation_sedml_namespace() {
        let toplevel = XmlNamespaces::new();
        let ann = node(
            "<annotation><s:x xmlns:s=\"http://sed-ml.org/sed-ml/level1/version4\"/><y xmlns=\"urn:y\"/></annotation>",
        );
        let findings = check_annotation(ann.as_element().unwrap(), &toplevel, "sedML");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].0, DiagnosticCode::NamespaceInAnnotation);
    }
}
