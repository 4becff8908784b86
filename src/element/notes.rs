//! Notes content
//!
//! Notes are stored as a `<notes>` envelope whose children must form one
//! of three XHTML shapes: a whole `html` document, a single `body`, or a
//! run of body-level elements. Setting replaces the content; appending
//! merges it according to the shapes on both sides.
//!
//! All operations here work on the `Option<XmlElement>` slot of a node and
//! commit only once the result has passed validation.

use crate::diagnostics::DiagnosticCode;
use crate::error::{OperationError, OperationResult};
use crate::namespaces::{XmlNamespaces, XHTML_NAMESPACE};
use crate::xml::node::{scope_of, XmlElement, XmlNode};
use crate::xml::xhtml::{
    has_declared_ns, has_expected_xhtml_syntax, is_allowed_element, is_correct_html_node,
};

/// Top-level shape of notes content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesShape {
    /// A single `html` element
    Html,
    /// A single `body` element
    Body,
    /// Anything else: a run of body-level elements
    Any,
}

impl NotesShape {
    /// Shape of the content of a `<notes>` envelope
    pub fn of_envelope(notes: &XmlElement) -> NotesShape {
        match notes.child(0).map(XmlNode::name) {
            Some("html") => NotesShape::Html,
            Some("body") => NotesShape::Body,
            _ => NotesShape::Any,
        }
    }
}

/// Put `node` into a `<notes>` envelope unless it is one already
fn into_envelope(node: &XmlNode) -> XmlElement {
    if let XmlNode::Element(e) = node {
        if e.name == "notes" {
            return e.clone();
        }
    }
    let mut envelope = XmlElement::new("notes");
    envelope.add_child(node.clone());
    envelope
}

fn wrap_text_in_paragraph(node: XmlNode) -> XmlNode {
    if !node.is_text() {
        return node;
    }
    let mut p = XmlElement::with_default_namespace("p", XHTML_NAMESPACE);
    p.add_child(node);
    p.into()
}

fn parse_content(
    text: &str,
    add_xhtml_markup: bool,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult<XmlNode> {
    let node = XmlNode::parse(text, toplevel).map_err(|_| OperationError::InvalidObject)?;
    Ok(if add_xhtml_markup {
        wrap_text_in_paragraph(node)
    } else {
        node
    })
}

/// Replace the notes with `node`
///
/// On a validation failure the previous notes are kept.
pub(crate) fn set_notes(
    slot: &mut Option<XmlElement>,
    node: &XmlNode,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    let envelope = into_envelope(node);
    if !has_expected_xhtml_syntax(&envelope, toplevel) {
        return Err(OperationError::InvalidObject);
    }
    *slot = Some(envelope);
    Ok(())
}

/// Replace the notes with parsed `text`; an empty string removes them
pub(crate) fn set_notes_str(
    slot: &mut Option<XmlElement>,
    text: &str,
    add_xhtml_markup: bool,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    if text.is_empty() {
        *slot = None;
        return Ok(());
    }
    let node = parse_content(text, add_xhtml_markup, toplevel)?;
    set_notes(slot, &node, toplevel)
}

/// Classify incoming content; `None` means there is nothing to add
fn classify(node: &XmlNode) -> Option<(NotesShape, XmlElement)> {
    match node {
        XmlNode::Element(e) if e.name == "notes" => {
            if e.children.is_empty() {
                return None;
            }
            Some((NotesShape::of_envelope(e), e.clone()))
        }
        XmlNode::Fragment(nodes) if nodes.is_empty() => None,
        XmlNode::Fragment(_) => Some((NotesShape::Any, into_envelope(node))),
        XmlNode::Element(e) => {
            let shape = match e.name.as_str() {
                "html" => NotesShape::Html,
                "body" => NotesShape::Body,
                _ => NotesShape::Any,
            };
            Some((shape, into_envelope(node)))
        }
        XmlNode::Text(t) if t.is_empty() => None,
        XmlNode::Text(_) => Some((NotesShape::Any, into_envelope(node))),
    }
}

fn html_body_mut(html: &mut XmlElement) -> Option<&mut XmlElement> {
    html.children.get_mut(1).and_then(XmlNode::as_element_mut)
}

/// Elements from the envelope down to the one holding body-level content
fn body_chain(envelope: &XmlElement, shape: NotesShape) -> Vec<&XmlElement> {
    let mut chain = vec![envelope];
    match (shape, envelope.child(0).and_then(XmlNode::as_element)) {
        (NotesShape::Html, Some(html)) => {
            chain.push(html);
            chain.extend(html.child(1).and_then(XmlNode::as_element));
        }
        (NotesShape::Body, Some(body)) => chain.push(body),
        _ => {}
    }
    chain
}

/// Declarations in scope for body-level content of the envelope
fn body_scope(envelope: &XmlElement, shape: NotesShape) -> XmlNamespaces {
    scope_of(body_chain(envelope, shape))
}

/// Body-level content of an envelope, ready to be placed under `target`
///
/// Each node declares the prefixes it borrowed from the elements it is
/// taken out of.
fn body_content(
    envelope: &XmlElement,
    shape: NotesShape,
    target: &XmlNamespaces,
) -> Vec<XmlNode> {
    let chain = body_chain(envelope, shape);
    if shape == NotesShape::Html && chain.len() < 3 {
        return Vec::new();
    }
    let source = scope_of(chain.iter().copied());
    let Some(holder) = chain.last() else {
        return Vec::new();
    };
    holder
        .children
        .iter()
        .cloned()
        .map(|mut node| {
            node.bind_free_prefixes(&source, target);
            node
        })
        .collect()
}

/// Prefix `leading` to the body of the single `html`/`body` in `added`
fn with_leading_content(
    mut added: XmlElement,
    shape: NotesShape,
    leading: Vec<XmlNode>,
) -> Option<XmlElement> {
    let first = added.children.get_mut(0)?.as_element_mut()?;
    let body = match shape {
        NotesShape::Html => html_body_mut(first)?,
        _ => first,
    };
    let rest = std::mem::take(&mut body.children);
    body.children = leading;
    body.children.extend(rest);
    Some(added)
}

/// Merge `node` into the existing notes
///
/// Empty input is a no-op. Without existing notes this is a plain set.
pub(crate) fn append_notes(
    slot: &mut Option<XmlElement>,
    node: &XmlNode,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    let Some((added_shape, added)) = classify(node) else {
        return Ok(());
    };
    if added_shape == NotesShape::Html {
        let html = added.child(0).and_then(XmlNode::as_element);
        if !html.map_or(false, is_correct_html_node) {
            return Err(OperationError::InvalidObject);
        }
    }
    if !has_expected_xhtml_syntax(&added, toplevel) {
        return Err(OperationError::InvalidObject);
    }

    let Some(current) = slot.as_ref() else {
        *slot = Some(added);
        return Ok(());
    };

    let current_shape = NotesShape::of_envelope(current);
    if current_shape == NotesShape::Html {
        let html = current.child(0).and_then(XmlNode::as_element);
        if !html.map_or(false, is_correct_html_node) {
            return Err(OperationError::InvalidObject);
        }
    }

    let mut merged = current.clone();
    match (current_shape, added_shape) {
        (NotesShape::Html, _) => {
            let target = body_scope(&merged, current_shape);
            let content = body_content(&added, added_shape, &target);
            let body = merged
                .children
                .get_mut(0)
                .and_then(XmlNode::as_element_mut)
                .and_then(html_body_mut)
                .ok_or(OperationError::InvalidObject)?;
            body.children.extend(content);
        }
        (NotesShape::Body, NotesShape::Html)
        | (NotesShape::Any, NotesShape::Html | NotesShape::Body) => {
            let target = body_scope(&added, added_shape);
            let leading = body_content(&merged, current_shape, &target);
            merged = with_leading_content(added, added_shape, leading)
                .ok_or(OperationError::InvalidObject)?;
        }
        (NotesShape::Body, _) => {
            let target = body_scope(&merged, current_shape);
            let content = body_content(&added, added_shape, &target);
            let body = merged
                .children
                .get_mut(0)
                .and_then(XmlNode::as_element_mut)
                .ok_or(OperationError::InvalidObject)?;
            body.children.extend(content);
        }
        (NotesShape::Any, NotesShape::Any) => {
            let content = body_content(&added, added_shape, &merged.namespaces);
            merged.children.extend(content);
        }
    }

    if !has_expected_xhtml_syntax(&merged, toplevel) {
        return Err(OperationError::InvalidObject);
    }
    *slot = Some(merged);
    Ok(())
}

/// Merge parsed `text` into the existing notes
pub(crate) fn append_notes_str(
    slot: &mut Option<XmlElement>,
    text: &str,
    add_xhtml_markup: bool,
    toplevel: Option<&XmlNamespaces>,
) -> OperationResult {
    if text.is_empty() {
        return Ok(());
    }
    let node = parse_content(text, add_xhtml_markup, toplevel)?;
    append_notes(slot, &node, toplevel)
}

/// Check notes read from a document, returning the findings
pub(crate) fn check_xhtml(
    notes: &XmlElement,
    toplevel: Option<&XmlNamespaces>,
) -> Vec<(DiagnosticCode, String)> {
    let mut findings = Vec::new();
    let several = notes.num_children() > 1;
    for child in &notes.children {
        let Some(element) = child.as_element() else {
            findings.push((
                DiagnosticCode::InvalidNotesContent,
                "The content of a <notes> element must be XHTML elements, not bare text."
                    .to_string(),
            ));
            continue;
        };
        let top = element.name.as_str();
        if top == "html" || top == "body" {
            if several {
                findings.push((
                    DiagnosticCode::InvalidNotesContent,
                    format!("An XHTML <{}> element must be the only child of <notes>.", top),
                ));
            } else if !is_correct_html_node(element) {
                findings.push((
                    DiagnosticCode::InvalidNotesContent,
                    "An XHTML <html> element must contain <head> followed by <body>.".to_string(),
                ));
            }
        } else if !is_allowed_element(child) {
            findings.push((
                DiagnosticCode::InvalidNotesContent,
                format!("The XHTML element <{}> is not permitted in <notes>.", top),
            ));
        }
        if !has_declared_ns(element, toplevel) {
            findings.push((
                DiagnosticCode::NotesNotInXhtmlNamespace,
                format!(
                    "The <{}> element in <notes> is not in the XHTML namespace '{}'.",
                    top, XHTML_NAMESPACE
                ),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const P: &str = "<p xmlns=\"http://www.w3.org/1999/xhtml\">first</p>";
    const BODY: &str = "<body xmlns=\"http://www.w3.org/1999/xhtml\"><p>in body</p></body>";
    const HTML: &str = "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>t</title></head><body><p>in html</p></body></html>";

    fn node(text: &str) -> XmlNode {
        XmlNode::parse(text, None).unwrap()
    }

    fn set(text: &str) -> Option<XmlElement> {
        let mut slot = None;
        set_notes_str(&mut slot, text, false, None).unwrap();
        slot
    }

    fn paragraphs(notes: &XmlElement) -> Vec<String> {
        fn walk(node: &XmlNode, out: &mut Vec<String>) {
            if node.name() == "p" {
                if let Some(e) = node.as_element() {
                    out.push(e.text_content());
                }
            }
            for child in node.children() {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for child in &notes.children {
            walk(child, &mut out);
        }
        out
    }

    #[test]
    fn test_set_wraps_in_envelope() {
        let notes = set(P).unwrap();
        assert_eq!(notes.name, "notes");
        assert_eq!(notes.num_children(), 1);
        assert_eq!(NotesShape::of_envelope(&notes), NotesShape::Any);
    }

    #[test]
    fn test_set_keeps_envelope() {
        let mut slot = None;
        let envelope = format!("<notes>{}</notes>", P);
        set_notes(&mut slot, &node(&envelope), None).unwrap();
        assert_eq!(slot.unwrap().num_children(), 1);
    }

    #[test]
    fn test_set_invalid_keeps_previous() {
        let mut slot = set(P);
        let before = slot.clone();
        assert_eq!(
            set_notes_str(&mut slot, "<p>no namespace</p>", false, None),
            Err(OperationError::InvalidObject)
        );
        assert_eq!(slot, before);
        assert_eq!(
            set_notes_str(&mut slot, "<p>", false, None),
            Err(OperationError::InvalidObject)
        );
    }

    #[test]
    fn test_set_empty_string_unsets() {
        let mut slot = set(P);
        set_notes_str(&mut slot, "", false, None).unwrap();
        assert!(slot.is_none());
    }

    #[test]
    fn test_set_text_with_markup() {
        let mut slot = None;
        assert!(set_notes_str(&mut slot, "plain words", false, None).is_err());
        set_notes_str(&mut slot, "plain words", true, None).unwrap();
        let notes = slot.unwrap();
        assert_eq!(paragraphs(&notes), vec!["plain words"]);
    }

    #[test]
    fn test_append_without_notes_sets() {
        let mut slot = None;
        append_notes_str(&mut slot, BODY, false, None).unwrap();
        assert_eq!(NotesShape::of_envelope(slot.as_ref().unwrap()), NotesShape::Body);
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut slot = set(P);
        let before = slot.clone();
        append_notes(&mut slot, &XmlNode::Fragment(Vec::new()), None).unwrap();
        append_notes(&mut slot, &XmlElement::new("notes").into(), None).unwrap();
        append_notes_str(&mut slot, "", false, None).unwrap();
        assert_eq!(slot, before);
    }

    #[test]
    fn test_append_html_into_html() {
        let mut slot = set(HTML);
        append_notes_str(&mut slot, HTML, false, None).unwrap();
        let notes = slot.unwrap();
        assert_eq!(NotesShape::of_envelope(&notes), NotesShape::Html);
        assert_eq!(paragraphs(&notes), vec!["in html", "in html"]);
    }

    #[test]
    fn test_append_any_into_html() {
        let mut slot = set(HTML);
        append_notes_str(&mut slot, P, false, None).unwrap();
        assert_eq!(paragraphs(slot.as_ref().unwrap()), vec!["in html", "first"]);
    }

    #[test]
    fn test_append_html_into_body() {
        let mut slot = set(BODY);
        append_notes_str(&mut slot, HTML, false, None).unwrap();
        let notes = slot.unwrap();
        assert_eq!(NotesShape::of_envelope(&notes), NotesShape::Html);
        assert_eq!(paragraphs(&notes), vec!["in body", "in html"]);
    }

    #[test]
    fn test_append_any_into_body() {
        let mut slot = set(BODY);
        append_notes_str(&mut slot, P, false, None).unwrap();
        let notes = slot.unwrap();
        assert_eq!(NotesShape::of_envelope(&notes), NotesShape::Body);
        assert_eq!(paragraphs(&notes), vec!["in body", "first"]);
    }

    #[test]
    fn test_append_body_into_any() {
        let mut slot = set(P);
        append_notes_str(&mut slot, BODY, false, None).unwrap();
        let notes = slot.unwrap();
        assert_eq!(NotesShape::of_envelope(&notes), NotesShape::Body);
        assert_eq!(paragraphs(&notes), vec!["first", "in body"]);
    }

    #[test]
    fn test_append_any_into_any() {
        let mut slot = set(P);
        append_notes_str(&mut slot, P, false, None).unwrap();
        let notes = slot.unwrap();
        assert_eq!(notes.num_children(), 2);
    }

    #[test]
    fn test_append_rejects_bad_html() {
        let mut slot = set(P);
        let before = slot.clone();
        let bad = "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body/><head/></html>";
        assert_eq!(
            append_notes_str(&mut slot, bad, false, None),
            Err(OperationError::InvalidObject)
        );
        assert_eq!(slot, before);
    }

    #[test]
    fn test_append_rejects_missing_namespace() {
        let mut slot = set(P);
        assert_eq!(
            append_notes_str(&mut slot, "<p>bare</p>", false, None),
            Err(OperationError::InvalidObject)
        );
    }

    #[test]
    fn test_prefixed_body_merged_into_html_keeps_binding() {
        let mut slot = set(&format!(
            "<h:body xmlns:h=\"{}\"><h:p>before</h:p></h:body>",
            XHTML_NAMESPACE
        ));
        append_notes_str(&mut slot, HTML, false, None).unwrap();

        let notes = slot.unwrap();
        assert_eq!(NotesShape::of_envelope(&notes), NotesShape::Html);
        assert_eq!(paragraphs(&notes), vec!["before", "in html"]);

        let body = notes.child(0).and_then(|html| html.child(1)).unwrap();
        let moved = body.child(0).and_then(XmlNode::as_element).unwrap();
        assert_eq!(moved.prefix, "h");
        assert_eq!(moved.declared_namespace_uri("h"), Some(XHTML_NAMESPACE));
        // the plain paragraph already sits under the html default namespace
        let plain = body.child(1).and_then(XmlNode::as_element).unwrap();
        assert!(plain.namespaces.is_empty());
    }

    #[test]
    fn test_check_xhtml_findings() {
        let notes = node("<notes><p>bare</p><title xmlns=\"http://www.w3.org/1999/xhtml\"/></notes>");
        let codes: Vec<DiagnosticCode> = check_xhtml(notes.as_element().unwrap(), None)
            .into_iter()
            .map(|(code, _)| code)
            .collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::NotesNotInXhtmlNamespace,
                DiagnosticCode::InvalidNotesContent
            ]
        );

        let good = node(&format!("<notes>{}</notes>", P));
        assert!(check_xhtml(good.as_element().unwrap(), None).is_empty());
    }
}
