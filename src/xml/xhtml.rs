//! XHTML syntax checks for notes content

use crate::namespaces::{XmlNamespaces, XHTML_NAMESPACE};
use crate::xml::node::{XmlElement, XmlNode};

// Elements permitted directly inside an XHTML body
const ALLOWED_IN_BODY: &[&str] = &[
    "a", "abbr", "acronym", "address", "applet", "b", "basefont", "bdo", "big", "blockquote",
    "br", "button", "center", "cite", "code", "del", "dfn", "dir", "div", "dl", "em", "fieldset",
    "font", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "iframe", "img", "input", "ins",
    "isindex", "kbd", "label", "map", "menu", "noframes", "noscript", "object", "ol", "p", "pre",
    "q", "s", "samp", "script", "select", "small", "span", "strike", "strong", "sub", "sup",
    "table", "textarea", "tt", "u", "ul", "var",
];

/// Check if `node` is an element permitted inside an XHTML body
pub fn is_allowed_element(node: &XmlNode) -> bool {
    node.as_element()
        .map_or(false, |e| ALLOWED_IN_BODY.contains(&e.name.as_str()))
}

/// Check if `element` is bound to XHTML by its own declarations or by
/// the document-level declarations in `toplevel`
pub fn has_declared_ns(element: &XmlElement, toplevel: Option<&XmlNamespaces>) -> bool {
    if element.namespaces.contains_uri(XHTML_NAMESPACE) {
        return true;
    }
    toplevel
        .and_then(|ns| ns.uri_for(&element.prefix))
        .map_or(false, |uri| uri == XHTML_NAMESPACE)
}

/// Check that an `html` element holds exactly `head` then `body`
pub fn is_correct_html_node(element: &XmlElement) -> bool {
    if element.name != "html" {
        return true;
    }
    match element.children.as_slice() {
        [head, body] => head.name() == "head" && body.name() == "body",
        _ => false,
    }
}

/// Check the children of a `notes` envelope against the XHTML rules
///
/// The content must be either a single `html` or `body` element, or a
/// sequence of body-level elements, each bound to the XHTML namespace.
pub fn has_expected_xhtml_syntax(notes: &XmlElement, toplevel: Option<&XmlNamespaces>) -> bool {
    match notes.children.as_slice() {
        [] => false,
        [only] => {
            let Some(element) = only.as_element() else {
                return false;
            };
            let top = element.name.as_str();
            if top != "html" && top != "body" && !is_allowed_element(only) {
                return false;
            }
            has_declared_ns(element, toplevel) && is_correct_html_node(element)
        }
        children => children.iter().all(|child| match child.as_element() {
            Some(element) => is_allowed_element(child) && has_declared_ns(element, toplevel),
            None => false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xhtml(name: &str) -> XmlElement {
        XmlElement::with_default_namespace(name, XHTML_NAMESPACE)
    }

    fn notes_of(children: Vec<XmlNode>) -> XmlElement {
        let mut notes = XmlElement::new("notes");
        notes.children = children;
        notes
    }

    #[test]
    fn test_single_paragraph() {
        let notes = notes_of(vec![xhtml("p").into()]);
        assert!(has_expected_xhtml_syntax(&notes, None));
    }

    #[test]
    fn test_missing_namespace() {
        let notes = notes_of(vec![XmlElement::new("p").into()]);
        assert!(!has_expected_xhtml_syntax(&notes, None));

        // implicit declaration through the document
        let mut toplevel = XmlNamespaces::new();
        toplevel.add(XHTML_NAMESPACE, "");
        assert!(has_expected_xhtml_syntax(&notes, Some(&toplevel)));
    }

    #[test]
    fn test_html_shape() {
        let mut html = xhtml("html");
        html.children = vec![XmlElement::new("head").into(), XmlElement::new("body").into()];
        assert!(has_expected_xhtml_syntax(&notes_of(vec![html.clone().into()]), None));

        html.children.reverse();
        assert!(!has_expected_xhtml_syntax(&notes_of(vec![html.into()]), None));
    }

    #[test]
    fn test_disallowed_elements() {
        let notes = notes_of(vec![xhtml("p").into(), xhtml("body").into()]);
        assert!(!has_expected_xhtml_syntax(&notes, None));

        let notes = notes_of(vec![xhtml("title").into()]);
        assert!(!has_expected_xhtml_syntax(&notes, None));

        let notes = notes_of(vec![XmlNode::text("plain")]);
        assert!(!has_expected_xhtml_syntax(&notes, None));

        assert!(!has_expected_xhtml_syntax(&notes_of(Vec::new()), None));
    }
}
