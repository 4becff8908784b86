//! Reading and writing the element tree
//!
//! [`read_element`] consumes one element from a token stream into an
//! existing node: position, namespaces, attributes, then child content in
//! document order. Children are created by the owning kind, attached and
//! read recursively. Whatever the kind does not recognize is logged and
//! skipped, so reading always runs to the end of the element.
//!
//! [`write_element`] is the inverse, writing attributes in a fixed order
//! followed by notes, annotation, math and the child lists.

use crate::arena::NodeId;
use crate::diagnostics::{DiagnosticCode, RetagContext};
use crate::document::Document;
use crate::element::annotation::check_annotation;
use crate::element::attributes::{read_base_attributes, AttributeReader, ExpectedAttributes};
use crate::element::checks::{check_default_namespace, check_mathml_namespace, root_prefix_is_valid};
use crate::element::kinds::{ElementKind, ListKind};
use crate::element::notes::check_xhtml;
use crate::error::Result;
use crate::namespaces::XmlNamespaces;
use crate::xml::node::XmlNode;
use crate::xml::output::{WriterSettings, XmlOutputStream};
use crate::xml::stream::{XmlInputStream, XmlToken};

/// Codes that already explain a bad `<sedML>` start tag
const ROOT_FINDINGS: [DiagnosticCode; 4] = [
    DiagnosticCode::DocumentAllowedCoreAttributes,
    DiagnosticCode::DocumentLevelMustBeNonNegativeInteger,
    DiagnosticCode::DocumentVersionMustBeNonNegativeInteger,
    DiagnosticCode::InvalidNamespaceOnSed,
];

/// Read the element starting at the next token of `stream` into `id`
///
/// Does nothing unless the next token is a start tag.
pub(crate) fn read_element(doc: &mut Document, id: NodeId, stream: &mut XmlInputStream) {
    if !stream.peek().map_or(false, XmlToken::is_start) {
        return;
    }
    let Some(element) = stream.next() else {
        return;
    };
    let is_root = id == doc.root();

    store_position(doc, id, &element, is_root);
    read_attributes(doc, id, &element, is_root);
    check_namespaces(doc, id, &element, is_root);

    if element.is_end() {
        return;
    }

    loop {
        read_text(doc, id, stream);

        let Some(next) = stream.peek().cloned() else {
            break;
        };
        if next.is_end_for(&element) {
            stream.next();
            break;
        }
        if !next.is_start() {
            stream.next();
            continue;
        }

        if let Some(child) = create_object(doc, id, &next) {
            if let Err(e) = doc.attach(id, child) {
                tracing::warn!(error = %e, element = %next.name, "child could not be attached");
                skip_element(stream);
                continue;
            }
            read_element(doc, child, stream);
            check_empty_list(doc, child);
        } else if read_other_xml(doc, id, &next, stream)
            || read_annotation(doc, id, &next, stream)
            || read_notes(doc, id, &next, stream)
        {
            continue;
        } else {
            log_unknown_element(doc, id, &next);
            skip_element(stream);
        }
    }
}

fn skip_element(stream: &mut XmlInputStream) {
    if let Some(start) = stream.next() {
        stream.skip_past_end(&start);
    }
}

fn read_text(doc: &mut Document, id: NodeId, stream: &mut XmlInputStream) {
    let chars = stream.skip_text();
    if chars.is_empty() {
        return;
    }
    if let Some(node) = doc.node_mut(id) {
        node.base.text.push_str(&chars);
    }
}

fn store_position(doc: &mut Document, id: NodeId, element: &XmlToken, is_root: bool) {
    if is_root {
        // the document table is exactly what the root declares
        *doc.namespaces_mut().namespaces_mut() = element.namespaces.clone();
    }
    let Some(node) = doc.node_mut(id) else {
        return;
    };
    node.base.line = element.line;
    node.base.column = element.column;
    if !is_root && !element.namespaces.is_empty() {
        node.base.own_namespaces = Some(element.namespaces.clone());
    }
}

fn read_attributes(doc: &mut Document, id: NodeId, element: &XmlToken, is_root: bool) {
    let (level, version) = (doc.level(), doc.version());
    let Some(node) = doc.node_mut(id) else {
        return;
    };

    let mut reader = AttributeReader::new(element, node.kind.element_name(), level, version);
    reader.check_unknown(&ExpectedAttributes::for_kind(&node.kind), is_root);
    read_base_attributes(&mut node.base, &mut reader, level, version);
    node.kind.read_attributes(&mut reader);

    let refined = node.kind.unknown_attribute_code();
    let mut findings = reader.into_log();
    if let Some(code) = refined {
        findings.retag_diagnostic(
            DiagnosticCode::UnknownCoreAttribute,
            code,
            RetagContext {
                level,
                version,
                line: element.line,
                column: element.column,
                message: None,
            },
        );
    }
    doc.diagnostics_mut().extend(findings);
}

fn check_namespaces(doc: &mut Document, id: NodeId, element: &XmlToken, is_root: bool) {
    if is_root {
        let valid = root_prefix_is_valid(doc.namespaces().namespaces(), &element.prefix);
        let explained = ROOT_FINDINGS.iter().any(|c| doc.diagnostics().contains(*c));
        if !valid && !explained {
            let message = if element.prefix.is_empty() {
                "The <sedML> element does not declare a SED-ML namespace.".to_string()
            } else {
                format!(
                    "The prefix '{}' of the <sedML> element is not bound to a SED-ML namespace.",
                    element.prefix
                )
            };
            doc.log_for(id, DiagnosticCode::InvalidNamespaceOnSed, message);
        }
        return;
    }

    let Some(node) = doc.node(id) else {
        return;
    };
    let name = node.kind.element_name();
    let element_namespace = node.base.element_namespace.clone();

    let mut findings = Vec::new();
    findings.extend(check_default_namespace(
        doc.namespaces().namespaces(),
        name,
        "",
        &element_namespace,
    ));
    if !element.prefix.is_empty() {
        let mut declared = XmlNamespaces::new();
        declared.add(element.uri.clone(), element.prefix.clone());
        findings.extend(check_default_namespace(
            &declared,
            name,
            &element.prefix,
            &element_namespace,
        ));
    }
    for message in findings {
        doc.log_for(id, DiagnosticCode::NotSchemaConformant, message);
    }
}

/// Create the child that `token` starts, if the kind of `parent` owns one
fn create_object(doc: &mut Document, parent: NodeId, token: &XmlToken) -> Option<NodeId> {
    let kind = doc.kind(parent)?.clone();
    match kind {
        ElementKind::ListOf(list) => {
            let item = list.create_item(&token.name)?;
            Some(doc.create_element(item))
        }
        ElementKind::Document(_) | ElementKind::DataGenerator(_) => {
            let list = ListKind::from_element_name(&token.name)
                .filter(|l| kind.child_lists().contains(l))?;
            if let Some(existing) = doc.list_of(parent, list) {
                let code = match kind {
                    ElementKind::Document(_) => DiagnosticCode::DocumentAllowedElements,
                    _ => DiagnosticCode::NotSchemaConformant,
                };
                let message = format!(
                    "A <{}> element may contain only one <{}>.",
                    kind.element_name(),
                    list.element_name()
                );
                log_at(doc, token, code, message);
                return Some(existing);
            }
            Some(doc.create_element(ElementKind::ListOf(list)))
        }
        _ => None,
    }
}

fn check_empty_list(doc: &mut Document, id: NodeId) {
    let Some(ElementKind::ListOf(list)) = doc.kind(id).cloned() else {
        return;
    };
    if doc.num_children(id) == 0 {
        let message = format!("The <{}> element must not be empty.", list.element_name());
        doc.log_for(id, DiagnosticCode::EmptyListElement, message);
    }
}

/// Read `<math>` into a data generator
fn read_other_xml(
    doc: &mut Document,
    id: NodeId,
    token: &XmlToken,
    stream: &mut XmlInputStream,
) -> bool {
    if token.name != "math" || !matches!(doc.kind(id), Some(ElementKind::DataGenerator(_))) {
        return false;
    }
    if let Err(message) = check_mathml_namespace(token, doc.namespaces().namespaces()) {
        log_at(doc, token, DiagnosticCode::InvalidMathElement, message);
    }
    let Some(math) = XmlNode::read_from(stream) else {
        return false;
    };
    if let Some(ElementKind::DataGenerator(data)) = doc.kind_mut(id) {
        data.store_math(math);
    }
    true
}

fn read_annotation(
    doc: &mut Document,
    id: NodeId,
    token: &XmlToken,
    stream: &mut XmlInputStream,
) -> bool {
    if token.name != "annotation" {
        return false;
    }
    let Some(node) = doc.node(id) else {
        return false;
    };
    let name = node.kind.element_name();
    let element_namespace = node.base.element_namespace.clone();
    let repeated = node.base.annotation.is_some();

    if repeated {
        let message = format!(
            "A <{}> element may contain only one <annotation>.",
            name
        );
        log_at(doc, token, DiagnosticCode::MultipleAnnotations, message);
    }
    let Some(XmlNode::Element(annotation)) = XmlNode::read_from(stream) else {
        return true;
    };

    let mut findings = Vec::new();
    if let Some(message) =
        check_default_namespace(&annotation.namespaces, "annotation", "", &element_namespace)
    {
        findings.push((DiagnosticCode::NotSchemaConformant, message));
    }
    findings.extend(check_annotation(&annotation, doc.namespaces().namespaces(), name));
    for (code, message) in findings {
        log_at(doc, token, code, message);
    }

    if let Some(node) = doc.node_mut(id) {
        node.base.annotation = Some(annotation);
    }
    true
}

fn read_notes(
    doc: &mut Document,
    id: NodeId,
    token: &XmlToken,
    stream: &mut XmlInputStream,
) -> bool {
    if token.name != "notes" {
        return false;
    }
    let Some(node) = doc.node(id) else {
        return false;
    };
    let name = node.kind.element_name();
    let element_namespace = node.base.element_namespace.clone();
    let repeated = node.base.notes.is_some();

    if repeated {
        let message = format!("A <{}> element may contain only one <notes>.", name);
        log_at(doc, token, DiagnosticCode::OnlyOneNotesElementAllowed, message);
    }
    let Some(XmlNode::Element(notes)) = XmlNode::read_from(stream) else {
        return true;
    };

    let mut findings = Vec::new();
    if let Some(message) =
        check_default_namespace(&notes.namespaces, "notes", "", &element_namespace)
    {
        findings.push((DiagnosticCode::NotSchemaConformant, message));
    }
    findings.extend(check_xhtml(&notes, Some(doc.namespaces().namespaces())));
    for (code, message) in findings {
        log_at(doc, token, code, message);
    }

    if let Some(node) = doc.node_mut(id) {
        node.base.notes = Some(notes);
    }
    true
}

fn log_unknown_element(doc: &mut Document, id: NodeId, token: &XmlToken) {
    let Some(code) = doc.kind(id).map(ElementKind::unknown_element_code) else {
        return;
    };
    let message = format!(
        "Element '{}' is not part of the definition of SED-ML Level {} Version {}.",
        token.name,
        doc.level(),
        doc.version()
    );
    log_at(doc, token, code, message);
}

/// Record a finding at the position of `token`
fn log_at(doc: &mut Document, token: &XmlToken, code: DiagnosticCode, message: String) {
    let (level, version) = (doc.level(), doc.version());
    doc.diagnostics_mut()
        .log(code, level, version, message, token.line, token.column);
}

/// Write element `id` and its subtree to `out`
pub(crate) fn write_element(doc: &Document, id: NodeId, out: &mut XmlOutputStream) -> Result<()> {
    let Some(element) = doc.element(id) else {
        return Ok(());
    };
    let name = element.element_name();
    let prefix = element.prefix();
    out.start_element(name, prefix)?;

    if id == doc.root() {
        let mut declared = doc.namespaces().namespaces().clone();
        let uri = doc.namespaces().uri();
        if !declared.contains_uri(uri) {
            declared.add(uri, "");
        }
        out.write_namespaces(&declared)?;
    } else if let Some(own) = doc.node(id).and_then(|n| n.base.own_namespaces.as_ref()) {
        out.write_namespaces(own)?;
    }

    let attribute_prefix = element.sedml_prefix();
    let base = [
        ("id", element.id()),
        ("name", element.name()),
        ("metaid", element.meta_id()),
    ];
    for (attribute, value) in base {
        if let Some(value) = value {
            out.write_attribute(attribute, attribute_prefix, value)?;
        }
    }
    for (attribute, value) in element.kind().written_attributes() {
        out.write_attribute(attribute, attribute_prefix, &value)?;
    }

    if let Some(notes) = element.notes() {
        out.write_element(notes)?;
    }
    if let Some(annotation) = element.annotation() {
        out.write_element(annotation)?;
    }
    if let ElementKind::DataGenerator(data) = element.kind() {
        if let Some(math) = data.math() {
            out.write_node(math)?;
        }
    }

    let lists = element.kind().child_lists();
    if lists.is_empty() {
        for child in element.children() {
            write_element(doc, *child, out)?;
        }
    } else {
        for list in lists {
            if let Some(child) = doc.list_of(id, *list) {
                if doc.num_children(child) > 0 {
                    write_element(doc, child, out)?;
                }
            }
        }
    }

    out.end_element(name, prefix)
}

/// Compact XML of element `id`, without a declaration
///
/// Returns an empty string if writing fails.
pub(crate) fn element_to_string(doc: &Document, id: NodeId) -> String {
    let settings = WriterSettings::new()
        .with_indent(0)
        .with_xml_declaration(false);
    let mut out = XmlOutputStream::new(&settings);
    match write_element(doc, id, &mut out).and_then(|_| out.into_string()) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(node = %id, error = %e, "element could not be written");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::kinds::KindCode;
    use crate::namespaces::SEDML_XMLNS_L1V4;

    fn read(text: &str) -> Document {
        let mut doc = Document::new(1, 4).unwrap();
        let mut stream = XmlInputStream::new(text).unwrap();
        let root = doc.root();
        read_element(&mut doc, root, &mut stream);
        doc
    }

    fn codes(doc: &Document) -> Vec<DiagnosticCode> {
        doc.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_read_models() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfModels>\
             <model id=\"m1\" language=\"urn:sedml:language:sbml\" source=\"a.xml\"/>\
             <model id=\"m2\" source=\"b.xml\"/>\
             </listOfModels>\
             </sedML>",
        );
        assert!(codes(&doc).is_empty(), "{}", doc.diagnostics());
        let list = doc.list_of(doc.root(), ListKind::Models).unwrap();
        assert_eq!(doc.num_children(list), 2);
        let m1 = doc.element(doc.child(list, 0).unwrap()).unwrap();
        assert_eq!(m1.id(), Some("m1"));
        assert_eq!(m1.kind_code(), KindCode::Model);
        assert_eq!(m1.line(), 1);
    }

    #[test]
    fn test_unknown_element_is_skipped() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <bogus><listOfModels/></bogus>\
             </sedML>",
        );
        assert_eq!(codes(&doc), vec![DiagnosticCode::DocumentAllowedElements]);
        assert!(doc.list_of(doc.root(), ListKind::Models).is_none());
    }

    #[test]
    fn test_duplicate_list_is_reused() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfModels><model id=\"a\" source=\"a\"/></listOfModels>\
             <listOfModels><model id=\"b\" source=\"b\"/></listOfModels>\
             </sedML>",
        );
        assert_eq!(codes(&doc), vec![DiagnosticCode::DocumentAllowedElements]);
        let list = doc.list_of(doc.root(), ListKind::Models).unwrap();
        assert_eq!(doc.num_children(list), 2);
    }

    #[test]
    fn test_empty_list_logged() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfModels/>\
             </sedML>",
        );
        assert_eq!(codes(&doc), vec![DiagnosticCode::EmptyListElement]);
    }

    #[test]
    fn test_unknown_model_attribute_is_refined() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfModels><model id=\"m\" source=\"a\" colour=\"red\"/></listOfModels>\
             </sedML>",
        );
        assert_eq!(codes(&doc), vec![DiagnosticCode::ModelAllowedAttributes]);
    }

    #[test]
    fn test_root_without_namespace() {
        let doc = read("<sedML level=\"1\" version=\"4\"/>");
        assert_eq!(codes(&doc), vec![DiagnosticCode::InvalidNamespaceOnSed]);
    }

    #[test]
    fn test_notes_and_annotation() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <notes><p xmlns=\"http://www.w3.org/1999/xhtml\">hi</p></notes>\
             <notes><p xmlns=\"http://www.w3.org/1999/xhtml\">again</p></notes>\
             <annotation><x:a xmlns:x=\"urn:x\"/></annotation>\
             </sedML>",
        );
        assert_eq!(codes(&doc), vec![DiagnosticCode::OnlyOneNotesElementAllowed]);
        let root = doc.element(doc.root()).unwrap();
        assert!(root.notes_string().unwrap().contains("again"));
        assert!(root.is_set_annotation());
    }

    #[test]
    fn test_math_without_namespace() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfDataGenerators>\
             <dataGenerator id=\"dg\"><math><ci>x</ci></math></dataGenerator>\
             </listOfDataGenerators>\
             </sedML>",
        );
        assert_eq!(codes(&doc), vec![DiagnosticCode::InvalidMathElement]);
        let list = doc.list_of(doc.root(), ListKind::DataGenerators).unwrap();
        let dg = doc.child(list, 0).unwrap();
        match doc.kind(dg) {
            Some(ElementKind::DataGenerator(data)) => assert!(data.is_set_math()),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_write_order() {
        let doc = read(
            "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfOutputs><plot2D id=\"p\"/></listOfOutputs>\
             <listOfModels><model id=\"m\" source=\"a.xml\"/></listOfModels>\
             </sedML>",
        );
        let text = element_to_string(&doc, doc.root());
        assert!(text.starts_with(&format!("<sedML xmlns=\"{}\"", SEDML_XMLNS_L1V4)));
        let models = text.find("<listOfModels>").unwrap();
        let outputs = text.find("<listOfOutputs>").unwrap();
        assert!(models < outputs);
        assert!(text.contains("<model id=\"m\" source=\"a.xml\"/>"));
    }

    #[test]
    fn test_empty_list_not_written() {
        let mut doc = Document::new(1, 4).unwrap();
        let root = doc.root();
        doc.ensure_list(root, ListKind::Models).unwrap();
        let text = element_to_string(&doc, root);
        assert!(!text.contains("listOfModels"));
    }
}
