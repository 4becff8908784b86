//! Reading documents from files and strings

use pretty_assertions::assert_eq;
use sedml::element::AttributeValue;
use sedml::{
    read_sedml_from_file, read_sedml_from_string, DiagnosticCode, Document, ElementKind, KindCode,
    ListKind, Severity,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn codes(doc: &Document) -> Vec<DiagnosticCode> {
    doc.diagnostics().iter().map(|d| d.code).collect()
}

fn item(doc: &Document, list: ListKind, index: usize) -> sedml::NodeId {
    let list = doc.list_of(doc.root(), list).expect("list present");
    doc.child(list, index).expect("item present")
}

#[test]
fn test_read_simple_fixture() {
    let doc = read_sedml_from_file(fixture("simple.sedml")).unwrap();
    assert!(codes(&doc).is_empty(), "{}", doc.diagnostics());
    assert_eq!((doc.level(), doc.version()), (1, 4));

    let model = doc.element(item(&doc, ListKind::Models, 0)).unwrap();
    assert_eq!(model.kind_code(), KindCode::Model);
    assert_eq!(model.id(), Some("model1"));
    assert_eq!(model.name(), Some("Oscillator"));
    assert_eq!(
        model.get_attribute_as::<String>("source"),
        Ok("oscillator.xml".to_string())
    );
    assert_eq!(model.line(), 10);

    let sim = doc.element(item(&doc, ListKind::Simulations, 0)).unwrap();
    assert_eq!(sim.get_attribute("outputEndTime"), Ok(AttributeValue::Double(100.0)));
    assert_eq!(sim.get_attribute("numberOfSteps"), Ok(AttributeValue::Int(1000)));

    let plot = doc.element(item(&doc, ListKind::Outputs, 0)).unwrap();
    assert_eq!(plot.get_attribute("legend"), Ok(AttributeValue::Bool(true)));
    assert_eq!(plot.get_attribute_as::<f64>("width"), Ok(400.0));
}

#[test]
fn test_read_data_generator() {
    let doc = read_sedml_from_file(fixture("simple.sedml")).unwrap();
    let dg = item(&doc, ListKind::DataGenerators, 0);

    let Some(ElementKind::DataGenerator(data)) = doc.kind(dg) else {
        panic!("expected a data generator");
    };
    let math = data.math().unwrap();
    assert_eq!(math.name(), "math");
    assert!(math.to_xml_string().contains("<math:ci>scale</math:ci>"));

    let params = doc.list_of(dg, ListKind::Parameters).unwrap();
    let scale = doc.element(doc.child(params, 0).unwrap()).unwrap();
    assert_eq!(scale.id(), Some("scale"));
    assert_eq!(scale.get_attribute_as::<f64>("value"), Ok(2.5));
    assert_eq!(scale.ancestor_of_kind(KindCode::DataGenerator), Some(dg));
}

#[test]
fn test_read_notes_and_annotation() {
    let doc = read_sedml_from_file(fixture("simple.sedml")).unwrap();
    let root = doc.element(doc.root()).unwrap();
    assert!(root
        .notes_string()
        .unwrap()
        .contains("Oscillator time course."));
    let annotation = root.annotation().unwrap();
    assert_eq!(annotation.num_children(), 1);
    assert_eq!(
        annotation.child(0).unwrap().as_element().unwrap().uri,
        "urn:example:provenance"
    );
}

#[test]
fn test_read_invalid_fixture() {
    let doc = read_sedml_from_file(fixture("invalid.sedml")).unwrap();
    assert_eq!(
        codes(&doc),
        vec![
            DiagnosticCode::DocumentAllowedAttributes,
            DiagnosticCode::IdSyntaxRule,
            DiagnosticCode::ModelAllowedAttributes,
            DiagnosticCode::InvalidMetaIdSyntax,
            DiagnosticCode::EmptyListElement,
            DiagnosticCode::DocumentAllowedElements,
        ]
    );

    // the model with the bad id is still read
    let first = doc.element(item(&doc, ListKind::Models, 0)).unwrap();
    assert_eq!(first.id(), None);
    assert!(first.is_set_attribute("source"));

    let refined = doc.diagnostics().get(2).unwrap();
    assert_eq!(refined.line, 4);
    assert!(refined.message.contains("flavour"));
    assert_eq!(doc.diagnostics().count_with_severity(Severity::Error), 5);
    assert_eq!(doc.diagnostics().count_with_severity(Severity::Warning), 1);
}

#[test]
fn test_read_prefixed_document() {
    let text = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <sed:sedML xmlns:sed=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
        <sed:listOfModels><sed:model id=\"m\" source=\"m.xml\"/></sed:listOfModels>\
        </sed:sedML>";
    let doc = read_sedml_from_string(text).unwrap();
    assert!(codes(&doc).is_empty(), "{}", doc.diagnostics());
    let model = doc.element(item(&doc, ListKind::Models, 0)).unwrap();
    assert_eq!(model.prefix(), "sed");
    assert_eq!(model.sedml_prefix(), "sed");
}

#[test]
fn test_read_level_version_mismatch() {
    let text = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"3\">\
        <listOfModels><model id=\"m\" source=\"m.xml\"/></listOfModels>\
        </sedML>";
    let doc = read_sedml_from_string(text).unwrap();
    assert_eq!(doc.version(), 3);
    assert!(doc
        .diagnostics()
        .iter()
        .any(|d| d.code == DiagnosticCode::NotSchemaConformant && d.message.contains("<listOfModels>")));
}

#[test]
fn test_read_bad_root_attributes() {
    let text = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"one\"/>";
    let doc = read_sedml_from_string(text).unwrap();
    assert_eq!(
        codes(&doc),
        vec![
            DiagnosticCode::DocumentLevelMustBeNonNegativeInteger,
            DiagnosticCode::DocumentAllowedAttributes,
        ]
    );
}

#[test]
fn test_find_by_id_after_read() {
    let doc = read_sedml_from_file(fixture("simple.sedml")).unwrap();
    let plot = doc.element_by_id("plot1").unwrap();
    assert_eq!(doc.kind(plot).map(ElementKind::code), Some(KindCode::Plot2D));
    assert_eq!(doc.element_by_id("nothing"), None);

    let with_ids = doc.all_elements(|e| e.is_set_id());
    assert_eq!(with_ids.len(), 5);
}

#[test]
fn test_read_empty_id_keeps_name() {
    let text = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
        <listOfModels><model id=\"\" name=\"x\" source=\"a\"/></listOfModels>\
        </sedML>";
    let doc = read_sedml_from_string(text).unwrap();
    assert_eq!(doc.diagnostics().len(), 1, "{}", doc.diagnostics());
    let diagnostic = doc.diagnostics().get(0).unwrap();
    assert_eq!(diagnostic.code, DiagnosticCode::NotSchemaConformant);
    assert!(diagnostic.message.contains("'id'"));
    assert!(diagnostic.message.contains("empty string"));

    let model = doc.element(item(&doc, ListKind::Models, 0)).unwrap();
    assert!(!model.is_set_id());
    assert_eq!(model.name(), Some("x"));
}
