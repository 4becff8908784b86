//! Reading SED-ML documents
//!
//! Reading never fails on document content: XML syntax problems and SED-ML
//! rule violations alike end up in the returned document's diagnostic log.
//! Only resource limits and I/O produce an [`Error`](crate::Error).

use crate::diagnostics::DiagnosticCode;
use crate::document::Document;
use crate::error::Result;
use crate::limits::Limits;
use crate::loaders::{Loader, Location};
use crate::namespaces::{is_sedml_namespace, SedNamespaces, DEFAULT_LEVEL, DEFAULT_VERSION};
use crate::traversal::read_element;
use crate::xml::stream::{XmlInputStream, XmlToken};
use std::path::Path;

/// Options for reading documents
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Limits applied to the input
    pub limits: Limits,
}

impl ReaderOptions {
    /// Create options with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Read a document from a string
pub fn read_sedml_from_string(text: &str) -> Result<Document> {
    read_with_options(text, &ReaderOptions::default())
}

/// Read a document from a file
pub fn read_sedml_from_file(path: impl AsRef<Path>) -> Result<Document> {
    read_file_with_options(path, &ReaderOptions::default())
}

/// Read a document from a file with explicit options
pub fn read_file_with_options(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Document> {
    let location = Location::Path(path.as_ref().to_path_buf());
    tracing::debug!(location = %location.as_str(), "loading SED-ML file");
    let text = Loader::new()
        .with_limits(options.limits.clone())
        .load(&location)?;
    read_with_options(&text, options)
}

/// Read a document from a string with explicit options
pub fn read_with_options(text: &str, options: &ReaderOptions) -> Result<Document> {
    tracing::debug!(bytes = text.len(), "reading SED-ML document");
    let mut stream = XmlInputStream::with_limits(text, &options.limits)?;

    let root = stream.peek().filter(|t| t.is_start()).cloned();
    let mut doc = Document::from_namespaces(namespaces_for(root.as_ref()));

    if let Some(token) = root.as_ref().filter(|t| t.name != "sedML") {
        let message = format!(
            "The root element is <{}> rather than <sedML>.",
            token.qualified_name()
        );
        log(&mut doc, DiagnosticCode::NotSchemaConformant, message, token.line, token.column);
        return Ok(doc);
    }

    let root_id = doc.root();
    read_element(&mut doc, root_id, &mut stream);

    if let Some(error) = stream.error().cloned() {
        log(
            &mut doc,
            DiagnosticCode::XmlSyntaxError,
            error.message,
            error.line,
            error.column,
        );
        doc.diagnostics_mut().retain_critical();
    } else {
        check_declaration(&mut doc, &stream);
    }

    tracing::debug!(
        document = %doc.id(),
        diagnostics = doc.diagnostics().len(),
        errors = doc.diagnostics().error_count(),
        "finished reading SED-ML document"
    );
    Ok(doc)
}

/// Level/version from the root start tag, else the defaults
fn namespaces_for(root: Option<&XmlToken>) -> SedNamespaces {
    let number = |name: &str, default: u32| {
        root.and_then(|t| {
            t.attributes
                .iter()
                .find(|a| a.name == name && (a.prefix.is_empty() || is_sedml_namespace(&a.uri)))
        })
        .and_then(|a| a.value.trim().parse::<u32>().ok())
        .unwrap_or(default)
    };
    let (level, version) = (number("level", DEFAULT_LEVEL), number("version", DEFAULT_VERSION));
    SedNamespaces::new(level, version).unwrap_or_else(|_| {
        tracing::warn!(level, version, "unsupported SED-ML version, reading with defaults");
        SedNamespaces::default()
    })
}

fn check_declaration(doc: &mut Document, stream: &XmlInputStream) {
    match stream.encoding() {
        None => log(
            doc,
            DiagnosticCode::MissingXmlEncoding,
            "The XML declaration does not name an encoding.".to_string(),
            1,
            1,
        ),
        Some(encoding) if !encoding.eq_ignore_ascii_case("UTF-8") => log(
            doc,
            DiagnosticCode::NotUtf8,
            format!("The document is encoded as '{}' rather than UTF-8.", encoding),
            1,
            1,
        ),
        Some(_) => {}
    }

    match stream.xml_version() {
        Some(version) if version.eq_ignore_ascii_case("1.0") => {}
        Some(version) => log(
            doc,
            DiagnosticCode::BadXmlDecl,
            format!("The XML declaration names version '{}' rather than 1.0.", version),
            1,
            1,
        ),
        None => log(
            doc,
            DiagnosticCode::BadXmlDecl,
            "The document has no XML declaration.".to_string(),
            1,
            1,
        ),
    }
}

fn log(doc: &mut Document, code: DiagnosticCode, message: String, line: u32, column: u32) {
    let (level, version) = (doc.level(), doc.version());
    doc.diagnostics_mut()
        .log(code, level, version, message, line, column);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::kinds::ListKind;

    const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

    fn codes(doc: &Document) -> Vec<DiagnosticCode> {
        doc.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_read_minimal() {
        let text = format!(
            "{}<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version3\" level=\"1\" version=\"3\"/>",
            DECL
        );
        let doc = read_sedml_from_string(&text).unwrap();
        assert!(codes(&doc).is_empty(), "{}", doc.diagnostics());
        assert_eq!((doc.level(), doc.version()), (1, 3));
        assert_eq!(doc.element(doc.root()).unwrap().line(), 2);
    }

    #[test]
    fn test_wrong_root() {
        let text = format!("{}<model/>", DECL);
        let doc = read_sedml_from_string(&text).unwrap();
        assert_eq!(codes(&doc), vec![DiagnosticCode::NotSchemaConformant]);
        assert!(doc.list_of(doc.root(), ListKind::Models).is_none());
    }

    #[test]
    fn test_syntax_error_keeps_only_critical() {
        let text = format!(
            "{}<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\">\
             <listOfModels/><unclosed>",
            DECL
        );
        let doc = read_sedml_from_string(&text).unwrap();
        assert_eq!(codes(&doc), vec![DiagnosticCode::XmlSyntaxError]);
    }

    #[test]
    fn test_declaration_checks() {
        let body = "<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\"/>";
        let doc = read_sedml_from_string(body).unwrap();
        assert_eq!(
            codes(&doc),
            vec![DiagnosticCode::MissingXmlEncoding, DiagnosticCode::BadXmlDecl]
        );

        let latin = format!("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>{}", body);
        let doc = read_sedml_from_string(&latin).unwrap();
        assert_eq!(codes(&doc), vec![DiagnosticCode::NotUtf8]);

        let lower = format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>{}", body);
        assert!(read_sedml_from_string(&lower).unwrap().diagnostics().is_empty());
    }

    #[test]
    fn test_unsupported_version_uses_defaults() {
        let text = format!(
            "{}<sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"7\" version=\"4\"/>",
            DECL
        );
        let doc = read_sedml_from_string(&text).unwrap();
        assert_eq!((doc.level(), doc.version()), (DEFAULT_LEVEL, DEFAULT_VERSION));
    }

    #[test]
    fn test_size_limit_is_an_error() {
        let options = ReaderOptions::new().with_limits(Limits {
            max_document_size: 10,
            ..Limits::default()
        });
        assert!(read_with_options(&format!("{}<sedML/>", DECL), &options).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_sedml_from_file("/nonexistent/dir/doc.sedml").is_err());
    }
}
