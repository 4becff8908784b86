//! Diagnostic log
//!
//! Problems found while reading a document are recorded here instead of
//! aborting the read. The log is ordered and append-only; the one way to
//! change an entry after the fact is [`DiagnosticLog::retag_diagnostic`],
//! which replaces a generic finding with a more specific one once the
//! caller knows more about where it occurred.

use serde::Serialize;
use std::fmt;

/// Stable diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// Unclassified internal problem
    Unknown,
    /// The XML declaration has no encoding
    MissingXmlEncoding,
    /// The XML declaration is missing its version or is not 1.0
    BadXmlDecl,
    /// The input is not well-formed XML
    XmlSyntaxError,
    /// The document encoding is not UTF-8
    NotUtf8,
    /// An element is not allowed at this position
    UnrecognizedElement,
    /// The document does not conform to the SED-ML schema
    NotSchemaConformant,
    /// A prefix is used without a namespace declaration
    NamespaceUndeclared,
    /// An element is not in the expected namespace
    ElementNotInNamespace,
    /// A math element is not in the MathML namespace
    InvalidMathElement,
    /// Two objects share an id
    DuplicateComponentId,
    /// An `id` does not conform to the SId syntax
    IdSyntaxRule,
    /// A `metaid` does not conform to the XML ID syntax
    InvalidMetaIdSyntax,
    /// An annotation child declares no namespace
    MissingAnnotationNamespace,
    /// Two annotation children use the same namespace
    DuplicateAnnotationNamespaces,
    /// An annotation child uses a SED-ML namespace
    NamespaceInAnnotation,
    /// More than one annotation element on an object
    MultipleAnnotations,
    /// Annotation content is not an element
    AnnotationNotElement,
    /// Notes content is not in the XHTML namespace
    NotesNotInXhtmlNamespace,
    /// Notes contain an XML declaration
    NotesContainsXmlDecl,
    /// Notes contain a DOCTYPE declaration
    NotesContainsDoctype,
    /// Notes content is not valid XHTML
    InvalidNotesContent,
    /// More than one notes element on an object
    OnlyOneNotesElementAllowed,
    /// The `sedML` element is not in the SED-ML namespace
    InvalidNamespaceOnSed,
    /// An attribute is not allowed on this object
    AllowedAttributes,
    /// A list element has no children
    EmptyListElement,
    /// An attribute value has the wrong data type
    AttributeTypeMismatch,
    /// The `sedML` element has a disallowed core attribute
    DocumentAllowedCoreAttributes,
    /// The `sedML` element has a disallowed attribute
    DocumentAllowedAttributes,
    /// The `sedML` element has a disallowed child element
    DocumentAllowedElements,
    /// The `level` attribute is not a non-negative integer
    DocumentLevelMustBeNonNegativeInteger,
    /// The `version` attribute is not a non-negative integer
    DocumentVersionMustBeNonNegativeInteger,
    /// A `model` element has a disallowed attribute
    ModelAllowedAttributes,
    /// An attribute is not known to the SED-ML core
    UnknownCoreAttribute,
}

const ALL_CODES: &[DiagnosticCode] = &[
    DiagnosticCode::Unknown,
    DiagnosticCode::MissingXmlEncoding,
    DiagnosticCode::BadXmlDecl,
    DiagnosticCode::XmlSyntaxError,
    DiagnosticCode::NotUtf8,
    DiagnosticCode::UnrecognizedElement,
    DiagnosticCode::NotSchemaConformant,
    DiagnosticCode::NamespaceUndeclared,
    DiagnosticCode::ElementNotInNamespace,
    DiagnosticCode::InvalidMathElement,
    DiagnosticCode::DuplicateComponentId,
    DiagnosticCode::IdSyntaxRule,
    DiagnosticCode::InvalidMetaIdSyntax,
    DiagnosticCode::MissingAnnotationNamespace,
    DiagnosticCode::DuplicateAnnotationNamespaces,
    DiagnosticCode::NamespaceInAnnotation,
    DiagnosticCode::MultipleAnnotations,
    DiagnosticCode::AnnotationNotElement,
    DiagnosticCode::NotesNotInXhtmlNamespace,
    DiagnosticCode::NotesContainsXmlDecl,
    DiagnosticCode::NotesContainsDoctype,
    DiagnosticCode::InvalidNotesContent,
    DiagnosticCode::OnlyOneNotesElementAllowed,
    DiagnosticCode::InvalidNamespaceOnSed,
    DiagnosticCode::AllowedAttributes,
    DiagnosticCode::EmptyListElement,
    DiagnosticCode::AttributeTypeMismatch,
    DiagnosticCode::DocumentAllowedCoreAttributes,
    DiagnosticCode::DocumentAllowedAttributes,
    DiagnosticCode::DocumentAllowedElements,
    DiagnosticCode::DocumentLevelMustBeNonNegativeInteger,
    DiagnosticCode::DocumentVersionMustBeNonNegativeInteger,
    DiagnosticCode::ModelAllowedAttributes,
    DiagnosticCode::UnknownCoreAttribute,
];

impl DiagnosticCode {
    /// Numeric value of the code
    pub fn as_u32(self) -> u32 {
        match self {
            DiagnosticCode::Unknown => 10000,
            DiagnosticCode::MissingXmlEncoding => 1003,
            DiagnosticCode::BadXmlDecl => 1004,
            DiagnosticCode::XmlSyntaxError => 1005,
            DiagnosticCode::NotUtf8 => 10001,
            DiagnosticCode::UnrecognizedElement => 10002,
            DiagnosticCode::NotSchemaConformant => 10003,
            DiagnosticCode::NamespaceUndeclared => 10101,
            DiagnosticCode::ElementNotInNamespace => 10102,
            DiagnosticCode::InvalidMathElement => 10201,
            DiagnosticCode::DuplicateComponentId => 10301,
            DiagnosticCode::IdSyntaxRule => 10302,
            DiagnosticCode::InvalidMetaIdSyntax => 10303,
            DiagnosticCode::MissingAnnotationNamespace => 10401,
            DiagnosticCode::DuplicateAnnotationNamespaces => 10402,
            DiagnosticCode::NamespaceInAnnotation => 10403,
            DiagnosticCode::MultipleAnnotations => 10404,
            DiagnosticCode::AnnotationNotElement => 10405,
            DiagnosticCode::NotesNotInXhtmlNamespace => 10801,
            DiagnosticCode::NotesContainsXmlDecl => 10802,
            DiagnosticCode::NotesContainsDoctype => 10803,
            DiagnosticCode::InvalidNotesContent => 10804,
            DiagnosticCode::OnlyOneNotesElementAllowed => 10805,
            DiagnosticCode::InvalidNamespaceOnSed => 20101,
            DiagnosticCode::AllowedAttributes => 20102,
            DiagnosticCode::EmptyListElement => 20103,
            DiagnosticCode::AttributeTypeMismatch => 20104,
            DiagnosticCode::DocumentAllowedCoreAttributes => 20201,
            DiagnosticCode::DocumentAllowedAttributes => 20203,
            DiagnosticCode::DocumentAllowedElements => 20204,
            DiagnosticCode::DocumentLevelMustBeNonNegativeInteger => 20205,
            DiagnosticCode::DocumentVersionMustBeNonNegativeInteger => 20206,
            DiagnosticCode::ModelAllowedAttributes => 20303,
            DiagnosticCode::UnknownCoreAttribute => 99994,
        }
    }

    /// Look up a code by its numeric value
    pub fn from_u32(value: u32) -> Option<Self> {
        ALL_CODES.iter().copied().find(|c| c.as_u32() == value)
    }

    /// Severity implied by the code
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::Unknown | DiagnosticCode::XmlSyntaxError => Severity::Fatal,
            DiagnosticCode::MissingAnnotationNamespace | DiagnosticCode::EmptyListElement => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Category implied by the code
    pub fn category(self) -> Category {
        use DiagnosticCode::*;
        match self {
            Unknown => Category::Internal,
            MissingXmlEncoding | BadXmlDecl | XmlSyntaxError | NotUtf8 => Category::Xml,
            IdSyntaxRule | InvalidMetaIdSyntax | DuplicateComponentId => Category::Identifier,
            InvalidMathElement => Category::Math,
            MissingAnnotationNamespace
            | DuplicateAnnotationNamespaces
            | NamespaceInAnnotation
            | MultipleAnnotations
            | AnnotationNotElement => Category::Annotation,
            NotesNotInXhtmlNamespace
            | NotesContainsXmlDecl
            | NotesContainsDoctype
            | InvalidNotesContent
            | OnlyOneNotesElementAllowed => Category::Notes,
            _ => Category::General,
        }
    }

    /// Whether the code comes from the XML layer rather than SED-ML rules
    ///
    /// Once one of these is logged, findings from the SED-ML layer are
    /// unreliable.
    pub fn is_critical(self) -> bool {
        self.category() == Category::Xml && self != DiagnosticCode::NotUtf8
    }

    /// One-line description of the code
    pub fn short_message(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            Unknown => "Encountered unknown internal error",
            MissingXmlEncoding => "Missing XML encoding attribute",
            BadXmlDecl => "Invalid or missing XML declaration",
            XmlSyntaxError => "Badly formed XML",
            NotUtf8 => "File does not use UTF-8 encoding",
            UnrecognizedElement => "Encountered unrecognized element",
            NotSchemaConformant => "Document does not conform to the SED-ML XML schema",
            NamespaceUndeclared => "Namespace prefix is not declared",
            ElementNotInNamespace => "Element is not in the expected namespace",
            InvalidMathElement => "Invalid MathML",
            DuplicateComponentId => "Duplicate 'id' attribute value",
            IdSyntaxRule => "Invalid syntax for an 'id' attribute value",
            InvalidMetaIdSyntax => "Invalid syntax for a 'metaid' attribute value",
            MissingAnnotationNamespace => "Missing declaration of the XML namespace for the annotation",
            DuplicateAnnotationNamespaces => "Multiple annotations using the same XML namespace",
            NamespaceInAnnotation => "The SED-ML XML namespace cannot be used in an Annotation object",
            MultipleAnnotations => "Only one Annotation object is permitted under a given SED-ML object",
            AnnotationNotElement => "Annotation content must be XML elements",
            NotesNotInXhtmlNamespace => "Notes must be placed in the XHTML XML namespace",
            NotesContainsXmlDecl => "XML declarations are not permitted in Notes objects",
            NotesContainsDoctype => "XML DOCTYPE elements are not permitted in Notes objects",
            InvalidNotesContent => "Invalid notes content",
            OnlyOneNotesElementAllowed => "Only one Notes subobject is permitted on a given SED-ML object",
            InvalidNamespaceOnSed => "Invalid namespace on the SED-ML element",
            AllowedAttributes => "Attribute not allowed on this object",
            EmptyListElement => "No empty lists",
            AttributeTypeMismatch => "Attribute value has the wrong type",
            DocumentAllowedCoreAttributes => "Core attributes allowed on <sedML>",
            DocumentAllowedAttributes => "Attributes allowed on <sedML>",
            DocumentAllowedElements => "Elements allowed on <sedML>",
            DocumentLevelMustBeNonNegativeInteger => "The 'level' attribute must be a non-negative integer",
            DocumentVersionMustBeNonNegativeInteger => "The 'version' attribute must be a non-negative integer",
            ModelAllowedAttributes => "Attributes allowed on <model>",
            UnknownCoreAttribute => "Unknown attribute",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Suspicious but legal
    Warning,
    /// Violates a SED-ML rule
    Error,
    /// The document could not be interpreted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        };
        write!(f, "{}", s)
    }
}

/// Broad area a diagnostic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Library internals
    Internal,
    /// XML well-formedness and declaration
    Xml,
    /// General SED-ML consistency
    General,
    /// Identifier syntax and uniqueness
    Identifier,
    /// MathML content
    Math,
    /// Annotation content
    Annotation,
    /// Notes content
    Notes,
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// The code
    pub code: DiagnosticCode,
    /// Severity, derived from the code
    pub severity: Severity,
    /// Category, derived from the code
    pub category: Category,
    /// SED-ML level in effect when logged
    pub level: u32,
    /// SED-ML version in effect when logged
    pub version: u32,
    /// Detail message
    pub message: String,
    /// Source line (0 if unknown)
    pub line: u32,
    /// Source column (0 if unknown)
    pub column: u32,
}

impl Diagnostic {
    /// Create a diagnostic; severity and category follow from the code
    pub fn new(
        code: DiagnosticCode,
        level: u32,
        version: u32,
        message: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            code,
            severity: code.severity(),
            category: code.category(),
            level,
            version,
            message: message.into(),
            line,
            column,
        }
    }

    /// Numeric code value
    pub fn code_value(&self) -> u32 {
        self.code.as_u32()
    }

    /// Check if this is an error or worse
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: [{}] ({}) {}",
            self.line,
            self.column,
            self.severity,
            self.code,
            self.code.short_message()
        )?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Position and replacement text used when retagging a diagnostic
#[derive(Debug, Clone, Default)]
pub struct RetagContext {
    /// Level to record
    pub level: u32,
    /// Version to record
    pub version: u32,
    /// Line to record
    pub line: u32,
    /// Column to record
    pub column: u32,
    /// New message; the old message is kept when `None`
    pub message: Option<String>,
}

/// Ordered, append-only collection of diagnostics
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding
    pub fn log(
        &mut self,
        code: DiagnosticCode,
        level: u32,
        version: u32,
        message: impl Into<String>,
        line: u32,
        column: u32,
    ) {
        self.add(Diagnostic::new(code, level, version, message, line, column));
    }

    /// Record a prepared diagnostic
    pub fn add(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(code = diagnostic.code.as_u32(), "diagnostic logged");
        self.entries.push(diagnostic);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at position `n`
    pub fn get(&self, n: usize) -> Option<&Diagnostic> {
        self.entries.get(n)
    }

    /// Iterate over entries in the order they were logged
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Check if any entry has `code`
    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    /// Number of entries with exactly `severity`
    pub fn count_with_severity(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// The `n`th entry with exactly `severity`
    pub fn get_with_severity(&self, n: usize, severity: Severity) -> Option<&Diagnostic> {
        self.entries.iter().filter(|d| d.severity == severity).nth(n)
    }

    /// All entries with `code`
    pub fn errors_with_code(&self, code: DiagnosticCode) -> Vec<&Diagnostic> {
        self.entries.iter().filter(|d| d.code == code).collect()
    }

    /// Number of entries at error severity or above
    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    /// Replace every `old` entry with a `new` one
    ///
    /// The replacements are appended at the end of the log with the
    /// position and level/version from `context`. Returns how many entries
    /// were retagged.
    pub fn retag_diagnostic(
        &mut self,
        old: DiagnosticCode,
        new: DiagnosticCode,
        context: RetagContext,
    ) -> usize {
        let removed = self.remove_all(old);
        let count = removed.len();
        for d in removed {
            let message = context.message.clone().unwrap_or(d.message);
            self.log(
                new,
                context.level,
                context.version,
                message,
                context.line,
                context.column,
            );
        }
        count
    }

    /// Move every entry of `other` to the end of this log
    pub fn extend(&mut self, other: DiagnosticLog) {
        for d in other.entries {
            self.add(d);
        }
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry that is not critical
    pub(crate) fn retain_critical(&mut self) {
        self.entries.retain(|d| d.code.is_critical());
    }

    fn remove_all(&mut self, code: DiagnosticCode) -> Vec<Diagnostic> {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|d| d.code == code);
        self.entries = kept;
        removed
    }
}

impl fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.entries {
            writeln!(f, "{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_code() {
        assert_eq!(DiagnosticCode::XmlSyntaxError.severity(), Severity::Fatal);
        assert_eq!(
            DiagnosticCode::MissingAnnotationNamespace.severity(),
            Severity::Warning
        );
        assert_eq!(DiagnosticCode::IdSyntaxRule.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::IdSyntaxRule.category(), Category::Identifier);
    }

    #[test]
    fn test_code_numbers_round_trip() {
        for code in ALL_CODES {
            assert_eq!(DiagnosticCode::from_u32(code.as_u32()), Some(*code));
        }
        assert_eq!(DiagnosticCode::from_u32(1), None);
    }

    #[test]
    fn test_log_and_query() {
        let mut log = DiagnosticLog::new();
        log.log(DiagnosticCode::IdSyntaxRule, 1, 4, "bad id", 3, 5);
        log.log(DiagnosticCode::EmptyListElement, 1, 4, "", 4, 1);

        assert_eq!(log.len(), 2);
        assert!(log.contains(DiagnosticCode::IdSyntaxRule));
        assert_eq!(log.count_with_severity(Severity::Warning), 1);
        assert_eq!(log.error_count(), 1);
        assert_eq!(
            log.get_with_severity(0, Severity::Error).map(|d| d.line),
            Some(3)
        );
        assert_eq!(
            log.get(0).map(|d| d.to_string()),
            Some("3:5: [Error] (10302) Invalid syntax for an 'id' attribute value: bad id".to_string())
        );
    }

    #[test]
    fn test_retag_diagnostic() {
        let mut log = DiagnosticLog::new();
        log.log(DiagnosticCode::UnknownCoreAttribute, 1, 4, "attr 'foo'", 1, 1);
        log.log(DiagnosticCode::IdSyntaxRule, 1, 4, "", 2, 1);
        log.log(DiagnosticCode::UnknownCoreAttribute, 1, 4, "attr 'bar'", 1, 1);

        let context = RetagContext {
            level: 1,
            version: 4,
            line: 1,
            column: 1,
            message: None,
        };
        let n = log.retag_diagnostic(
            DiagnosticCode::UnknownCoreAttribute,
            DiagnosticCode::DocumentAllowedAttributes,
            context,
        );

        assert_eq!(n, 2);
        assert_eq!(log.len(), 3);
        assert!(!log.contains(DiagnosticCode::UnknownCoreAttribute));
        let retagged = log.errors_with_code(DiagnosticCode::DocumentAllowedAttributes);
        assert_eq!(retagged[0].message, "attr 'foo'");
        assert_eq!(retagged[1].message, "attr 'bar'");
    }

    #[test]
    fn test_retag_nothing() {
        let mut log = DiagnosticLog::new();
        log.log(DiagnosticCode::IdSyntaxRule, 1, 4, "", 0, 0);
        let n = log.retag_diagnostic(
            DiagnosticCode::UnknownCoreAttribute,
            DiagnosticCode::ModelAllowedAttributes,
            RetagContext::default(),
        );
        assert_eq!(n, 0);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut log = DiagnosticLog::new();
        log.log(DiagnosticCode::IdSyntaxRule, 1, 4, "first", 1, 1);
        let mut scratch = DiagnosticLog::new();
        scratch.log(DiagnosticCode::EmptyListElement, 1, 4, "second", 2, 1);
        log.extend(scratch);
        let messages: Vec<&str> = log.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_retain_critical() {
        let mut log = DiagnosticLog::new();
        log.log(DiagnosticCode::IdSyntaxRule, 1, 4, "", 0, 0);
        log.log(DiagnosticCode::XmlSyntaxError, 1, 4, "", 9, 2);
        log.retain_critical();
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(0).map(|d| d.code), Some(DiagnosticCode::XmlSyntaxError));
    }
}
