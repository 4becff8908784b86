//! Error types for sedml-rs
//!
//! Two kinds of failure are modelled here. [`Error`] covers hard failures
//! (I/O, unreadable XML, construction without a usable namespace context).
//! [`OperationError`] is the status returned by mutating element operations
//! such as `set_id` or `append_notes`; those never touch the diagnostic log.
//!
//! Problems found while *reading* a document are neither: they are recorded
//! in the document's [`DiagnosticLog`](crate::diagnostics::DiagnosticLog).

use thiserror::Error;

/// Result type alias using the sedml [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a mutating element operation; `Ok` is the success status
pub type OperationResult<T = ()> = std::result::Result<T, OperationError>;

/// Main error type for sedml operations
#[derive(Error, Debug)]
pub enum Error {
    /// An object could not be constructed in a valid state
    #[error("construction error: {0}")]
    Construction(String),

    /// XML tokenizer error
    #[error("XML error: {0}")]
    Xml(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

/// Status of a rejected element operation
///
/// Every variant maps onto one of the integer return codes used by
/// libSEDML (`code()`), so reflection-style callers can forward them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationError {
    /// Index out of range for a list operation
    #[error("index exceeds size")]
    IndexOutOfRange,

    /// The attribute is legal but not allowed at this level/version
    #[error("attribute not allowed at this level and version")]
    UnexpectedAttribute,

    /// Generic failure
    #[error("operation failed")]
    Failed,

    /// The value does not satisfy the attribute's syntax
    #[error("invalid attribute value")]
    InvalidAttributeValue,

    /// Content failed shape or syntax validation
    #[error("invalid object")]
    InvalidObject,

    /// An object with the same id already exists in the target list
    #[error("duplicate object id")]
    DuplicateObjectId,

    /// The objects belong to different SED-ML levels
    #[error("level mismatch")]
    LevelMismatch,

    /// The objects belong to different SED-ML versions
    #[error("version mismatch")]
    VersionMismatch,

    /// The operation is not valid on this XML content
    #[error("invalid XML operation")]
    InvalidXmlOperation,

    /// The objects do not share the SED-ML core namespace
    #[error("namespaces mismatch")]
    NamespaceMismatch,

    /// One or more appended annotation children collided with existing ones
    #[error("duplicate annotation namespace")]
    DuplicateAnnotationNamespace,

    /// No top-level annotation element has the requested name
    #[error("annotation element name not found")]
    AnnotationNameNotFound,

    /// The top-level annotation element does not declare the requested URI
    #[error("annotation element namespace not found")]
    AnnotationNamespaceNotFound,

    /// The element kind does not expose an attribute with this name
    #[error("attribute not recognized")]
    AttributeNotRecognized,
}

impl OperationError {
    /// Integer status code as used by libSEDML (success is 0)
    pub fn code(&self) -> i32 {
        match self {
            OperationError::IndexOutOfRange => -1,
            OperationError::UnexpectedAttribute => -2,
            OperationError::Failed => -3,
            OperationError::InvalidAttributeValue => -4,
            OperationError::InvalidObject => -5,
            OperationError::DuplicateObjectId => -6,
            OperationError::LevelMismatch => -7,
            OperationError::VersionMismatch => -8,
            OperationError::InvalidXmlOperation => -9,
            OperationError::NamespaceMismatch => -10,
            OperationError::DuplicateAnnotationNamespace => -11,
            OperationError::AnnotationNameNotFound => -12,
            OperationError::AnnotationNamespaceNotFound => -13,
            // reflection misses are reported as a plain failure
            OperationError::AttributeNotRecognized => -3,
        }
    }
}

/// Collapse an operation result into the integer status code
pub fn status_code(result: &OperationResult) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Construction("SedNamespaces is null".to_string());
        assert_eq!(format!("{}", err), "construction error: SedNamespaces is null");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_operation_codes() {
        assert_eq!(status_code(&Ok(())), 0);
        assert_eq!(status_code(&Err(OperationError::InvalidObject)), -5);
        assert_eq!(OperationError::AnnotationNamespaceNotFound.code(), -13);
        assert_eq!(OperationError::AttributeNotRecognized.code(), -3);
    }
}
