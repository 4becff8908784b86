//! Namespace and version consistency checks

use crate::error::{OperationError, OperationResult};
use crate::namespaces::{is_sedml_namespace, XmlNamespaces, MATHML_NAMESPACE, XSI_NAMESPACE};
use crate::xml::stream::XmlToken;

/// Check that `xmlns` binds `prefix` to the element's own namespace
///
/// Returns the finding message when it does not. Nothing is reported when
/// the prefix is unbound, or for `notes`/`annotation` whose namespace may
/// legitimately differ from a SED-ML default.
pub fn check_default_namespace(
    xmlns: &XmlNamespaces,
    element_name: &str,
    prefix: &str,
    element_namespace: &str,
) -> Option<String> {
    if xmlns.is_empty() {
        return None;
    }
    let default_uri = xmlns.uri_for(prefix).unwrap_or("");
    if default_uri.is_empty() || default_uri == element_namespace {
        return None;
    }
    if is_sedml_namespace(default_uri)
        && !is_sedml_namespace(element_namespace)
        && (element_name == "notes" || element_name == "annotation")
    {
        return None;
    }
    Some(format!(
        "xmlns=\"{}\" in <{}> element is an invalid namespace.",
        default_uri, element_name
    ))
}

/// Locate the MathML binding for a `math` start tag
///
/// The tag's own declarations win; otherwise the document's are searched.
/// Returns the prefix in use, or the finding message when MathML is not
/// declared anywhere.
pub fn check_mathml_namespace(
    token: &XmlToken,
    toplevel: &XmlNamespaces,
) -> Result<String, String> {
    if let Some(prefix) = token.namespaces.prefix_for(MATHML_NAMESPACE) {
        return Ok(prefix.to_string());
    }
    if let Some(prefix) = toplevel.prefix_for(MATHML_NAMESPACE) {
        return Ok(prefix.to_string());
    }
    Err(format!(
        "The MathML namespace '{}' was not found.",
        MATHML_NAMESPACE
    ))
}

/// Check that the prefix of the root tag is bound to SED-ML or XSI
pub fn root_prefix_is_valid(toplevel: &XmlNamespaces, prefix: &str) -> bool {
    toplevel
        .uri_for(prefix)
        .map_or(false, |uri| is_sedml_namespace(uri) || uri == XSI_NAMESPACE)
}

/// The parts of an element that decide compatibility
#[derive(Debug, Clone, Copy)]
pub struct Compatibility<'a> {
    /// Effective level
    pub level: u32,
    /// Effective version
    pub version: u32,
    /// Namespace of the element
    pub element_namespace: &'a str,
    /// Whether required attributes and elements are present
    pub complete: bool,
}

/// Check that `other` can be combined with `this`
pub fn check_compatibility(
    this: &Compatibility<'_>,
    other: Option<&Compatibility<'_>>,
) -> OperationResult {
    let other = other.ok_or(OperationError::Failed)?;
    if !other.complete {
        return Err(OperationError::InvalidObject);
    }
    if this.level != other.level {
        return Err(OperationError::LevelMismatch);
    }
    if this.version != other.version {
        return Err(OperationError::VersionMismatch);
    }
    if this.element_namespace != other.element_namespace {
        return Err(OperationError::NamespaceMismatch);
    }
    Ok(())
}
