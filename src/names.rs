//! Identifier grammars
//!
//! SED-ML uses two identifier syntaxes: the `id` attribute follows the SBML
//! `SId` grammar, while `metaid` is an XML `ID` (an NCName).

use once_cell::sync::Lazy;
use regex::Regex;

static SID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("SId pattern is valid")
});

// NameStartChar minus ':' and NameChar, per XML 1.0 fifth edition
static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}\-\.0-9\u{B7}\u{300}-\u{36F}\u{203F}-\u{2040}]*$",
    )
    .expect("NCName pattern is valid")
});

/// Check if a string conforms to the `SId` grammar used by `id`
pub fn is_valid_sid(id: &str) -> bool {
    SID.is_match(id)
}

/// Check if a string is a valid XML `ID` (used by `metaid`)
pub fn is_valid_xml_id(id: &str) -> bool {
    is_valid_ncname(id)
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Split a qualified name into prefix and local part
///
/// An unprefixed name yields an empty prefix.
pub fn split_qname(qname: &str) -> (&str, &str) {
    qname.split_once(':').unwrap_or(("", qname))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_sid() {
        assert!(is_valid_sid("model1"));
        assert!(is_valid_sid("_task"));
        assert!(is_valid_sid("A"));

        assert!(!is_valid_sid(""));
        assert!(!is_valid_sid("1model"));
        assert!(!is_valid_sid("my-model"));
        assert!(!is_valid_sid("my.model"));
        assert!(!is_valid_sid("m\u{e9}"));
    }

    #[test]
    fn test_is_valid_xml_id() {
        assert!(is_valid_xml_id("meta_1"));
        assert!(is_valid_xml_id("a-b.c"));
        assert!(is_valid_xml_id("\u{e9}t\u{e9}"));

        assert!(!is_valid_xml_id(""));
        assert!(!is_valid_xml_id("1abc"));
        assert!(!is_valid_xml_id("-abc"));
        assert!(!is_valid_xml_id("pre:fix"));
        assert!(!is_valid_xml_id("has space"));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("math:ci"), ("math", "ci"));
        assert_eq!(split_qname("model"), ("", "model"));
        assert_eq!(split_qname("a:b:c"), ("a", "b:c"));
    }
}
