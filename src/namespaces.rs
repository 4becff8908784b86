//! XML namespace handling
//!
//! SED-ML binds one namespace URI to each (level, version) pair. This module
//! holds those URIs, an ordered prefix table used for namespace declarations
//! on elements, and [`SedNamespaces`], the (level, version, declarations)
//! triple every element is constructed against.

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// SED-ML Level 1 Version 1 namespace
pub const SEDML_XMLNS_L1V1: &str = "http://sed-ml.org/";

/// SED-ML Level 1 Version 2 namespace
pub const SEDML_XMLNS_L1V2: &str = "http://sed-ml.org/sed-ml/level1/version2";

/// SED-ML Level 1 Version 3 namespace
pub const SEDML_XMLNS_L1V3: &str = "http://sed-ml.org/sed-ml/level1/version3";

/// SED-ML Level 1 Version 4 namespace
pub const SEDML_XMLNS_L1V4: &str = "http://sed-ml.org/sed-ml/level1/version4";

/// SED-ML Level 1 Version 5 namespace
pub const SEDML_XMLNS_L1V5: &str = "http://sed-ml.org/sed-ml/level1/version5";

/// XHTML namespace, required for notes content
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// MathML namespace, required for math content
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace (bound to the reserved `xml` prefix)
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Level used when none is given
pub const DEFAULT_LEVEL: u32 = 1;

/// Version used when none is given
pub const DEFAULT_VERSION: u32 = 4;

const SUPPORTED: &[(u32, u32)] = &[(1, 1), (1, 2), (1, 3), (1, 4), (1, 5)];

const ALL_SEDML_URIS: &[&str] = &[
    SEDML_XMLNS_L1V1,
    SEDML_XMLNS_L1V2,
    SEDML_XMLNS_L1V3,
    SEDML_XMLNS_L1V4,
    SEDML_XMLNS_L1V5,
];

/// The SED-ML namespace URI for a level/version pair, if supported
pub fn sedml_namespace_uri(level: u32, version: u32) -> Option<&'static str> {
    match (level, version) {
        (1, 1) => Some(SEDML_XMLNS_L1V1),
        (1, 2) => Some(SEDML_XMLNS_L1V2),
        (1, 3) => Some(SEDML_XMLNS_L1V3),
        (1, 4) => Some(SEDML_XMLNS_L1V4),
        (1, 5) => Some(SEDML_XMLNS_L1V5),
        _ => None,
    }
}

/// Check whether a URI is any of the SED-ML namespaces
pub fn is_sedml_namespace(uri: &str) -> bool {
    ALL_SEDML_URIS.contains(&uri)
}

/// The level/version pair a SED-ML namespace URI belongs to
pub fn level_version_for_uri(uri: &str) -> Option<(u32, u32)> {
    SUPPORTED
        .iter()
        .copied()
        .find(|(l, v)| sedml_namespace_uri(*l, *v) == Some(uri))
}

/// Ordered set of namespace declarations (prefix to URI)
///
/// The empty prefix stands for the default namespace (`xmlns="..."`).
/// Declaration order is preserved so documents write back the way they
/// were read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNamespaces {
    decls: IndexMap<String, String>,
}

impl XmlNamespaces {
    /// Create an empty declaration set
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `uri` under `prefix`, replacing any URI bound to that prefix
    pub fn add(&mut self, uri: impl Into<String>, prefix: impl Into<String>) {
        self.decls.insert(prefix.into(), uri.into());
    }

    /// Remove the declaration for `prefix`; returns whether one existed
    pub fn remove_by_prefix(&mut self, prefix: &str) -> bool {
        self.decls.shift_remove(prefix).is_some()
    }

    /// Remove every declaration of `uri`; returns whether one existed
    pub fn remove_uri(&mut self, uri: &str) -> bool {
        let before = self.decls.len();
        self.decls.retain(|_, u| u != uri);
        before != self.decls.len()
    }

    /// Check if `uri` is declared under any prefix
    pub fn contains_uri(&self, uri: &str) -> bool {
        self.decls.values().any(|u| u == uri)
    }

    /// Check if `prefix` is declared
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.decls.contains_key(prefix)
    }

    /// First prefix bound to `uri`
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.decls
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    /// URI bound to `prefix`
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.decls.get(prefix).map(|s| s.as_str())
    }

    /// Position of the declaration for `prefix`
    pub fn index_of_prefix(&self, prefix: &str) -> Option<usize> {
        self.decls.get_index_of(prefix)
    }

    /// Prefix and URI of the declaration at `index`
    pub fn get(&self, index: usize) -> Option<(&str, &str)> {
        self.decls
            .get_index(index)
            .map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of declarations
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Check if there are no declarations
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Iterate over `(prefix, uri)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.decls.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Remove all declarations
    pub fn clear(&mut self) {
        self.decls.clear();
    }
}

/// Level, version and namespace declarations an element is built against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SedNamespaces {
    level: u32,
    version: u32,
    namespaces: XmlNamespaces,
}

impl Default for SedNamespaces {
    /// Level 1 Version 4 with the SED-ML namespace as default
    fn default() -> Self {
        let mut namespaces = XmlNamespaces::new();
        namespaces.add(SEDML_XMLNS_L1V4, "");
        Self {
            level: DEFAULT_LEVEL,
            version: DEFAULT_VERSION,
            namespaces,
        }
    }
}

impl SedNamespaces {
    /// Create the namespace context for a level/version pair
    ///
    /// Fails with [`Error::Construction`] when the pair is not a supported
    /// SED-ML version, since no element can be valid without it.
    pub fn new(level: u32, version: u32) -> Result<Self> {
        let uri = sedml_namespace_uri(level, version).ok_or_else(|| {
            Error::Construction(format!(
                "SED-ML Level {} Version {} is not supported",
                level, version
            ))
        })?;
        let mut namespaces = XmlNamespaces::new();
        namespaces.add(uri, "");
        Ok(Self {
            level,
            version,
            namespaces,
        })
    }

    /// Supported level/version pairs
    pub fn supported() -> &'static [(u32, u32)] {
        SUPPORTED
    }

    /// SED-ML level
    pub fn level(&self) -> u32 {
        self.level
    }

    /// SED-ML version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The SED-ML URI for this level/version
    pub fn uri(&self) -> &'static str {
        sedml_namespace_uri(self.level, self.version).unwrap_or(SEDML_XMLNS_L1V4)
    }

    /// The namespace declarations
    pub fn namespaces(&self) -> &XmlNamespaces {
        &self.namespaces
    }

    /// Mutable access to the namespace declarations
    pub fn namespaces_mut(&mut self) -> &mut XmlNamespaces {
        &mut self.namespaces
    }

    /// Add every declaration of `other`
    pub fn add_namespaces(&mut self, other: &XmlNamespaces) {
        for (prefix, uri) in other.iter() {
            self.namespaces.add(uri, prefix);
        }
    }

    /// Add a single declaration
    pub fn add_namespace(&mut self, uri: impl Into<String>, prefix: impl Into<String>) {
        self.namespaces.add(uri, prefix);
    }

    /// Remove every declaration of `uri`
    pub fn remove_namespace(&mut self, uri: &str) -> bool {
        self.namespaces.remove_uri(uri)
    }

    /// Check that the declared SED-ML namespace agrees with level/version
    ///
    /// A set declaring no SED-ML namespace at all is accepted; declaring
    /// more than one, or the URI of another version, is not.
    pub fn is_valid_combination(&self) -> bool {
        let Some(expected) = sedml_namespace_uri(self.level, self.version) else {
            return false;
        };
        let declared: Vec<&str> = self
            .namespaces
            .iter()
            .map(|(_, uri)| uri)
            .filter(|uri| is_sedml_namespace(uri))
            .collect();
        match declared.as_slice() {
            [] => true,
            [uri] => *uri == expected,
            _ => false,
        }
    }
}
