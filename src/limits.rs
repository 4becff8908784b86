//! Limits applied while reading SED-ML documents
//!
//! The reader refuses inputs that exceed these bounds instead of building
//! an arbitrarily deep or wide element tree. Exceeding one is a hard
//! [`Error::LimitExceeded`], never a diagnostic.

use crate::error::{Error, Result};
use std::fmt;

/// What a limit bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Bytes of SED-ML text
    DocumentSize,
    /// Open elements, the root counting as one
    Depth,
    /// Attributes on one start tag
    Attributes,
    /// `xmlns` declarations on one start tag
    NamespaceDeclarations,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Bound::DocumentSize => "document size in bytes",
            Bound::Depth => "element nesting depth",
            Bound::Attributes => "attributes per element",
            Bound::NamespaceDeclarations => "namespace declarations per element",
        };
        f.write_str(text)
    }
}

/// Reader limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted document, in bytes
    pub max_document_size: usize,

    /// Deepest accepted element nesting
    pub max_depth: usize,

    /// Most attributes accepted on a single element
    pub max_attributes: usize,

    /// Most namespace declarations accepted on a single element
    pub max_namespace_declarations: usize,
}

impl Default for Limits {
    /// Bounds for ordinary SED-ML files
    fn default() -> Self {
        Self {
            max_document_size: 64 * 1024 * 1024,
            max_depth: 256,
            max_attributes: 256,
            max_namespace_declarations: 64,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight bounds for untrusted input
    pub fn strict() -> Self {
        Self {
            max_document_size: 4 * 1024 * 1024,
            max_depth: 32,
            max_attributes: 32,
            max_namespace_declarations: 16,
        }
    }

    /// Bounds for generated documents with deep annotations
    pub fn permissive() -> Self {
        Self {
            max_document_size: 1024 * 1024 * 1024,
            max_depth: 4096,
            max_attributes: 4096,
            max_namespace_declarations: 1024,
        }
    }

    /// Configured maximum for `bound`
    pub fn max(&self, bound: Bound) -> usize {
        match bound {
            Bound::DocumentSize => self.max_document_size,
            Bound::Depth => self.max_depth,
            Bound::Attributes => self.max_attributes,
            Bound::NamespaceDeclarations => self.max_namespace_declarations,
        }
    }

    /// Fail with `LimitExceeded` when `value` is above the maximum for `bound`
    pub fn check(&self, bound: Bound, value: usize) -> Result<()> {
        let max = self.max(bound);
        if value > max {
            return Err(Error::LimitExceeded(format!(
                "{} is {}, the maximum is {}",
                bound, value, max
            )));
        }
        Ok(())
    }

    /// Check the size of a whole document
    pub fn check_document_size(&self, size: usize) -> Result<()> {
        self.check(Bound::DocumentSize, size)
    }

    /// Check the nesting depth reached by a start tag
    pub fn check_depth(&self, depth: usize) -> Result<()> {
        self.check(Bound::Depth, depth)
    }

    /// Check the attribute and namespace counts of one start tag
    pub fn check_start_tag(&self, attributes: usize, namespaces: usize) -> Result<()> {
        self.check(Bound::Attributes, attributes)?;
        self.check(Bound::NamespaceDeclarations, namespaces)
    }
}
