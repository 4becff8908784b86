//! # sedml-rs
//!
//! Reading, checking and writing SED-ML (Simulation Experiment Description
//! Markup Language) documents.
//!
//! A [`Document`] owns an arena of elements addressed by [`NodeId`].
//! Every element carries the common SED-ML core: `id`, `name`, `metaid`,
//! XHTML notes, a free-form annotation, and level/version/namespace
//! context. Problems found while reading are collected in the document's
//! [`DiagnosticLog`] rather than aborting the read.
//!
//! ## Features
//!
//! - SED-ML Level 1 Versions 1 to 5
//! - Notes and annotation editing with XHTML and namespace checks
//! - Diagnostics with codes, severities and source positions
//! - Round-trip writing with a stable attribute and child order
//!
//! ## Example
//!
//! ```rust,ignore
//! use sedml::{read_sedml_from_file, write_sedml_to_string, WriterSettings};
//!
//! let doc = read_sedml_from_file("experiment.sedml")?;
//! for diagnostic in doc.diagnostics().iter() {
//!     println!("{}", diagnostic);
//! }
//! let text = write_sedml_to_string(&doc, &WriterSettings::new())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod names;
pub mod namespaces;

// XML layer
pub mod loaders;
pub mod xml;

// Object model
pub mod arena;
pub mod diagnostics;
pub mod document;
pub mod element;

// Reading and writing
pub mod reader;
mod traversal;
pub mod writer;

// Re-exports for convenience
pub use arena::NodeId;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLog, Severity};
pub use document::{Document, DocumentId};
pub use element::{ElementKind, ElementMut, ElementRef, KindCode, ListKind};
pub use error::{Error, OperationError, OperationResult, Result};
pub use namespaces::{SedNamespaces, XmlNamespaces};
pub use reader::{read_sedml_from_file, read_sedml_from_string, ReaderOptions};
pub use writer::{write_sedml_to_file, write_sedml_to_string};
pub use xml::node::{XmlElement, XmlNode};
pub use xml::output::WriterSettings;

/// Version of the sedml-rs library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
