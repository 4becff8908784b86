//! XML layer: token stream, output sink and generic fragments

pub mod node;
pub mod output;
pub mod stream;
pub mod xhtml;

pub use node::{XmlAttribute, XmlElement, XmlNode};
pub use output::{WriterSettings, XmlOutputStream};
pub use stream::{StreamError, TokenKind, XmlInputStream, XmlToken};
