//! Writing SED-ML documents

use crate::document::Document;
use crate::error::Result;
use crate::traversal::write_element;
use crate::xml::output::{WriterSettings, XmlOutputStream};
use std::fs;
use std::path::Path;

/// Serialize `doc` to a string
pub fn write_sedml_to_string(doc: &Document, settings: &WriterSettings) -> Result<String> {
    tracing::debug!(document = %doc.id(), nodes = doc.num_nodes(), "writing SED-ML document");
    let mut out = XmlOutputStream::new(settings);
    if settings.xml_declaration {
        out.write_xml_decl()?;
    }
    if let Some(comment) = settings.header_comment() {
        out.write_comment(&comment)?;
    }
    write_element(doc, doc.root(), &mut out)?;

    let mut text = out.into_string()?;
    text.push('\n');
    tracing::debug!(bytes = text.len(), "finished writing SED-ML document");
    Ok(text)
}

/// Serialize `doc` into the file at `path`
pub fn write_sedml_to_file(
    doc: &Document,
    path: impl AsRef<Path>,
    settings: &WriterSettings,
) -> Result<()> {
    let text = write_sedml_to_string(doc, settings)?;
    fs::write(path.as_ref(), text)?;
    Ok(())
}
