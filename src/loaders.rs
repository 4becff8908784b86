//! Loading SED-ML text from files or memory

use crate::error::{Error, Result};
use crate::limits::Limits;
use std::fs;
use std::path::PathBuf;

/// Where document text comes from
#[derive(Debug, Clone)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// In-memory document text
    String(String),
}

impl Location {
    /// Get the location as a display string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::String(_) => "<string>".to_string(),
        }
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

/// Resource loader applying [`Limits`] to what it reads
#[derive(Debug, Default)]
pub struct Loader {
    limits: Limits,
}

impl Loader {
    /// Create a new loader with default limits
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The limits in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        let content = match location {
            Location::Path(path) => fs::read_to_string(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Resource(format!("File '{}' does not exist", path.display()))
                } else {
                    Error::Io(e)
                }
            })?,
            Location::String(s) => s.clone(),
        };

        self.limits.check_document_size(content.len())?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<sedML level=\"1\" version=\"4\"/>").unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let content = Loader::new().load(&location).unwrap();

        assert!(content.contains("<sedML"));
        assert!(location.is_file());
    }

    #[test]
    fn test_load_from_string() {
        let location = Location::String("<sedML/>".to_string());
        let content = Loader::new().load(&location).unwrap();
        assert_eq!(content, "<sedML/>");
        assert_eq!(location.as_str(), "<string>");
    }

    #[test]
    fn test_missing_file() {
        let location = Location::Path(PathBuf::from("/definitely/not/here.sedml"));
        let result = Loader::new().load(&location);
        assert!(matches!(result, Err(Error::Resource(_))));
    }

    #[test]
    fn test_size_limit() {
        let mut limits = Limits::strict();
        limits.max_document_size = 8;
        let location = Location::String("<sedML level=\"1\"/>".to_string());
        let result = Loader::new().with_limits(limits).load(&location);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }
}
