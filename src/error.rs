//! All error types for the locsynth crate.
//!
//! Every failure is fatal for the platform it occurs on: errors bubble up
//! through the per-platform join point and fail the whole hook invocation.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Translation sources could not be enumerated or loaded.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A pre-existing native resource file could not be parsed.
    #[error("malformed resource `{}`: {message}", path.display())]
    MalformedResource { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error at `{}`: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The Xcode project manifest could not be parsed or lacks required objects.
    #[error("project manifest error: {0}")]
    ManifestParse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("task failed: {0}")]
    Task(String),
}

impl Error {
    /// Creates a new discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Error::Discovery(message.into())
    }

    /// Creates a new project manifest error.
    pub fn manifest_parse(message: impl Into<String>) -> Self {
        Error::ManifestParse(message.into())
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io_at(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Marks an existing resource file as unparsable.
    pub fn malformed(path: impl AsRef<Path>, cause: impl std::fmt::Display) -> Self {
        Error::MalformedResource {
            path: path.as_ref().to_path_buf(),
            message: cause.to_string(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlParse(quick_xml::Error::from(value))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Error::Task(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_discovery_error() {
        let error = Error::discovery("no such pattern");
        assert_eq!(error.to_string(), "discovery error: no such pattern");
    }

    #[test]
    fn test_parse_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::Parse(json_error);
        assert!(error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_io_error_with_path() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let error = Error::io_at("res/values/strings.xml", io_error);
        let display = error.to_string();
        assert!(display.contains("res/values/strings.xml"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_malformed_resource_error() {
        let error = Error::malformed("values/strings.xml", "unexpected EOF");
        assert_eq!(
            error.to_string(),
            "malformed resource `values/strings.xml`: unexpected EOF"
        );
    }

    #[test]
    fn test_manifest_error() {
        let error = Error::manifest_parse("missing objects");
        assert_eq!(error.to_string(), "project manifest error: missing objects");
    }

    #[test]
    fn test_error_debug() {
        let error = Error::Config("no <name>".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("Config"));
        assert!(debug.contains("no <name>"));
    }
}
