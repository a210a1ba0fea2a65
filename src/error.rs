use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the optimization engine while handling one document.
#[derive(Debug, Error)]
pub enum SvgError {
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("Invalid SVG: {0}")]
    InvalidSvg(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Invalid params for plugin {plugin}: {reason}")]
    InvalidParams { plugin: String, reason: String },
}

/// Diagnostic reported by an optimizer instead of optimized markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeFailure {
    /// The file the optimizer was working on, if it was told.
    pub path: Option<PathBuf>,
    pub reason: String,
}

impl fmt::Display for OptimizeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

impl std::error::Error for OptimizeFailure {}

/// Errors that abort a sprite build.
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("Sprite source not found or unreadable: {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Optimization failed for {path}")]
    Optimization {
        path: PathBuf,
        #[source]
        failure: OptimizeFailure,
    },

    #[error("Failed to read config: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpriteError>;
