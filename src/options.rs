//! Compiler options and the JSON config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::error::{Result, SpriteError};

/// Options for one sprite build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// A directory of icons (subdirectories included), or a file that
    /// already is a sprite.
    pub source: PathBuf,
    /// Prefix of every symbol id: `{symbol_prefix}--{symbol_id}`.
    pub symbol_prefix: String,
    /// Prefix of the namespace applied to ids inside each icon.
    pub style_prefix: String,
    pub optimizer: OptimizerConfig,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src/lib/sprite"),
            symbol_prefix: "svg".to_string(),
            style_prefix: "svg-style".to_string(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Contents of a sprite config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpriteConfig {
    #[serde(flatten)]
    pub compile: CompileOptions,
    /// Where to write the sprite; stdout when absent.
    pub output: Option<PathBuf>,
}

/// Load a JSON sprite config file.
pub fn load_config(path: &Path) -> Result<SpriteConfig> {
    let content = fs::read_to_string(path).map_err(|source| SpriteError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SpriteError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
