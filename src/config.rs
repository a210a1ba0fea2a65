//! Optimizer configuration model.
//!
//! Plugin declarations follow the svgo shape: either a bare plugin name or a
//! `{ "name": ..., "params": ... }` object. Params stay as JSON until the
//! engine deserializes them into the typed params of the plugin.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the default preset plugin.
pub const PRESET_DEFAULT: &str = "preset-default";
/// Name of the id/class namespacing plugin.
pub const PREFIX_IDS: &str = "prefixIds";

/// Raw, user-supplied optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerConfig {
    /// Run `preset-default` even when `plugins` does not declare it.
    pub preset_default: bool,
    /// Repeat the plugin pipeline until the output stops changing.
    pub multipass: bool,
    pub plugins: Vec<PluginEntry>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            preset_default: true,
            multipass: false,
            plugins: Vec::new(),
        }
    }
}

/// One plugin declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginEntry {
    Named(String),
    NamedWithParams {
        name: String,
        #[serde(default)]
        params: Value,
    },
}

impl PluginEntry {
    pub fn with_params(name: impl Into<String>, params: Value) -> Self {
        Self::NamedWithParams {
            name: name.into(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) | Self::NamedWithParams { name, .. } => name,
        }
    }

    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Named(_) => None,
            Self::NamedWithParams { params, .. } => Some(params),
        }
    }

    /// Deep-merge `overlay` into this entry's params. Overlay values win.
    ///
    /// A bare name is promoted to the params form.
    pub fn merge_params(&mut self, overlay: Value) {
        match self {
            Self::Named(name) => {
                *self = Self::with_params(std::mem::take(name), overlay);
            }
            Self::NamedWithParams { params, .. } => {
                let base = std::mem::take(params);
                *params = merge_json_values(base, overlay);
            }
        }
    }
}

/// The configuration handed to the optimizer for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptimizerConfig {
    /// File being optimized.
    pub path: Option<PathBuf>,
    pub multipass: bool,
    pub plugins: Vec<PluginEntry>,
}

impl ResolvedOptimizerConfig {
    pub fn plugin(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.name() == name)
    }
}

/// Merge two JSON values. Overlay values take precedence.
/// Objects are merged recursively; anything else is replaced by the overlay.
pub fn merge_json_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_json_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}
