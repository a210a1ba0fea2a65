//! Per-file optimizer configuration.
//!
//! The merged plugin list only depends on the user config and the sprite
//! mode, so it is built once per process into an immutable [`BaseConfig`].
//! Each file then gets a clone with its own path and `prefixIds` namespace.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use serde_json::{Value, json};

use crate::config::{OptimizerConfig, PREFIX_IDS, PRESET_DEFAULT, PluginEntry, ResolvedOptimizerConfig};

/// Separator between the style prefix and the symbol id in a namespace.
pub const NAMESPACE_SEPARATOR: &str = "--";

/// How the source is turned into a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteMode {
    /// A directory of icons, each becoming a namespaced `<symbol>`.
    MultiFile,
    /// A file that already is a sprite; passed through.
    SingleFile,
}

/// Merged plugin list shared by every file of one mode/config pair.
#[derive(Debug, PartialEq)]
pub struct BaseConfig {
    multipass: bool,
    plugins: Vec<PluginEntry>,
    /// Index of the `prefixIds` entry that receives the per-file namespace.
    prefix_slot: Option<usize>,
}

impl BaseConfig {
    pub fn build(user: &OptimizerConfig, mode: SpriteMode) -> Self {
        let multi = mode == SpriteMode::MultiFile;
        let mut plugins = Vec::with_capacity(user.plugins.len() + 2);
        let mut found_preset = false;
        let mut prefix_slot = None;

        for entry in &user.plugins {
            let mut entry = entry.clone();
            if entry.name() == PRESET_DEFAULT {
                found_preset = true;
                entry = merge_preset(entry, mode);
            } else if multi && prefix_slot.is_none() && entry.name() == PREFIX_IDS {
                entry.merge_params(json!({ "prefix": "" }));
                prefix_slot = Some(plugins.len());
            }
            plugins.push(entry);
        }

        if !found_preset && user.preset_default {
            plugins.push(PluginEntry::with_params(PRESET_DEFAULT, preset_params(mode)));
        }

        if multi && prefix_slot.is_none() {
            prefix_slot = Some(plugins.len());
            plugins.push(PluginEntry::with_params(PREFIX_IDS, json!({ "prefix": "" })));
        }

        Self {
            multipass: user.multipass,
            plugins,
            prefix_slot,
        }
    }

    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }

    /// Clone the base for one file, patching only the per-file fields.
    pub fn derive(&self, file_path: &Path, namespace: &str) -> ResolvedOptimizerConfig {
        let mut plugins = self.plugins.clone();
        if let Some(entry) = self.prefix_slot.and_then(|i| plugins.get_mut(i)) {
            entry.merge_params(json!({ "prefix": namespace }));
        }
        ResolvedOptimizerConfig {
            path: Some(file_path.to_path_buf()),
            multipass: self.multipass,
            plugins,
        }
    }
}

/// Overrides applied to `preset-default`.
///
/// Raw ids must survive until `prefixIds` namespaces them, and symbols need
/// their `viewBox`.
fn preset_params(mode: SpriteMode) -> Value {
    match mode {
        SpriteMode::MultiFile => json!({
            "overrides": {
                "removeViewBox": false,
                "cleanupIds": { "remove": false, "minify": false }
            }
        }),
        SpriteMode::SingleFile => json!({
            "overrides": {
                "cleanupIds": { "remove": false, "minify": false }
            }
        }),
    }
}

fn merge_preset(mut entry: PluginEntry, mode: SpriteMode) -> PluginEntry {
    match mode {
        // Built-in overrides are mandatory
        SpriteMode::MultiFile => entry.merge_params(preset_params(mode)),
        // Built-in overrides are only defaults under the user's own
        SpriteMode::SingleFile => {
            let user = entry.params().cloned().unwrap_or(Value::Null);
            entry = PluginEntry::with_params(PRESET_DEFAULT, preset_params(mode));
            entry.merge_params(user);
        }
    }
    entry
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    mode: SpriteMode,
    config: String,
}

/// Process-wide memo of merged base configurations.
#[derive(Debug, Default)]
pub struct ConfigCache {
    bases: Mutex<HashMap<CacheKey, Arc<BaseConfig>>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the base for `user`/`mode`, building it on first use.
    pub fn base(&self, user: &OptimizerConfig, mode: SpriteMode) -> Arc<BaseConfig> {
        let key = CacheKey {
            mode,
            config: serde_json::to_string(user).unwrap_or_default(),
        };
        let mut bases = self.bases.lock().unwrap_or_else(PoisonError::into_inner);
        bases
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(?mode, "building optimizer base config");
                Arc::new(BaseConfig::build(user, mode))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.bases.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Global config cache instance. Never invalidated.
pub static CONFIG_CACHE: LazyLock<ConfigCache> = LazyLock::new(ConfigCache::new);

/// Resolves configurations for the files of one build.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    base: Arc<BaseConfig>,
    style_prefix: String,
}

impl ConfigResolver {
    /// Resolver backed by the global [`CONFIG_CACHE`].
    pub fn new(user: &OptimizerConfig, style_prefix: &str, mode: SpriteMode) -> Self {
        Self::with_cache(&CONFIG_CACHE, user, style_prefix, mode)
    }

    pub fn with_cache(
        cache: &ConfigCache,
        user: &OptimizerConfig,
        style_prefix: &str,
        mode: SpriteMode,
    ) -> Self {
        Self {
            base: cache.base(user, mode),
            style_prefix: style_prefix.to_string(),
        }
    }

    pub fn resolve(&self, file_path: &Path, symbol_id: &str) -> ResolvedOptimizerConfig {
        let namespace = format!("{}{}{}", self.style_prefix, NAMESPACE_SEPARATOR, symbol_id);
        self.base.derive(file_path, &namespace)
    }
}

/// One-shot resolution through the global cache.
pub fn resolve(
    file_path: &Path,
    symbol_id: &str,
    style_prefix: &str,
    user: &OptimizerConfig,
    mode: SpriteMode,
) -> ResolvedOptimizerConfig {
    ConfigResolver::new(user, style_prefix, mode).resolve(file_path, symbol_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(plugins: Value) -> OptimizerConfig {
        serde_json::from_value(json!({ "plugins": plugins })).unwrap()
    }

    fn params<'a>(config: &'a ResolvedOptimizerConfig, name: &str) -> &'a Value {
        config.plugin(name).and_then(PluginEntry::params).unwrap()
    }

    #[test]
    fn test_multi_file_defaults() {
        let cache = ConfigCache::new();
        let resolver =
            ConfigResolver::with_cache(&cache, &OptimizerConfig::default(), "svg-style", SpriteMode::MultiFile);
        let config = resolver.resolve(Path::new("icons/nav/home.svg"), "nav-home");

        assert_eq!(config.path.as_deref(), Some(Path::new("icons/nav/home.svg")));
        let names: Vec<_> = config.plugins.iter().map(PluginEntry::name).collect();
        assert_eq!(names, [PRESET_DEFAULT, PREFIX_IDS]);
        assert_eq!(params(&config, PREFIX_IDS), &json!({ "prefix": "svg-style--nav-home" }));
        assert_eq!(
            params(&config, PRESET_DEFAULT)["overrides"]["removeViewBox"],
            json!(false)
        );
        assert_eq!(
            params(&config, PRESET_DEFAULT)["overrides"]["cleanupIds"],
            json!({ "remove": false, "minify": false })
        );
    }

    #[test]
    fn test_single_file_has_no_prefix_rule() {
        let cache = ConfigCache::new();
        let resolver =
            ConfigResolver::with_cache(&cache, &OptimizerConfig::default(), "svg-style", SpriteMode::SingleFile);
        let config = resolver.resolve(Path::new("sprite.svg"), "svg");

        assert!(config.plugin(PREFIX_IDS).is_none());
        let overrides = &params(&config, PRESET_DEFAULT)["overrides"];
        assert!(overrides.get("removeViewBox").is_none());
    }

    #[test]
    fn test_preset_disabled_and_undeclared() {
        let config = OptimizerConfig {
            preset_default: false,
            ..OptimizerConfig::default()
        };
        let base = BaseConfig::build(&config, SpriteMode::MultiFile);
        let names: Vec<_> = base.plugins().iter().map(PluginEntry::name).collect();
        assert_eq!(names, [PREFIX_IDS]);
    }

    #[test]
    fn test_user_preset_is_merged_and_forced_in_multi_file() {
        let config = user(json!([{
            "name": "preset-default",
            "params": { "overrides": { "convertColors": false, "removeViewBox": true, "cleanupIds": false } }
        }]));
        let base = BaseConfig::build(&config, SpriteMode::MultiFile);

        assert_eq!(base.plugins().len(), 2);
        let overrides = &base.plugins()[0].params().unwrap()["overrides"];
        assert_eq!(overrides["convertColors"], json!(false));
        assert_eq!(overrides["removeViewBox"], json!(false));
        assert_eq!(overrides["cleanupIds"], json!({ "remove": false, "minify": false }));
    }

    #[test]
    fn test_user_preset_wins_in_single_file() {
        let config = user(json!([{
            "name": "preset-default",
            "params": { "overrides": { "cleanupIds": false } }
        }]));
        let base = BaseConfig::build(&config, SpriteMode::SingleFile);
        let overrides = &base.plugins()[0].params().unwrap()["overrides"];
        assert_eq!(overrides["cleanupIds"], json!(false));
    }

    #[test]
    fn test_bare_preset_entry_gets_builtin_overrides() {
        let base = BaseConfig::build(&user(json!(["preset-default"])), SpriteMode::MultiFile);
        assert_eq!(base.plugins().len(), 2);
        assert_eq!(
            base.plugins()[0].params().unwrap()["overrides"]["removeViewBox"],
            json!(false)
        );
    }

    #[test]
    fn test_user_prefix_entry_keeps_its_params() {
        let config = user(json!([
            "removeComments",
            { "name": "prefixIds", "params": { "delim": "_", "prefix": "ignored" } }
        ]));
        let resolver = ConfigResolver::with_cache(&ConfigCache::new(), &config, "st", SpriteMode::MultiFile);
        let resolved = resolver.resolve(Path::new("a.svg"), "a");

        let names: Vec<_> = resolved.plugins.iter().map(PluginEntry::name).collect();
        assert_eq!(names, ["removeComments", PREFIX_IDS, PRESET_DEFAULT]);
        assert_eq!(params(&resolved, PREFIX_IDS), &json!({ "delim": "_", "prefix": "st--a" }));
    }

    #[test]
    fn test_user_prefix_entry_untouched_in_single_file() {
        let config = user(json!([{ "name": "prefixIds", "params": { "prefix": "mine" } }]));
        let resolved = resolve(Path::new("s.svg"), "svg", "st", &config, SpriteMode::SingleFile);
        assert_eq!(params(&resolved, PREFIX_IDS), &json!({ "prefix": "mine" }));
    }

    #[test]
    fn test_overrides_survive_for_every_file() {
        let config = user(json!([{
            "name": "preset-default",
            "params": { "overrides": { "convertColors": false } }
        }]));
        let resolver = ConfigResolver::with_cache(&ConfigCache::new(), &config, "st", SpriteMode::MultiFile);

        let first = resolver.resolve(Path::new("a.svg"), "a");
        let second = resolver.resolve(Path::new("b.svg"), "b");

        for resolved in [&first, &second] {
            assert_eq!(
                params(resolved, PRESET_DEFAULT)["overrides"]["convertColors"],
                json!(false)
            );
        }
        assert_eq!(params(&first, PREFIX_IDS)["prefix"], json!("st--a"));
        assert_eq!(params(&second, PREFIX_IDS)["prefix"], json!("st--b"));
        assert_eq!(second.path.as_deref(), Some(Path::new("b.svg")));
    }

    #[test]
    fn test_cache_reuses_base() {
        let cache = ConfigCache::new();
        let config = OptimizerConfig::default();

        let a = cache.base(&config, SpriteMode::MultiFile);
        let b = cache.base(&config, SpriteMode::MultiFile);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.base(&config, SpriteMode::SingleFile);
        cache.base(&user(json!(["sortAttrs"])), SpriteMode::MultiFile);
        assert_eq!(cache.len(), 3);
    }
}
