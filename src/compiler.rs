//! Sprite compilation entry point.

use std::fs;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::error::{Result, SpriteError};
use crate::invoke::{SvgOptimizer, optimize_file};
use crate::options::CompileOptions;
use crate::optimize::Engine;
use crate::resolve::{ConfigResolver, SpriteMode};
use crate::symbol::to_symbol;
use crate::walk::walk;

/// Keeps the sprite out of the layout while its `<defs>` stay usable.
pub const VISUALLY_HIDDEN: &str = r#"style="border:0;clip:rect(0 0 0 0);height:auto;margin:0;overflow:hidden;padding:0;position:absolute;width:1px;white-space:nowrap""#;

/// First opening `<svg ...>` tag of a document.
static SVG_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<svg\b.*?>").unwrap());

/// Build the sprite with the built-in optimizer.
pub fn compile(options: &CompileOptions) -> Result<String> {
    compile_with(options, &Engine)
}

/// Build the sprite with a caller-provided optimizer.
///
/// A directory source becomes one `<symbol>` per icon; a file source is
/// treated as a finished sprite and only optimized. Any failing file aborts
/// the whole build.
pub fn compile_with(options: &CompileOptions, optimizer: &impl SvgOptimizer) -> Result<String> {
    let source = &options.source;
    let metadata = fs::metadata(source).map_err(|source_err| SpriteError::SourceUnreadable {
        path: source.clone(),
        source: source_err,
    })?;

    if metadata.is_dir() {
        compile_directory(options, optimizer)
    } else {
        compile_sprite_file(options, optimizer)
    }
}

fn compile_directory(options: &CompileOptions, optimizer: &impl SvgOptimizer) -> Result<String> {
    let entries = walk(&options.source)?;
    let resolver = ConfigResolver::new(&options.optimizer, &options.style_prefix, SpriteMode::MultiFile);

    let mut symbols = String::new();
    for entry in &entries {
        let config = resolver.resolve(&entry.file_path, &entry.symbol_id);
        let optimized = optimize_file(&entry.file_path, &config, optimizer)?;
        symbols.push_str(&to_symbol(&optimized, &options.symbol_prefix, &entry.symbol_id));
        tracing::debug!(id = %entry.symbol_id, path = %entry.file_path.display(), "added symbol");
    }

    tracing::info!(
        source = %options.source.display(),
        symbols = entries.len(),
        "compiled sprite"
    );
    Ok(format!("<svg {}>{}</svg>", VISUALLY_HIDDEN, symbols))
}

fn compile_sprite_file(options: &CompileOptions, optimizer: &impl SvgOptimizer) -> Result<String> {
    let resolver = ConfigResolver::new(&options.optimizer, &options.style_prefix, SpriteMode::SingleFile);
    let config = resolver.resolve(&options.source, &options.symbol_prefix);
    let optimized = optimize_file(&options.source, &config, optimizer)?;

    tracing::info!(source = %options.source.display(), "optimized existing sprite");
    let open_tag = format!("<svg {}>", VISUALLY_HIDDEN);
    Ok(SVG_OPEN_TAG
        .replace(&optimized, NoExpand(&open_tag))
        .into_owned())
}
