//! Running an optimizer over one source file.

use std::fs;
use std::path::Path;

use crate::config::ResolvedOptimizerConfig;
use crate::error::{OptimizeFailure, Result, SpriteError};

/// An SVG optimization transform.
///
/// Given raw markup and a resolved plugin configuration, returns either the
/// optimized markup or a diagnostic.
pub trait SvgOptimizer {
    fn optimize(&self, svg: &str, config: &ResolvedOptimizerConfig) -> std::result::Result<String, OptimizeFailure>;
}

impl<T: SvgOptimizer + ?Sized> SvgOptimizer for &T {
    fn optimize(&self, svg: &str, config: &ResolvedOptimizerConfig) -> std::result::Result<String, OptimizeFailure> {
        (**self).optimize(svg, config)
    }
}

/// Read `path` and optimize it. An optimizer failure aborts the build.
pub fn optimize_file(
    path: &Path,
    config: &ResolvedOptimizerConfig,
    optimizer: &impl SvgOptimizer,
) -> Result<String> {
    let raw = fs::read_to_string(path).map_err(|source| SpriteError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    optimizer.optimize(&raw, config).map_err(|failure| {
        tracing::error!(path = %path.display(), %failure, "optimizer run error");
        SpriteError::Optimization {
            path: path.to_path_buf(),
            failure,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::Engine;

    fn config(path: &Path) -> ResolvedOptimizerConfig {
        ResolvedOptimizerConfig {
            path: Some(path.to_path_buf()),
            multipass: false,
            plugins: Vec::new(),
        }
    }

    #[test]
    fn test_optimize_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.svg");
        fs::write(&path, "<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <path d=\"M0 0\"/>\n</svg>\n").unwrap();

        let out = optimize_file(&path, &config(&path), &Engine).unwrap();
        assert_eq!(out, r#"<svg xmlns="http://www.w3.org/2000/svg"><path d="M0 0"/></svg>"#);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.svg");
        let err = optimize_file(&path, &config(&path), &Engine).unwrap_err();
        assert!(matches!(err, SpriteError::FileRead { .. }));
    }

    #[test]
    fn test_malformed_file_is_optimization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.svg");
        fs::write(&path, "<svg><g></svg>").unwrap();

        match optimize_file(&path, &config(&path), &Engine).unwrap_err() {
            SpriteError::Optimization { path: failed, failure } => {
                assert_eq!(failed, path);
                assert_eq!(failure.path.as_deref(), Some(path.as_path()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
