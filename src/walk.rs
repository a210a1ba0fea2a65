//! Source tree traversal.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, SpriteError};

/// Joins path segments into a symbol id.
pub const ID_SEPARATOR: &str = "-";

/// One icon file and the symbol id derived from its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub file_path: PathBuf,
    pub symbol_id: String,
}

/// List every `.svg` file under `root`, depth-first in directory listing order.
///
/// `root/nav/home.svg` gets the id `nav-home`.
pub fn walk(root: &Path) -> Result<Vec<SourceEntry>> {
    walk_with_parent(root, None)
}

/// Like [`walk`], with every id prefixed by `parent_id`.
pub fn walk_with_parent(root: &Path, parent_id: Option<&str>) -> Result<Vec<SourceEntry>> {
    fs::read_dir(root).map_err(|source| SpriteError::SourceUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|err| SpriteError::SourceUnreadable {
            path: err.path().unwrap_or(root).to_path_buf(),
            source: err.into(),
        })?;

        if entry.file_type().is_dir() || entry.path().extension().is_none_or(|ext| ext != "svg") {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        entries.push(SourceEntry {
            file_path: entry.path().to_path_buf(),
            symbol_id: symbol_id(relative, parent_id),
        });
    }

    tracing::debug!(root = %root.display(), count = entries.len(), "collected sprite sources");
    Ok(entries)
}

fn symbol_id(relative: &Path, parent_id: Option<&str>) -> String {
    let mut segments: Vec<String> = parent_id.map(str::to_string).into_iter().collect();
    if let Some(dirs) = relative.parent() {
        segments.extend(dirs.iter().map(|s| s.to_string_lossy().into_owned()));
    }
    if let Some(stem) = relative.file_stem() {
        segments.push(stem.to_string_lossy().into_owned());
    }
    segments.join(ID_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;

    fn tree(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, ICON).unwrap();
        }
        dir
    }

    fn ids(entries: &[SourceEntry]) -> HashSet<&str> {
        entries.iter().map(|e| e.symbol_id.as_str()).collect()
    }

    #[test]
    fn test_flat_directory() {
        let dir = tree(&["icon.svg"]);
        let entries = walk(dir.path()).unwrap();
        assert_eq!(
            entries,
            [SourceEntry {
                file_path: dir.path().join("icon.svg"),
                symbol_id: "icon".into(),
            }]
        );
    }

    #[test]
    fn test_nested_ids() {
        let dir = tree(&["nav/home.svg", "a/b/icon.svg", "top.svg"]);
        let entries = walk(dir.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(ids(&entries), HashSet::from(["nav-home", "a-b-icon", "top"]));

        let home = entries.iter().find(|e| e.symbol_id == "nav-home").unwrap();
        assert_eq!(home.file_path, dir.path().join("nav").join("home.svg"));
    }

    #[test]
    fn test_ignores_other_files() {
        let dir = tree(&["icon.svg", "readme.md", "icon.SVG", "nested/notes.txt", "empty/.keep"]);
        let entries = walk(dir.path()).unwrap();
        assert_eq!(ids(&entries), HashSet::from(["icon"]));
    }

    #[test]
    fn test_directories_are_expanded_inline() {
        let dir = tree(&[
            "a.svg",
            "group/one.svg",
            "group/two.svg",
            "group/deeper/three.svg",
            "m.svg",
            "z.svg",
        ]);
        let entries = walk(dir.path()).unwrap();
        assert_eq!(entries.len(), 6);

        // A directory's entries form one contiguous run, wherever it lands
        let in_group: Vec<bool> = entries.iter().map(|e| e.symbol_id.starts_with("group-")).collect();
        let first = in_group.iter().position(|&g| g).unwrap();
        let last = in_group.iter().rposition(|&g| g).unwrap();
        assert_eq!(last - first + 1, 3);
        assert!(in_group[first..=last].iter().all(|&g| g));

        // Same for the nested directory inside the group
        let deeper: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.symbol_id.starts_with("group-deeper-"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(deeper.len(), 1);
        assert!((first..=last).contains(&deeper[0]));
    }

    #[test]
    fn test_parent_id_prefix() {
        let dir = tree(&["nav/home.svg"]);
        let entries = walk_with_parent(dir.path(), Some("icons")).unwrap();
        assert_eq!(entries[0].symbol_id, "icons-nav-home");
    }

    #[test]
    fn test_dotted_stem_keeps_inner_dots() {
        let dir = tree(&["v1.2/arrow.min.svg"]);
        let entries = walk(dir.path()).unwrap();
        assert_eq!(entries[0].symbol_id, "v1.2-arrow.min");
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = walk(&missing).unwrap_err();
        assert!(matches!(err, SpriteError::SourceUnreadable { path, .. } if path == missing));
    }
}
