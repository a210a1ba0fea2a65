//! Id handling plugins: `cleanupIds` and `prefixIds`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::ast::*;

/// `url(#id)` references, with optional quotes.
static URL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*(['"]?)#([^'")\s]+)(['"]?)\s*\)"#).unwrap());

/// `#id` and `.class` selectors inside `<style>` text.
static CSS_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([#.])(-?[A-Za-z_][\w-]*)").unwrap());

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleanupIdsParams {
    /// Drop ids nothing references.
    pub remove: bool,
    /// Shorten referenced ids.
    pub minify: bool,
    pub preserve: Vec<String>,
    pub preserve_prefixes: Vec<String>,
    /// Run even when the document carries `<style>` or `<script>`.
    pub force: bool,
}

impl Default for CleanupIdsParams {
    fn default() -> Self {
        Self {
            remove: true,
            minify: true,
            preserve: Vec::new(),
            preserve_prefixes: Vec::new(),
            force: false,
        }
    }
}

impl CleanupIdsParams {
    fn is_preserved(&self, id: &str) -> bool {
        self.preserve.iter().any(|p| p == id)
            || self.preserve_prefixes.iter().any(|p| id.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrefixIdsParams {
    /// Namespace; falls back to the file stem when empty.
    pub prefix: String,
    pub delim: String,
    pub prefix_ids: bool,
    pub prefix_class_names: bool,
}

impl Default for PrefixIdsParams {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delim: "__".to_string(),
            prefix_ids: true,
            prefix_class_names: true,
        }
    }
}

/// Remove unreferenced ids and shorten referenced ones.
pub fn cleanup_ids(doc: &mut Document, params: &CleanupIdsParams) {
    // Ids may be used from CSS or scripts we do not analyse
    if !params.force && (doc.root.contains("style") || doc.root.contains("script")) {
        return;
    }

    let referenced = collect_references(doc);

    let mut kept = HashSet::new();
    doc.for_each_element(|elem| {
        if let Some(id) = elem.get_attr("id") {
            let renamed = params.minify && referenced.contains(id) && !params.is_preserved(id);
            if !renamed {
                kept.insert(id.to_string());
            }
        }
    });

    let mut renames = HashMap::new();
    let mut counter = 0;
    doc.for_each_element_mut(|elem| {
        let Some(id) = elem.get_attr("id").map(str::to_string) else {
            return;
        };
        if params.is_preserved(&id) {
            return;
        }
        if !referenced.contains(&id) {
            if params.remove {
                elem.remove_attr("id");
            }
            return;
        }
        if !params.minify {
            return;
        }
        let short = renames.entry(id).or_insert_with(|| loop {
            let candidate = short_id(counter);
            counter += 1;
            if !kept.contains(&candidate) {
                break candidate;
            }
        });
        elem.set_attr("id", short.clone());
    });

    if !renames.is_empty() {
        doc.for_each_element_mut(|elem| {
            rewrite_references(elem, |id| renames.get(id).cloned());
        });
    }
}

/// Namespace ids and class names so merged documents cannot collide.
pub fn prefix_ids(doc: &mut Document, params: &PrefixIdsParams, path: Option<&Path>) {
    let prefix = if params.prefix.is_empty() {
        path.and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prefix".to_string())
    } else {
        params.prefix.clone()
    };
    let namespace = format!("{}{}", prefix, params.delim);
    let apply = |name: &str| {
        if name.starts_with(namespace.as_str()) {
            name.to_string()
        } else {
            format!("{}{}", namespace, name)
        }
    };

    let mut ids = HashSet::new();
    let mut classes = HashSet::new();
    doc.for_each_element(|elem| {
        if let Some(id) = elem.get_attr("id") {
            ids.insert(id.to_string());
        }
        if let Some(class) = elem.get_attr("class") {
            classes.extend(class.split_whitespace().map(str::to_string));
        }
    });

    doc.for_each_element_mut(|elem| {
        if params.prefix_ids {
            if let Some(id) = elem.get_attr("id").map(&apply) {
                elem.set_attr("id", id);
            }
            rewrite_references(elem, |id| Some(apply(id)));
        }

        if params.prefix_class_names
            && let Some(class) = elem.get_attr("class")
        {
            let prefixed: Vec<_> = class.split_whitespace().map(&apply).collect();
            elem.set_attr("class", prefixed.join(" "));
        }

        if elem.is("style") {
            for node in &mut elem.children {
                if let Node::Text(css) | Node::CData(css) = node {
                    *css = CSS_SELECTOR
                        .replace_all(css, |caps: &Captures| {
                            let name = &caps[2];
                            let known = match &caps[1] {
                                "#" => params.prefix_ids && ids.contains(name),
                                _ => params.prefix_class_names && classes.contains(name),
                            };
                            if known {
                                format!("{}{}", &caps[1], apply(name))
                            } else {
                                caps[0].to_string()
                            }
                        })
                        .into_owned();
                }
            }
        }
    });
}

/// Ids referenced through `href="#id"` or `url(#id)` anywhere in the tree.
fn collect_references(doc: &Document) -> HashSet<String> {
    let mut refs = HashSet::new();
    doc.for_each_element(|elem| {
        for attr in &elem.attributes {
            if attr.is_href()
                && let Some(id) = attr.value.strip_prefix('#')
            {
                refs.insert(id.to_string());
            }
            for caps in URL_REF.captures_iter(&attr.value) {
                refs.insert(caps[2].to_string());
            }
        }
    });
    refs
}

/// Rewrite local references in the element's attributes.
/// `map` returns the new id, or `None` to leave a reference alone.
fn rewrite_references(elem: &mut Element, map: impl Fn(&str) -> Option<String>) {
    for attr in &mut elem.attributes {
        if attr.is_href() {
            if let Some(new) = attr.value.strip_prefix('#').and_then(&map) {
                attr.value = format!("#{}", new);
            }
            continue;
        }
        if attr.value.contains("url(") {
            attr.value = URL_REF
                .replace_all(&attr.value, |caps: &Captures| match map(&caps[2]) {
                    Some(new) => format!("url({}#{}{})", &caps[1], new, &caps[3]),
                    None => caps[0].to_string(),
                })
                .into_owned();
        }
    }
}

/// `a`..`z`, `A`..`Z`, `aa`, `ab`, ...
fn short_id(mut n: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut out = Vec::new();
    loop {
        out.push(ALPHABET[n % ALPHABET.len()]);
        n /= ALPHABET.len();
        if n == 0 {
            break;
        }
        n -= 1;
    }
    out.iter().rev().map(|&b| b as char).collect()
}
