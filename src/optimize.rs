//! SVG optimization passes, driven by a plugin list.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::ast::*;
use crate::config::{PREFIX_IDS, PRESET_DEFAULT, PluginEntry, ResolvedOptimizerConfig};
use crate::error::{OptimizeFailure, SvgError};
use crate::ids::{CleanupIdsParams, PrefixIdsParams, cleanup_ids, prefix_ids};
use crate::invoke::SvgOptimizer;
use crate::parse::parse_svg;
use crate::serialize::{preserves_space, serialize};

const TEXT_CONTENT: &[&str] = &["text", "tspan", "textPath"];

/// Upper bound on pipeline repetitions with `multipass`.
const MAX_PASSES: usize = 10;

/// Members of `preset-default`, in execution order.
const PRESET_MEMBERS: &[&str] = &[
    "removeDoctype",
    "removeXMLProcInst",
    "removeComments",
    "removeMetadata",
    "removeEditorsNSData",
    "minifyStyles",
    "cleanupIds",
    "convertColors",
    "removeUnknownsAndDefaults",
    "removeViewBox",
    "removeHiddenElems",
    "collapseGroups",
    "removeEmptyContainers",
    "removeUnusedNS",
    "removeTitle",
    "removeDesc",
];

/// The built-in optimizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl SvgOptimizer for Engine {
    fn optimize(&self, svg: &str, config: &ResolvedOptimizerConfig) -> Result<String, OptimizeFailure> {
        optimize_svg(svg, config).map_err(|e| OptimizeFailure {
            path: config.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// Run the configured plugins over an SVG string.
pub fn optimize_svg(svg: &str, config: &ResolvedOptimizerConfig) -> Result<String, SvgError> {
    let passes = config
        .plugins
        .iter()
        .map(Pass::from_entry)
        .collect::<Result<Vec<_>, _>>()?;

    let mut input = svg.to_string();
    let rounds = if config.multipass { MAX_PASSES } else { 1 };
    for _ in 0..rounds {
        let mut doc = parse_svg(&input)?;
        for pass in &passes {
            pass.apply(&mut doc, config);
        }
        cleanup_whitespace(&mut doc.root);

        let output = serialize(&doc);
        if output == input {
            break;
        }
        input = output;
    }
    Ok(input)
}

/// One configured plugin.
#[derive(Debug, Clone)]
enum Pass {
    Preset(Vec<Pass>),
    RemoveDoctype,
    RemoveXmlProcInst,
    RemoveComments,
    RemoveMetadata,
    RemoveEditorsNsData,
    MinifyStyles,
    CleanupIds(CleanupIdsParams),
    ConvertColors,
    RemoveUnknownsAndDefaults,
    RemoveViewBox,
    RemoveHiddenElems,
    CollapseGroups,
    RemoveEmptyContainers,
    RemoveUnusedNs,
    RemoveTitle,
    RemoveDesc,
    SortAttrs,
    PrefixIds(PrefixIdsParams),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PresetParams {
    overrides: serde_json::Map<String, Value>,
}

impl Pass {
    fn from_entry(entry: &PluginEntry) -> Result<Self, SvgError> {
        Self::build(entry.name(), entry.params().unwrap_or(&Value::Null))
    }

    fn build(name: &str, params: &Value) -> Result<Self, SvgError> {
        let pass = match name {
            PRESET_DEFAULT => {
                let preset: PresetParams = typed_params(name, params)?;
                for key in preset.overrides.keys() {
                    if !PRESET_MEMBERS.contains(&key.as_str()) {
                        tracing::warn!(plugin = %key, "override for a plugin outside preset-default");
                    }
                }
                let mut members = Vec::with_capacity(PRESET_MEMBERS.len());
                for member in PRESET_MEMBERS {
                    match preset.overrides.get(*member) {
                        Some(Value::Bool(false)) => {}
                        Some(Value::Bool(true)) | None => members.push(Self::build(member, &Value::Null)?),
                        Some(member_params) => members.push(Self::build(member, member_params)?),
                    }
                }
                Self::Preset(members)
            }
            "removeDoctype" => Self::RemoveDoctype,
            "removeXMLProcInst" => Self::RemoveXmlProcInst,
            "removeComments" => Self::RemoveComments,
            "removeMetadata" => Self::RemoveMetadata,
            "removeEditorsNSData" => Self::RemoveEditorsNsData,
            "minifyStyles" => Self::MinifyStyles,
            "cleanupIds" => Self::CleanupIds(typed_params(name, params)?),
            "convertColors" => Self::ConvertColors,
            "removeUnknownsAndDefaults" => Self::RemoveUnknownsAndDefaults,
            "removeViewBox" => Self::RemoveViewBox,
            "removeHiddenElems" => Self::RemoveHiddenElems,
            "collapseGroups" => Self::CollapseGroups,
            "removeEmptyContainers" => Self::RemoveEmptyContainers,
            "removeUnusedNS" => Self::RemoveUnusedNs,
            "removeTitle" => Self::RemoveTitle,
            "removeDesc" => Self::RemoveDesc,
            "sortAttrs" => Self::SortAttrs,
            PREFIX_IDS => Self::PrefixIds(typed_params(name, params)?),
            _ => return Err(SvgError::UnknownPlugin(name.to_string())),
        };
        Ok(pass)
    }

    fn apply(&self, doc: &mut Document, config: &ResolvedOptimizerConfig) {
        match self {
            Self::Preset(members) => {
                for member in members {
                    member.apply(doc, config);
                }
            }
            Self::RemoveDoctype => doc.doctype = None,
            Self::RemoveXmlProcInst => doc.xml_declaration = None,
            Self::RemoveComments => remove_comments(&mut doc.root),
            Self::RemoveMetadata => remove_elements(&mut doc.root, &["metadata"]),
            Self::RemoveEditorsNsData => remove_editors_data(&mut doc.root),
            Self::MinifyStyles => {
                let scope = inherited_root_scope(doc);
                minify_styles(&mut doc.root, scope.as_ref());
            }
            Self::CleanupIds(params) => cleanup_ids(doc, params),
            Self::ConvertColors => convert_colors(&mut doc.root),
            Self::RemoveUnknownsAndDefaults => {
                let scope = inherited_root_scope(doc);
                remove_default_attrs(&mut doc.root, scope.as_ref());
            }
            Self::RemoveViewBox => doc.for_each_element_mut(remove_view_box),
            Self::RemoveHiddenElems => remove_hidden(&mut doc.root),
            Self::CollapseGroups => collapse_groups(&mut doc.root),
            Self::RemoveEmptyContainers => remove_empty(&mut doc.root),
            Self::RemoveUnusedNs => remove_unused_namespaces(&mut doc.root),
            Self::RemoveTitle => remove_elements(&mut doc.root, &["title"]),
            Self::RemoveDesc => remove_elements(&mut doc.root, &["desc"]),
            Self::SortAttrs => doc.for_each_element_mut(sort_attrs),
            Self::PrefixIds(params) => prefix_ids(doc, params, config.path.as_deref()),
        }
    }
}

/// Deserialize plugin params, treating `null`/`true` as "all defaults".
fn typed_params<T: DeserializeOwned + Default>(plugin: &str, params: &Value) -> Result<T, SvgError> {
    match params {
        Value::Null | Value::Bool(true) => Ok(T::default()),
        params => serde_json::from_value(params.clone()).map_err(|e| SvgError::InvalidParams {
            plugin: plugin.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Remove child elements with the given local names, at any depth.
fn remove_elements(elem: &mut Element, names: &[&str]) {
    elem.children.retain(|node| match node {
        Node::Element(e) => !names.iter().any(|n| e.is(n)),
        _ => true,
    });

    for child in elem.child_elements_mut() {
        remove_elements(child, names);
    }
}

fn is_editor_name(name: &QName) -> bool {
    matches!(name.prefix.as_deref(), Some("sodipodi" | "inkscape"))
}

/// Remove Inkscape/Sodipodi elements and attributes.
fn remove_editors_data(elem: &mut Element) {
    elem.children.retain(|node| match node {
        Node::Element(e) => !is_editor_name(&e.name),
        _ => true,
    });

    elem.attributes.retain(|attr| {
        let editor_ns = attr.name.prefix.as_deref() == Some("xmlns")
            && matches!(attr.name.local.as_str(), "sodipodi" | "inkscape");
        !is_editor_name(&attr.name) && !editor_ns && attr.name.local != "data-name"
    });

    for child in elem.child_elements_mut() {
        remove_editors_data(child);
    }
}

/// Remove unused namespace declarations.
fn remove_unused_namespaces(elem: &mut Element) {
    let mut used_prefixes: HashSet<Option<String>> = HashSet::new();
    collect_used_prefixes(elem, &mut used_prefixes);

    elem.attributes.retain(|attr| {
        if attr.name.prefix.as_deref() == Some("xmlns") {
            used_prefixes.contains(&Some(attr.name.local.clone()))
        } else {
            true
        }
    });
}

fn collect_used_prefixes(elem: &Element, used: &mut HashSet<Option<String>>) {
    used.insert(elem.name.prefix.clone());

    for attr in &elem.attributes {
        if attr.name.prefix.is_some() && !attr.name.is_xmlns() {
            used.insert(attr.name.prefix.clone());
        }
    }

    for child in elem.child_elements() {
        collect_used_prefixes(child, used);
    }
}

fn remove_comments(elem: &mut Element) {
    elem.children.retain(|node| !matches!(node, Node::Comment(_)));

    for child in elem.child_elements_mut() {
        remove_comments(child);
    }
}

/// Remove hidden elements (display:none, visibility:hidden, opacity:0).
fn remove_hidden(elem: &mut Element) {
    elem.children.retain(|node| match node {
        Node::Element(e) => !is_hidden(e),
        _ => true,
    });

    for child in elem.child_elements_mut() {
        remove_hidden(child);
    }
}

fn is_hidden(elem: &Element) -> bool {
    // Referenced paint servers and clip sources are often display:none on purpose
    if elem.get_attr("id").is_some() {
        return false;
    }

    if elem.get_attr("display") == Some("none") || elem.get_attr("visibility") == Some("hidden") {
        return true;
    }

    if let Some(opacity) = elem.get_attr("opacity")
        && opacity.parse::<f64>().ok() == Some(0.0)
    {
        return true;
    }

    elem.get_attr("style")
        .is_some_and(|style| style.contains("display:none") || style.contains("display: none"))
}

/// Remove empty container elements.
fn remove_empty(elem: &mut Element) {
    for child in elem.child_elements_mut() {
        remove_empty(child);
    }

    let containers = ["g", "defs", "symbol", "marker", "clipPath", "mask", "pattern"];

    elem.children.retain(|node| match node {
        Node::Element(e) if containers.contains(&e.name.local.as_str()) => {
            !e.children.is_empty() || e.get_attr("id").is_some()
        }
        _ => true,
    });
}

/// Presentation attributes a child inherits, and so may take over from a
/// collapsed group.
const MOVABLE_ATTRS: &[&str] = &[
    "clip-rule",
    "color",
    "fill",
    "fill-opacity",
    "fill-rule",
    "font-family",
    "font-size",
    "font-stretch",
    "font-style",
    "font-variant",
    "font-weight",
    "letter-spacing",
    "marker-end",
    "marker-mid",
    "marker-start",
    "paint-order",
    "stroke",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "text-anchor",
    "visibility",
    "word-spacing",
];

/// Collapse single-child groups into their parent, handing the group's
/// inheritable attributes down to the child.
fn collapse_groups(elem: &mut Element) {
    for child in elem.child_elements_mut() {
        collapse_groups(child);
    }

    let mut new_children = Vec::with_capacity(elem.children.len());
    for child in std::mem::take(&mut elem.children) {
        match child {
            Node::Element(group) if can_collapse_group(&group) => {
                new_children.extend(collapse_into_child(group));
            }
            other => new_children.push(other),
        }
    }
    elem.children = new_children;
}

fn can_collapse_group(elem: &Element) -> bool {
    if !elem.is("g") || elem.children.len() != 1 {
        return false;
    }
    let Some(Node::Element(child)) = elem.children.first() else {
        return false;
    };

    // A referenced child would pick up paint it never had
    if !elem.attributes.is_empty() && child.get_attr("id").is_some() {
        return false;
    }

    elem.attributes
        .iter()
        .all(|a| a.name.prefix.is_none() && MOVABLE_ATTRS.contains(&a.name.local.as_str()))
}

fn collapse_into_child(mut group: Element) -> Vec<Node> {
    let mut children = std::mem::take(&mut group.children);
    if let [Node::Element(child)] = children.as_mut_slice() {
        for attr in group.attributes {
            if child.get_attr(&attr.name.local).is_none() {
                child.attributes.push(attr);
            }
        }
    }
    children
}

const COLOR_PROPS: &[&str] = &[
    "fill",
    "stroke",
    "stop-color",
    "flood-color",
    "lighting-color",
    "color",
];

fn convert_colors(elem: &mut Element) {
    for attr in &mut elem.attributes {
        if COLOR_PROPS.contains(&attr.name.local.as_str()) {
            attr.value = minify_color(&attr.value);
        }
    }

    if let Some(style) = elem.get_attr("style").map(str::to_string) {
        elem.set_attr("style", map_declarations(&style, |prop, value| {
            if COLOR_PROPS.contains(&prop) {
                Some(minify_color(value))
            } else {
                Some(value.to_string())
            }
        }));
    }

    for child in elem.child_elements_mut() {
        convert_colors(child);
    }
}

fn minify_color(color: &str) -> String {
    let color = color.trim();
    let lower = color.to_lowercase();

    match lower.as_str() {
        "white" | "#ffffff" | "#fff" => return "#fff".into(),
        "black" | "#000000" | "#000" => return "#000".into(),
        "#ff0000" | "#f00" => return "red".into(),
        _ => {}
    }

    // #RRGGBB -> #RGB if possible
    if lower.len() == 7 && lower.starts_with('#') && lower[1..].chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = lower.as_bytes();
        if bytes[1] == bytes[2] && bytes[3] == bytes[4] && bytes[5] == bytes[6] {
            return format!("#{}{}{}", bytes[1] as char, bytes[3] as char, bytes[5] as char);
        }
        return lower;
    }

    color.to_string()
}

/// Rewrite each `prop:value` declaration of an inline style.
/// The closure returns `None` to drop a declaration.
fn map_declarations(style: &str, mut f: impl FnMut(&str, &str) -> Option<String>) -> String {
    let mut parts = Vec::new();
    for decl in style.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        match decl.split_once(':') {
            Some((prop, value)) => {
                let prop = prop.trim();
                if let Some(value) = f(prop, value.trim()) {
                    parts.push(format!("{}:{}", prop, value));
                }
            }
            None => parts.push(decl.to_string()),
        }
    }
    parts.join(";")
}

/// Inherited properties whose initial value is safe to drop, with the
/// spellings of that initial value.
const INHERITED_INITIAL: &[(&str, &[&str])] = &[
    ("fill-opacity", &["1"]),
    ("stroke-opacity", &["1"]),
    ("stroke-width", &["1"]),
    ("stroke-linecap", &["butt"]),
    ("stroke-linejoin", &["miter"]),
    ("stroke-miterlimit", &["4"]),
    ("fill-rule", &["nonzero"]),
    ("clip-rule", &["nonzero"]),
    ("font-style", &["normal"]),
    ("font-weight", &["normal", "400"]),
    ("text-anchor", &["start"]),
    ("visibility", &["visible"]),
];

/// Inherited property values set by ancestors. A missing key means the
/// initial value.
type InheritedScope = HashMap<String, String>;

fn inherited_initial(prop: &str) -> Option<&'static [&'static str]> {
    INHERITED_INITIAL
        .iter()
        .find(|(name, _)| *name == prop)
        .map(|(_, initial)| *initial)
}

/// A stylesheet can set inherited properties on any ancestor, so with one
/// present nothing is known about what a child inherits.
fn inherited_root_scope(doc: &Document) -> Option<InheritedScope> {
    (!doc.root.contains("style")).then(InheritedScope::new)
}

/// Whether `value` is what the element would inherit anyway.
/// `None` for a property that is not inherited.
fn is_inherited_value(prop: &str, value: &str, parent: Option<&InheritedScope>) -> Option<bool> {
    let initial = inherited_initial(prop)?;
    let Some(parent) = parent else {
        return Some(false);
    };
    Some(match parent.get(prop) {
        Some(inherited) => {
            inherited == value || (initial.contains(&inherited.as_str()) && initial.contains(&value))
        }
        None => initial.contains(&value),
    })
}

/// The scope an element hands to its children. Inline style wins over
/// presentation attributes.
fn child_scope(elem: &Element, parent: Option<&InheritedScope>) -> Option<InheritedScope> {
    let mut scope = parent?.clone();
    for attr in &elem.attributes {
        if attr.name.prefix.is_none() && inherited_initial(&attr.name.local).is_some() {
            scope.insert(attr.name.local.clone(), attr.value.trim().to_string());
        }
    }
    if let Some(style) = elem.get_attr("style") {
        for (prop, value) in style.split(';').filter_map(|decl| decl.split_once(':')) {
            let prop = prop.trim();
            if inherited_initial(prop).is_some() {
                scope.insert(prop.to_string(), value.trim().to_string());
            }
        }
    }
    Some(scope)
}

fn remove_default_attrs(elem: &mut Element, parent: Option<&InheritedScope>) {
    elem.attributes.retain(|attr| {
        if attr.name.prefix.is_some() {
            return true;
        }
        match is_inherited_value(&attr.name.local, &attr.value, parent) {
            Some(redundant) => !redundant,
            None => !is_default_value(&elem.name.local, &attr.name.local, &attr.value),
        }
    });

    let scope = child_scope(elem, parent);
    for child in elem.child_elements_mut() {
        remove_default_attrs(child, scope.as_ref());
    }
}

/// Defaults of properties that are not inherited.
fn is_default_value(element: &str, attr: &str, value: &str) -> bool {
    match (element, attr, value) {
        ("svg", "version", "1.1") | ("svg", "baseProfile", "full") => true,
        (_, "preserveAspectRatio", "xMidYMid meet") => true,

        (_, "opacity", "1") => true,
        (_, "dominant-baseline", "auto") | (_, "display", "inline") => true,

        ("rect", "rx" | "ry", "0") => true,
        ("circle" | "ellipse", "cx" | "cy", "0") => true,
        ("line", "x1" | "y1" | "x2" | "y2", "0") => true,

        _ => false,
    }
}

fn minify_styles(elem: &mut Element, parent: Option<&InheritedScope>) {
    if let Some(style) = elem.get_attr("style").map(str::to_string) {
        let minified = map_declarations(&style, |prop, value| {
            // Dropping the declaration would expose a presentation attribute
            if elem.get_attr(prop).is_some() {
                return Some(value.to_string());
            }
            let redundant = match is_inherited_value(prop, value, parent) {
                Some(redundant) => redundant,
                None => (prop, value) == ("opacity", "1"),
            };
            (!redundant).then(|| value.to_string())
        });
        if minified.is_empty() {
            elem.remove_attr("style");
        } else {
            elem.set_attr("style", minified);
        }
    }

    let scope = child_scope(elem, parent);
    for child in elem.child_elements_mut() {
        minify_styles(child, scope.as_ref());
    }
}

/// Drop `viewBox` on `<svg>` when it only restates `width`/`height`.
fn remove_view_box(elem: &mut Element) {
    if !elem.is("svg") {
        return;
    }
    let (Some(view_box), Some(width), Some(height)) =
        (elem.get_attr("viewBox"), elem.get_attr("width"), elem.get_attr("height"))
    else {
        return;
    };

    let numbers: Vec<f64> = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    let px = |s: &str| s.trim().trim_end_matches("px").parse::<f64>().ok();

    if let [x, y, w, h] = numbers[..]
        && x == 0.0
        && y == 0.0
        && px(width) == Some(w)
        && px(height) == Some(h)
    {
        elem.remove_attr("viewBox");
    }
}

/// Namespace declarations first, then by name.
fn sort_attrs(elem: &mut Element) {
    elem.attributes.sort_by(|a, b| {
        b.name
            .is_xmlns()
            .cmp(&a.name.is_xmlns())
            .then_with(|| a.name.full_name().cmp(&b.name.full_name()))
    });
}

/// Clean up whitespace-only text nodes outside text content, where the
/// space between two spans is rendered.
fn cleanup_whitespace(elem: &mut Element) {
    let significant = TEXT_CONTENT.iter().any(|name| elem.is(name)) || preserves_space(elem);
    if !significant {
        elem.children.retain(|node| match node {
            Node::Text(text) => !text.trim().is_empty(),
            _ => true,
        });
    }

    for child in elem.child_elements_mut() {
        cleanup_whitespace(child);
    }
}
