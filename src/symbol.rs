//! Turning an optimized icon into a `<symbol>`.
//!
//! This works on the markup text, not on a parsed tree: only the root tag's
//! `viewBox` and the root's inner content are needed.

use std::sync::LazyLock;

use regex::Regex;

/// Root `<svg ...>` element: opening tag attributes and inner content up to
/// the last closing tag.
static SVG_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<svg\b([^>]*)>(.*)</svg\s*>").unwrap());

/// One `name=value` attribute, value in any of the three quote styles.
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/>"'`]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)"#).unwrap()
});

/// Separator between the symbol prefix and the symbol id.
pub const SYMBOL_SEPARATOR: &str = "--";

/// Wrap the content of an optimized `<svg>` document in a `<symbol>`.
///
/// A missing `viewBox` leaves the attribute out and a missing `<svg>` root
/// gives an empty symbol; neither is an error.
pub fn to_symbol(markup: &str, symbol_prefix: &str, symbol_id: &str) -> String {
    let id = format!("{}{}{}", symbol_prefix, SYMBOL_SEPARATOR, symbol_id);

    let Some(root) = SVG_ROOT.captures(markup) else {
        tracing::warn!(%id, "no <svg> root found, emitting an empty symbol");
        return format!(r#"<symbol id="{}"></symbol>"#, id);
    };
    let attributes = &root[1];
    let inner = &root[2];

    match extract_view_box(attributes) {
        Some(view_box) => format!(r#"<symbol id="{}" viewBox="{}">{}</symbol>"#, id, view_box, inner),
        None => {
            tracing::warn!(%id, "icon has no viewBox, it will not scale");
            format!(r#"<symbol id="{}">{}</symbol>"#, id, inner)
        }
    }
}

/// Attributes are scanned in order so names inside other values, or names
/// that merely end in `viewbox`, never match.
fn extract_view_box(attributes: &str) -> Option<&str> {
    let caps = ATTRIBUTE
        .captures_iter(attributes)
        .find(|caps| &caps[1] == "viewBox")?;
    caps.get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_from_icon() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0h24"/></svg>"#;
        assert_eq!(
            to_symbol(svg, "svg", "icon"),
            r#"<symbol id="svg--icon" viewBox="0 0 24 24"><path d="M0 0h24"/></symbol>"#
        );
    }

    #[test]
    fn test_view_box_quote_styles() {
        for svg in [
            r#"<svg viewBox='0 0 16 16'><g/></svg>"#,
            "<svg viewBox=`0 0 16 16`><g/></svg>",
            r#"<SVG viewBox = "0 0 16 16"><g/></SVG>"#,
        ] {
            assert_eq!(
                to_symbol(svg, "svg", "x"),
                r#"<symbol id="svg--x" viewBox="0 0 16 16"><g/></symbol>"#
            );
        }
    }

    #[test]
    fn test_view_box_value_is_kept_verbatim() {
        let svg = r#"<svg viewBox="-1.5 0,  24.25 24"><g/></svg>"#;
        assert!(to_symbol(svg, "svg", "x").contains(r#"viewBox="-1.5 0,  24.25 24""#));
    }

    #[test]
    fn test_view_box_ignores_lookalike_attributes() {
        let svg = r#"<svg data-viewbox="9 9 9 9" aria-label="viewBox='1 1 1 1'" viewBox="0 0 24 24"><g/></svg>"#;
        assert_eq!(
            to_symbol(svg, "svg", "x"),
            r#"<symbol id="svg--x" viewBox="0 0 24 24"><g/></symbol>"#
        );

        let svg = r#"<svg VIEWBOX="0 0 24 24"><g/></svg>"#;
        assert_eq!(to_symbol(svg, "svg", "x"), r#"<symbol id="svg--x"><g/></symbol>"#);
    }

    #[test]
    fn test_missing_view_box() {
        let svg = r#"<svg width="10" height="10"><rect/></svg>"#;
        assert_eq!(to_symbol(svg, "svg", "x"), r#"<symbol id="svg--x"><rect/></symbol>"#);
    }

    #[test]
    fn test_multiline_content() {
        let svg = "<svg\n  viewBox=\"0 0 8 8\">\n<g>\n<rect/>\n</g>\n</svg>\n";
        assert_eq!(
            to_symbol(svg, "i", "a-b"),
            "<symbol id=\"i--a-b\" viewBox=\"0 0 8 8\">\n<g>\n<rect/>\n</g>\n</symbol>"
        );
    }

    #[test]
    fn test_nested_svg_keeps_outer_content() {
        let svg = r#"<svg viewBox="0 0 2 2"><svg viewBox="0 0 1 1"><rect/></svg><circle/></svg>"#;
        assert_eq!(
            to_symbol(svg, "svg", "n"),
            r#"<symbol id="svg--n" viewBox="0 0 2 2"><svg viewBox="0 0 1 1"><rect/></svg><circle/></symbol>"#
        );
    }

    #[test]
    fn test_no_svg_root() {
        assert_eq!(to_symbol("<g/>", "svg", "x"), r#"<symbol id="svg--x"></symbol>"#);
    }

    #[test]
    fn test_self_closing_root_is_empty_symbol() {
        assert_eq!(
            to_symbol(r#"<svg viewBox="0 0 1 1"/>"#, "svg", "x"),
            r#"<symbol id="svg--x"></symbol>"#
        );
    }
}
