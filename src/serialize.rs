//! SVG serialization to compact XML.
//!
//! Everything present in the tree is written out; dropping declarations,
//! comments and the like is the job of the optimization passes.

use crate::ast::*;

/// Serialize a Document to a compact SVG string.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();

    if let Some(decl) = &doc.xml_declaration {
        out.push_str("<?xml version=\"");
        out.push_str(&decl.version);
        out.push('"');
        if let Some(enc) = &decl.encoding {
            out.push_str(" encoding=\"");
            out.push_str(enc);
            out.push('"');
        }
        if let Some(standalone) = decl.standalone {
            out.push_str(" standalone=\"");
            out.push_str(if standalone { "yes" } else { "no" });
            out.push('"');
        }
        out.push_str("?>");
    }

    if let Some(dt) = &doc.doctype {
        out.push_str("<!DOCTYPE ");
        out.push_str(dt);
        out.push('>');
    }

    serialize_element(&mut out, &doc.root);
    out
}

fn serialize_element(out: &mut String, elem: &Element) {
    let name = elem.name.full_name();
    out.push('<');
    out.push_str(&name);

    for attr in &elem.attributes {
        out.push(' ');
        out.push_str(&attr.name.full_name());
        out.push_str("=\"");
        push_escaped_attr(out, &attr.value);
        out.push('"');
    }

    if elem.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    let mode = TextMode::of(elem);
    for child in &elem.children {
        serialize_node(out, child, mode);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

/// How the text children of an element are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// `<style>`/`<script>`: unescaped so selectors survive
    Raw,
    /// `xml:space="preserve"`
    Preserve,
    /// Text next to elements: spaces between words are significant
    Mixed,
    Trim,
}

impl TextMode {
    fn of(elem: &Element) -> Self {
        if elem.is("style") || elem.is("script") {
            Self::Raw
        } else if preserves_space(elem) {
            Self::Preserve
        } else if elem.child_elements().next().is_some() {
            Self::Mixed
        } else {
            Self::Trim
        }
    }
}

pub(crate) fn preserves_space(elem: &Element) -> bool {
    elem.attributes
        .iter()
        .any(|a| a.name.prefix.as_deref() == Some("xml") && a.name.local == "space" && a.value == "preserve")
}

/// Collapse each whitespace run to a single space, keeping one at either end.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn serialize_node(out: &mut String, node: &Node, mode: TextMode) {
    match node {
        Node::Element(elem) => serialize_element(out, elem),
        Node::Text(text) => match mode {
            TextMode::Raw if !text.contains('<') && !text.contains('&') => out.push_str(text.trim()),
            TextMode::Raw | TextMode::Trim => push_escaped_text(out, text.trim()),
            TextMode::Preserve => push_escaped_text(out, text),
            TextMode::Mixed => push_escaped_text(out, &collapse_whitespace(text)),
        },
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::CData(data) => {
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>");
        }
        Node::ProcessingInstruction { target, content } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(c) = content {
                out.push(' ');
                out.push_str(c);
            }
            out.push_str("?>");
        }
    }
}

fn push_escaped_attr(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_text(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_svg;

    #[test]
    fn test_serialize_keeps_attribute_order() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><rect y="1" x="2"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(serialize(&doc), svg);
    }

    #[test]
    fn test_serialize_keeps_declaration_until_removed() {
        let svg = r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"/>"#;
        let mut doc = parse_svg(svg).unwrap();
        assert!(serialize(&doc).starts_with("<?xml"));
        doc.xml_declaration = None;
        assert_eq!(serialize(&doc), r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
    }

    #[test]
    fn test_serialize_mixed_text_keeps_word_spacing() {
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\"><text>Hello <tspan>World</tspan>\n   again</text><title>  Icon  </title></svg>";
        let doc = parse_svg(svg).unwrap();
        assert_eq!(
            serialize(&doc),
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text>Hello <tspan>World</tspan> again</text><title>Icon</title></svg>"#
        );
    }

    #[test]
    fn test_serialize_preserved_space() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><text xml:space="preserve">  a   b </text></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(serialize(&doc), svg);
    }

    #[test]
    fn test_serialize_escapes_attributes() {
        let mut doc = parse_svg(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#).unwrap();
        doc.root.set_attr("data-x", "a\"b&c");
        assert!(serialize(&doc).contains(r#"data-x="a&quot;b&amp;c""#));
    }
}
