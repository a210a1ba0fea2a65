//! SVG parsing from XML.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::ast::*;
use crate::error::SvgError;

/// Parse an SVG string into a Document.
pub fn parse_svg(svg: &str) -> Result<Document, SvgError> {
    let mut reader = Reader::from_str(svg);

    let mut xml_declaration = None;
    let mut doctype = None;

    let root = loop {
        match reader.read_event()? {
            Event::Decl(decl) => {
                xml_declaration = Some(XmlDeclaration {
                    version: String::from_utf8_lossy(decl.version()?.as_ref()).into_owned(),
                    encoding: decl
                        .encoding()
                        .transpose()
                        .ok()
                        .flatten()
                        .map(|e| String::from_utf8_lossy(e.as_ref()).into_owned()),
                    standalone: decl
                        .standalone()
                        .transpose()
                        .ok()
                        .flatten()
                        .map(|s| &*s == b"yes"),
                });
            }
            Event::DocType(dt) => {
                doctype = Some(String::from_utf8_lossy(&dt).into_owned());
            }
            Event::Start(start) => {
                let mut element = element_from_start(&start)?;
                read_children(&mut reader, &mut element)?;
                break element;
            }
            Event::Empty(start) => break element_from_start(&start)?,
            Event::Eof => return Err(SvgError::InvalidSvg("No root element found".into())),
            // Prolog comments, whitespace and PIs are not kept
            _ => {}
        }
    };

    if !root.is("svg") {
        return Err(SvgError::InvalidSvg(format!(
            "Root element is <{}>, expected <svg>",
            root.name.full_name()
        )));
    }

    Ok(Document {
        xml_declaration,
        doctype,
        root,
    })
}

fn read_children(reader: &mut Reader<&[u8]>, element: &mut Element) -> Result<(), SvgError> {
    loop {
        let node = match reader.read_event()? {
            Event::Start(start) => {
                let mut child = element_from_start(&start)?;
                read_children(reader, &mut child)?;
                Node::Element(child)
            }
            Event::Empty(start) => Node::Element(element_from_start(&start)?),
            Event::End(_) => return Ok(()),
            Event::Text(text) => {
                let text = text.unescape()?;
                if text.trim().is_empty() && element.children.is_empty() {
                    continue;
                }
                Node::Text(text.into_owned())
            }
            Event::Comment(comment) => Node::Comment(String::from_utf8_lossy(&comment).into_owned()),
            Event::CData(cdata) => Node::CData(String::from_utf8_lossy(&cdata).into_owned()),
            Event::PI(pi) => {
                let content = String::from_utf8_lossy(&pi).into_owned();
                match content.split_once(char::is_whitespace) {
                    Some((target, rest)) => Node::ProcessingInstruction {
                        target: target.to_string(),
                        content: Some(rest.to_string()),
                    },
                    None => Node::ProcessingInstruction {
                        target: content,
                        content: None,
                    },
                }
            }
            Event::Eof => {
                return Err(SvgError::InvalidSvg(format!(
                    "Unexpected end of file inside <{}>",
                    element.name.full_name()
                )));
            }
            _ => continue,
        };
        element.children.push(node);
    }
}

fn element_from_start(start: &BytesStart) -> Result<Element, SvgError> {
    let name_bytes = start.name();
    let name = std::str::from_utf8(name_bytes.as_ref())?;

    let mut element = Element {
        name: QName::parse(name),
        attributes: Vec::new(),
        children: Vec::new(),
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| SvgError::InvalidSvg(format!("Invalid attribute: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?;
        element.attributes.push(Attribute {
            name: QName::parse(key),
            value: value.into_owned(),
        });
    }

    Ok(element)
}
