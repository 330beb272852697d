//! XML rendering of the envelope's logical tree.
//!
//! The envelope is first turned into a [`serde_json::Value`] and then walked:
//! - scalar fields become attributes, in declaration order
//! - a string field named `value` becomes the element's text content
//! - object fields become child elements named after the field
//! - array fields become one child element per item, all named after the field
//!
//! Shapes without an XML counterpart (arrays of arrays, a non-object root)
//! are reported as [`XmlError::UnsupportedShape`].

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};

/// Indentation width of rendered documents.
const INDENT: usize = 4;

/// Key whose string value is rendered as text content.
const TEXT_KEY: &str = "value";

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("cannot convert payload to a tree: {0}")]
    Tree(#[from] serde_json::Error),

    #[error("unsupported shape at `{path}`: {reason}")]
    UnsupportedShape { path: String, reason: &'static str },

    #[error("failed to write element: {0}")]
    Write(String),
}

/// Render `value` as an indented document under a `root` element.
pub fn to_xml_indented<T: serde::Serialize>(
    root: &str,
    xmlns: Option<&str>,
    value: &T,
) -> Result<Vec<u8>, XmlError> {
    let tree = serde_json::to_value(value)?;
    let Value::Object(fields) = &tree else {
        return Err(XmlError::UnsupportedShape {
            path: root.to_string(),
            reason: "root must be an object",
        });
    };

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
    let mut start = BytesStart::new(root);
    if let Some(ns) = xmlns {
        start.push_attribute(("xmlns", ns));
    }
    write_element(&mut writer, start, root, fields, root)?;
    Ok(writer.into_inner())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    mut start: BytesStart<'_>,
    name: &str,
    fields: &Map<String, Value>,
    path: &str,
) -> Result<(), XmlError> {
    let mut text = None;
    let mut children = Vec::new();

    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Bool(b) => {
                start.push_attribute((key.as_str(), if *b { "true" } else { "false" }))
            }
            Value::Number(n) => start.push_attribute((key.as_str(), n.to_string().as_str())),
            Value::String(s) if key == TEXT_KEY => text = Some(s.as_str()),
            Value::String(s) => start.push_attribute((key.as_str(), s.as_str())),
            Value::Object(_) | Value::Array(_) => children.push((key.as_str(), value)),
        }
    }

    if children.is_empty() && text.is_none() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    if let Some(text) = text {
        write_event(writer, Event::Text(BytesText::new(text)))?;
    }
    for (key, value) in children {
        let child_path = format!("{path}.{key}");
        match value {
            Value::Object(child) => {
                write_element(writer, BytesStart::new(key), key, child, &child_path)?
            }
            Value::Array(items) => write_items(writer, key, items, &child_path)?,
            _ => {}
        }
    }
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_items(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    items: &[Value],
    path: &str,
) -> Result<(), XmlError> {
    for item in items {
        match item {
            Value::Object(fields) => {
                write_element(writer, BytesStart::new(name), name, fields, path)?
            }
            Value::Array(_) => {
                return Err(XmlError::UnsupportedShape {
                    path: path.to_string(),
                    reason: "nested arrays have no element form",
                });
            }
            Value::Null => {}
            scalar => {
                let text = match scalar {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                write_event(writer, Event::Start(BytesStart::new(name)))?;
                write_event(writer, Event::Text(BytesText::new(&text)))?;
                write_event(writer, Event::End(BytesEnd::new(name)))?;
            }
        }
    }
    Ok(())
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}
