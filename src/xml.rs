//! XML decoding for FogBugz API responses
//!
//! FogBugz answers every command with an XML document rooted at `<response>`.
//! Responses are decoded into a generic `serde_json::Value` tree:
//!
//! - an element holding only text becomes a string (CDATA included)
//! - attributes are merged into the element object as string values
//! - repeated child elements collapse into an array under a single key
//! - text alongside attributes or child elements is kept under `"_"`
//!
//! Because a child appears as a scalar when it occurs once and as an array
//! when it repeats, callers read fields through [`Field`], which names the
//! three shapes explicitly instead of re-checking them at every call site.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which element text is stored when the element also has
/// attributes or children.
pub const TEXT_KEY: &str = "_";

/// Failure to decode a document as XML
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct DecodeError(String);

/// One decoded document: root element name and its value
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: String,
    pub value: Value,
}

#[derive(Default)]
struct Element {
    name: String,
    fields: Map<String, Value>,
    has_children: bool,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> std::result::Result<Self, DecodeError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DecodeError(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| DecodeError(e.to_string()))?
                .into_owned();
            insert_merged(&mut fields, key, Value::String(value));
        }
        Ok(Self {
            name,
            fields,
            has_children: false,
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, value: Value) {
        self.has_children = true;
        insert_merged(&mut self.fields, name, value);
    }

    fn finish(self) -> (String, Value) {
        if self.fields.is_empty() && !self.has_children {
            return (self.name, Value::String(self.text));
        }
        let mut fields = self.fields;
        let text = self.text.trim();
        if !text.is_empty() {
            fields.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(fields))
    }
}

/// Insert a value, turning a repeated key into an array
fn insert_merged(fields: &mut Map<String, Value>, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

/// Decode an XML document.
///
/// Returns `Ok(None)` for a document with no root element (an empty body).
pub fn parse_document(xml: &str) -> std::result::Result<Option<Document>, DecodeError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut document: Option<Document> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DecodeError(format!("{} at position {}", e, reader.buffer_position())))?;
        match event {
            Event::Start(start) => {
                if stack.is_empty() && document.is_some() {
                    return Err(DecodeError("Multiple root elements".to_string()));
                }
                stack.push(Element::open(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                close(&mut stack, &mut document, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DecodeError("Unexpected closing tag".to_string()))?;
                close(&mut stack, &mut document, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| DecodeError(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw))?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DecodeError(format!("Unclosed element <{}>", open.name)));
    }
    Ok(document)
}

fn close(
    stack: &mut Vec<Element>,
    document: &mut Option<Document>,
    element: Element,
) -> std::result::Result<(), DecodeError> {
    let (name, value) = element.finish();
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None => {
            if document.is_some() {
                return Err(DecodeError("Multiple root elements".to_string()));
            }
            *document = Some(Document { root: name, value });
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> std::result::Result<(), DecodeError> {
    match stack.last_mut() {
        Some(open) => {
            open.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(DecodeError("Text data outside of root node".to_string())),
    }
}

/// Shape of a decoded field.
///
/// The XML decoder cannot know whether an element is meant to repeat, so a
/// field is either missing, a single value, or an array of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Absent,
    Scalar(&'a Value),
    Repeated(&'a [Value]),
}

impl<'a> Field<'a> {
    /// Look up `key` on an object value (non-objects yield `Absent`)
    pub fn of(parent: &'a Value, key: &str) -> Self {
        Self::from_option(parent.get(key))
    }

    pub fn from_option(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Field::Absent,
            Some(Value::Array(items)) => Field::Repeated(items),
            Some(value) => Field::Scalar(value),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// First value regardless of shape
    pub fn first(self) -> Option<&'a Value> {
        match self {
            Field::Absent => None,
            Field::Scalar(value) => Some(value),
            Field::Repeated(items) => items.first(),
        }
    }

    /// All values regardless of shape
    pub fn items(self) -> Vec<&'a Value> {
        match self {
            Field::Absent => Vec::new(),
            Field::Scalar(value) => vec![value],
            Field::Repeated(items) => items.iter().collect(),
        }
    }
}

/// Follow `path` through nested containers and return the list at the end.
///
/// `list_at(resp, &["cases", "case"])` yields every `<case>` under `<cases>`
/// whether there were zero, one, or many of them. Empty text nodes (an empty
/// `<cases></cases>` decodes to `""`) never count as entries.
pub fn list_at<'a>(root: &'a Value, path: &[&str]) -> Vec<&'a Value> {
    let Some((last, parents)) = path.split_last() else {
        return Vec::new();
    };
    let mut current = root;
    for key in parents {
        match Field::of(current, key).first() {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    Field::of(current, last)
        .items()
        .into_iter()
        .filter(|value| !matches!(value, Value::String(s) if s.is_empty()))
        .collect()
}

/// Same as [`list_at`] but cloned into owned values
pub fn owned_list_at(root: &Value, path: &[&str]) -> Vec<Value> {
    list_at(root, path).into_iter().cloned().collect()
}
