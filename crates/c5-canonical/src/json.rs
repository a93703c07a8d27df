use serde::Serialize;

use crate::adapter::to_canonical_value;
use crate::canonicalizer::{traverse, CanonicalizationError};
use crate::event::{Event, EventSink, StructuralMarker};
use crate::number::canonical_number_text;
use crate::value::{CanonicalValue, TaggedValue};

/// Indentation settings for pretty output.
///
/// Every line after the first starts with `prefix`, followed by `indent`
/// spaces per nesting level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonFormat {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Text written at the start of every continuation line.
    pub prefix: String,
}

impl JsonFormat {
    /// Creates a format with the given indent width and line prefix.
    pub fn new(indent: usize, prefix: impl Into<String>) -> Self {
        Self {
            indent,
            prefix: prefix.into(),
        }
    }

    /// Two-space indentation without prefix.
    pub fn pretty() -> Self {
        Self::new(2, "")
    }
}

/// Renders a traversal event stream into JSON text.
///
/// Text is pushed to the output callback as it is produced; once the
/// traversal returns, the callback has received the complete document.
/// Without a [`JsonFormat`] the output is compact.
pub struct JsonCollector<W> {
    out: W,
    format: Option<JsonFormat>,
    // One entry per open container: whether a member was already written.
    levels: Vec<bool>,
}

impl<W> JsonCollector<W>
where
    W: FnMut(&str),
{
    /// Creates a collector writing into `out`.
    pub fn new(out: W, format: Option<JsonFormat>) -> Self {
        Self {
            out,
            format,
            levels: Vec::new(),
        }
    }

    /// Returns the output callback.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        (self.out)(text)
    }

    fn newline(&mut self, depth: usize) {
        let Some(format) = &self.format else {
            return;
        };
        let line = format!("\n{}{}", format.prefix, " ".repeat(format.indent * depth));
        self.write(&line);
    }

    fn begin_member(&mut self, attribute: Option<&str>) {
        if let Some(seen) = self.levels.last_mut() {
            let had_sibling = std::mem::replace(seen, true);
            if had_sibling {
                self.write(",");
            }
            self.newline(self.levels.len());
        }
        if let Some(name) = attribute {
            let mut key = String::with_capacity(name.len() + 3);
            write_escaped(name, &mut key);
            key.push(':');
            if self.format.is_some() {
                key.push(' ');
            }
            self.write(&key);
        }
    }

    fn end_container(&mut self, close: &str) {
        let had_members = self.levels.pop().unwrap_or(false);
        if had_members {
            self.newline(self.levels.len());
        }
        self.write(close);
    }
}

impl<W> EventSink for JsonCollector<W>
where
    W: FnMut(&str),
{
    fn append(&mut self, event: &Event<'_>) {
        match event.marker() {
            StructuralMarker::None => {
                if let Some(value) = event.value() {
                    self.begin_member(event.attribute());
                    let mut literal = String::new();
                    write_literal(value, &mut literal);
                    self.write(&literal);
                }
            }
            StructuralMarker::ArrayStart => {
                self.begin_member(event.attribute());
                self.write("[");
                self.levels.push(false);
            }
            StructuralMarker::ObjectStart => {
                self.begin_member(event.attribute());
                self.write("{");
                self.levels.push(false);
            }
            StructuralMarker::ArrayEnd => self.end_container("]"),
            StructuralMarker::ObjectEnd => self.end_container("}"),
        }
    }
}

/// Renders `value` as canonical JSON text.
///
/// ```rust
/// use c5_canonical::{to_json_string, CanonicalValue, JsonFormat};
///
/// let value = CanonicalValue::record([("y", 1i64.into()), ("x", 2i64.into())]);
/// assert_eq!(to_json_string(&value, None)?, r#"{"x":2,"y":1}"#);
/// assert_eq!(
///     to_json_string(&value, Some(&JsonFormat::pretty()))?,
///     "{\n  \"x\": 2,\n  \"y\": 1\n}"
/// );
/// # Ok::<(), c5_canonical::CanonicalizationError>(())
/// ```
pub fn to_json_string(
    value: &CanonicalValue,
    format: Option<&JsonFormat>,
) -> Result<String, CanonicalizationError> {
    let mut out = String::new();
    let mut collector = JsonCollector::new(|chunk: &str| out.push_str(chunk), format.cloned());
    traverse(value, &mut collector)?;
    drop(collector);
    Ok(out)
}

/// Lowers any `Serialize` value and renders it as canonical JSON text.
pub fn to_canonical_json<T>(value: &T, format: Option<&JsonFormat>) -> Result<String, CanonicalizationError>
where
    T: Serialize + ?Sized,
{
    to_json_string(&to_canonical_value(value)?, format)
}

fn write_literal(value: &TaggedValue, out: &mut String) {
    match value {
        TaggedValue::String(s) => write_escaped(s, out),
        TaggedValue::Number(n) => out.push_str(&canonical_number_text(n)),
        TaggedValue::Bool(true) => out.push_str("true"),
        TaggedValue::Bool(false) => out.push_str("false"),
        TaggedValue::Null => out.push_str("null"),
        TaggedValue::Timestamp(ts) => {
            out.push('"');
            out.push_str(&ts.to_rfc3339());
            out.push('"');
        }
    }
}

/// Quotes a string with JSON escaping.
fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
