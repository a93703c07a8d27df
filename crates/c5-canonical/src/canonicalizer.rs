use serde::Serialize;

use crate::adapter::to_canonical_value;
use crate::event::{Event, EventSink, StructuralMarker};
use crate::value::CanonicalValue;
use std::fmt;

/// Default nesting limit for arrays and records.
pub const MAX_DEPTH: usize = 128;

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// A leaf kind with no canonical representation (byte strings, 128-bit integers).
    #[error("unsupported value at {path}: {kind}")]
    Unsupported {
        /// Location of the offending value.
        path: String,
        /// What was rejected.
        kind: String,
    },
    /// Non-finite number (NaN/Infinity) detected.
    #[error("non-finite number detected at {0}")]
    NonFiniteNumber(String),
    /// Map key that is not a string, character or integer.
    #[error("map key must be a string at {0}")]
    NonStringKey(String),
    /// A duplicate record member was detected.
    #[error("duplicate key detected at {0}")]
    DuplicateKey(String),
    /// Nesting exceeds the configured limit; also the guard against cyclic input.
    #[error("nesting deeper than {limit} at {path}")]
    DepthExceeded {
        /// Location where the limit was crossed.
        path: String,
        /// Configured limit.
        limit: usize,
    },
    /// Converting a canonical value into a typed record failed.
    #[error("decode failed: {0}")]
    Decode(String),
    /// Custom error raised by a `Serialize` implementation.
    #[error("other error: {0}")]
    Other(String),
}

/// Helper for building value paths during validation.
#[derive(Debug, Clone)]
pub(crate) struct Path {
    segments: Vec<String>,
}

impl Path {
    pub(crate) fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub(crate) fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    pub(crate) fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }

    fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Fails when a container opened at this path would exceed `limit`.
    pub(crate) fn check_depth(&self, limit: usize) -> Result<(), CanonicalizationError> {
        if self.depth() >= limit {
            return Err(CanonicalizationError::DepthExceeded {
                path: self.to_string(),
                limit,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Walks canonical values and emits sorted, typed events.
///
/// Traversal is two-phase: a validation pass rejects duplicate record keys and
/// excessive nesting, and only then are events emitted. A sink therefore
/// never observes a partial stream.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    max_depth: usize,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Canonicalizer {
    /// Creates a canonicalizer with the default [`MAX_DEPTH`].
    pub fn new() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }

    /// Overrides the nesting limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Emits the canonical event stream for `value` into `sink`.
    ///
    /// Records emit their members sorted byte-wise by name, and each member's
    /// first event carries the name as its attribute. Sequences keep their
    /// element order.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] before emitting anything if the value
    /// holds duplicate keys or nests deeper than the limit.
    pub fn traverse<S>(&self, value: &CanonicalValue, sink: &mut S) -> Result<(), CanonicalizationError>
    where
        S: EventSink + ?Sized,
    {
        self.validate(value)?;
        emit(value, None, sink);
        Ok(())
    }

    /// Converts a `Serialize` value at the boundary, then traverses it.
    pub fn traverse_serialize<T, S>(&self, value: &T, sink: &mut S) -> Result<(), CanonicalizationError>
    where
        T: Serialize + ?Sized,
        S: EventSink + ?Sized,
    {
        let value = to_canonical_value(value)?;
        self.traverse(&value, sink)
    }

    /// Checks that `value` can be traversed: no duplicate record keys and no
    /// nesting beyond the limit. [`Canonicalizer::traverse`] runs this first.
    pub fn validate(&self, value: &CanonicalValue) -> Result<(), CanonicalizationError> {
        self.validate_at(value, Path::root())
    }

    fn validate_at(&self, value: &CanonicalValue, path: Path) -> Result<(), CanonicalizationError> {
        match value {
            CanonicalValue::Scalar(_) => Ok(()),
            CanonicalValue::Sequence(items) => {
                path.check_depth(self.max_depth)?;
                for (idx, item) in items.iter().enumerate() {
                    self.validate_at(item, path.push_index(idx))?;
                }
                Ok(())
            }
            CanonicalValue::Record(fields) => {
                path.check_depth(self.max_depth)?;
                let mut names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
                names.sort_unstable();
                if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
                    return Err(CanonicalizationError::DuplicateKey(
                        path.push_field(pair[0]).to_string(),
                    ));
                }
                for (name, child) in fields {
                    self.validate_at(child, path.push_field(name))?;
                }
                Ok(())
            }
        }
    }
}

/// Traverses `value` with the default [`Canonicalizer`].
pub fn traverse<S>(value: &CanonicalValue, sink: &mut S) -> Result<(), CanonicalizationError>
where
    S: EventSink + ?Sized,
{
    Canonicalizer::new().traverse(value, sink)
}

/// Converts and traverses any `Serialize` value with the default [`Canonicalizer`].
pub fn traverse_serialize<T, S>(value: &T, sink: &mut S) -> Result<(), CanonicalizationError>
where
    T: Serialize + ?Sized,
    S: EventSink + ?Sized,
{
    Canonicalizer::new().traverse_serialize(value, sink)
}

fn emit<'a, S>(value: &'a CanonicalValue, attribute: Option<&'a str>, sink: &mut S)
where
    S: EventSink + ?Sized,
{
    match value {
        CanonicalValue::Scalar(leaf) => sink.append(&Event::leaf(attribute, leaf)),
        CanonicalValue::Sequence(items) => {
            mark(sink, attribute, StructuralMarker::ArrayStart);
            for item in items {
                emit(item, None, sink);
            }
            mark(sink, None, StructuralMarker::ArrayEnd);
        }
        CanonicalValue::Record(fields) => {
            mark(sink, attribute, StructuralMarker::ObjectStart);
            let mut sorted: Vec<&(String, CanonicalValue)> = fields.iter().collect();
            // str ordering is byte-wise, i.e. Unicode code point order.
            sorted.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            for (name, child) in sorted {
                emit(child, Some(name.as_str()), sink);
            }
            mark(sink, None, StructuralMarker::ObjectEnd);
        }
    }
}

fn mark<S>(sink: &mut S, attribute: Option<&str>, marker: StructuralMarker)
where
    S: EventSink + ?Sized,
{
    if let Some(event) = Event::structural(attribute, marker) {
        sink.append(&event);
    }
}
