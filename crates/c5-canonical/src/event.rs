use crate::value::TaggedValue;

/// Container entry/exit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralMarker {
    /// Leaf event.
    None,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `{`
    ObjectStart,
    /// `}`
    ObjectEnd,
}

impl StructuralMarker {
    /// Whether the marker opens a container.
    pub fn is_start(self) -> bool {
        matches!(self, StructuralMarker::ArrayStart | StructuralMarker::ObjectStart)
    }

    /// Whether the marker closes a container.
    pub fn is_end(self) -> bool {
        matches!(self, StructuralMarker::ArrayEnd | StructuralMarker::ObjectEnd)
    }
}

/// One step of a canonical traversal.
///
/// A leaf event carries a value and `StructuralMarker::None`; a structural
/// event carries a marker and no value. Either may carry the record field
/// name it belongs to. Events borrow from the traversed value and live only
/// for the duration of one `append` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event<'a> {
    attribute: Option<&'a str>,
    value: Option<&'a TaggedValue>,
    marker: StructuralMarker,
}

impl<'a> Event<'a> {
    /// Leaf event.
    pub fn leaf(attribute: Option<&'a str>, value: &'a TaggedValue) -> Self {
        Self {
            attribute,
            value: Some(value),
            marker: StructuralMarker::None,
        }
    }

    /// Structural event; `None` for `StructuralMarker::None`, which only leaf
    /// events carry.
    pub fn structural(attribute: Option<&'a str>, marker: StructuralMarker) -> Option<Self> {
        if marker == StructuralMarker::None {
            return None;
        }
        Some(Self {
            attribute,
            value: None,
            marker,
        })
    }

    /// Field name, when the event belongs to a record member.
    pub fn attribute(&self) -> Option<&'a str> {
        self.attribute
    }

    /// Leaf value, for leaf events.
    pub fn value(&self) -> Option<&'a TaggedValue> {
        self.value
    }

    /// Structural marker.
    pub fn marker(&self) -> StructuralMarker {
        self.marker
    }
}

/// Single-method consumer of traversal events.
pub trait EventSink {
    /// Consumes one event.
    fn append(&mut self, event: &Event<'_>);
}

impl<F> EventSink for F
where
    F: FnMut(&Event<'_>),
{
    fn append(&mut self, event: &Event<'_>) {
        self(event)
    }
}

/// Forwards every event to several sinks, in registration order.
///
/// ```rust
/// use c5_canonical::{traverse, CanonicalValue, EventSink, HashCollector, JsonCollector, Multiplex};
///
/// let value = CanonicalValue::record([("y", 1i64.into()), ("x", 2i64.into())]);
/// let mut json = String::new();
/// let mut text = JsonCollector::new(|chunk: &str| json.push_str(chunk), None);
/// let mut hash = HashCollector::new();
/// traverse(&value, &mut Multiplex::new(vec![&mut text as &mut dyn EventSink, &mut hash]))?;
/// drop(text);
/// assert_eq!(json, r#"{"x":2,"y":1}"#);
/// assert!(!hash.digest().as_str().is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Multiplex<'s> {
    sinks: Vec<&'s mut dyn EventSink>,
}

impl<'s> Multiplex<'s> {
    /// Wraps the given sinks.
    pub fn new(sinks: Vec<&'s mut dyn EventSink>) -> Self {
        Self { sinks }
    }

    /// Adds one more downstream sink.
    pub fn push(&mut self, sink: &'s mut dyn EventSink) {
        self.sinks.push(sink);
    }
}

impl EventSink for Multiplex<'_> {
    fn append(&mut self, event: &Event<'_>) {
        for sink in self.sinks.iter_mut() {
            sink.append(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_uphold_shape() {
        let leaf_value = TaggedValue::Bool(true);
        let leaf = Event::leaf(Some("x"), &leaf_value);
        assert_eq!(leaf.marker(), StructuralMarker::None);
        assert_eq!(leaf.value(), Some(&leaf_value));
        assert_eq!(leaf.attribute(), Some("x"));

        let start = Event::structural(None, StructuralMarker::ObjectStart).unwrap();
        assert!(start.value().is_none());
        assert!(start.marker().is_start());
        assert!(StructuralMarker::ArrayEnd.is_end());
    }

    #[test]
    fn structural_rejects_leaf_marker() {
        assert!(Event::structural(Some("x"), StructuralMarker::None).is_none());
        assert!(Event::structural(None, StructuralMarker::ArrayEnd).is_some());
    }

    #[test]
    fn multiplex_forwards_in_order() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        {
            let mut a = |e: &Event<'_>| first.push(e.marker());
            let mut b = |e: &Event<'_>| second.push(e.marker());
            let mut mux = Multiplex::new(vec![&mut a as &mut dyn EventSink]);
            mux.push(&mut b);
            for marker in [StructuralMarker::ArrayStart, StructuralMarker::ArrayEnd] {
                mux.append(&Event::structural(None, marker).unwrap());
            }
        }
        let expected = vec![StructuralMarker::ArrayStart, StructuralMarker::ArrayEnd];
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }
}
