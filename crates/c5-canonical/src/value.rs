use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

use crate::number::canonical_number_text;
use crate::timestamp::Timestamp;

/// Kind tag of a leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// UTF-8 text.
    String,
    /// Finite JSON number.
    Number,
    /// `true` or `false`.
    Bool,
    /// Absent value.
    Null,
    /// Millisecond-precision UTC instant.
    Timestamp,
}

/// A typed leaf.
///
/// Keeping the kind next to the raw value lets each collector render and hash
/// it correctly: timestamps get their fixed RFC3339 text, strings are quoted
/// only in JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    /// UTF-8 text.
    String(String),
    /// Finite number; both collectors print it with [`canonical_number_text`].
    Number(Number),
    /// Boolean.
    Bool(bool),
    /// Null.
    Null,
    /// Timestamp.
    Timestamp(Timestamp),
}

impl TaggedValue {
    /// Kind tag of this leaf.
    pub fn kind(&self) -> ValueKind {
        match self {
            TaggedValue::String(_) => ValueKind::String,
            TaggedValue::Number(_) => ValueKind::Number,
            TaggedValue::Bool(_) => ValueKind::Bool,
            TaggedValue::Null => ValueKind::Null,
            TaggedValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Unquoted, unescaped text form used for hashing.
    ///
    /// `Null` has no text form.
    pub fn canonical_text(&self) -> Option<Cow<'_, str>> {
        match self {
            TaggedValue::String(s) => Some(Cow::Borrowed(s)),
            TaggedValue::Number(n) => Some(Cow::Owned(canonical_number_text(n))),
            TaggedValue::Bool(true) => Some(Cow::Borrowed("true")),
            TaggedValue::Bool(false) => Some(Cow::Borrowed("false")),
            TaggedValue::Null => None,
            TaggedValue::Timestamp(ts) => Some(Cow::Owned(ts.to_rfc3339())),
        }
    }
}

/// Closed value tree every domain value is converted into before traversal.
///
/// Records keep their declared field order; ordering is applied by the
/// traversal, never by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// A leaf.
    Scalar(TaggedValue),
    /// Ordered sequence; element order is significant.
    Sequence(Vec<CanonicalValue>),
    /// Keyed record as `(name, value)` pairs in declaration order.
    Record(Vec<(String, CanonicalValue)>),
}

impl Default for CanonicalValue {
    fn default() -> Self {
        CanonicalValue::NULL
    }
}

impl CanonicalValue {
    /// The null leaf.
    pub const NULL: CanonicalValue = CanonicalValue::Scalar(TaggedValue::Null);

    /// Builds a record from `(name, value)` pairs.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, CanonicalValue)>,
    {
        CanonicalValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a sequence.
    pub fn sequence<I: IntoIterator<Item = CanonicalValue>>(items: I) -> Self {
        CanonicalValue::Sequence(items.into_iter().collect())
    }

    /// Leaf view.
    pub fn as_scalar(&self) -> Option<&TaggedValue> {
        match self {
            CanonicalValue::Scalar(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Looks up a record field by name.
    pub fn get(&self, name: &str) -> Option<&CanonicalValue> {
        match self {
            CanonicalValue::Record(fields) => {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Whether this is a null leaf.
    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Scalar(TaggedValue::Null))
    }
}

impl From<TaggedValue> for CanonicalValue {
    fn from(value: TaggedValue) -> Self {
        CanonicalValue::Scalar(value)
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        CanonicalValue::Scalar(TaggedValue::String(value.to_owned()))
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        CanonicalValue::Scalar(TaggedValue::String(value))
    }
}

impl From<bool> for CanonicalValue {
    fn from(value: bool) -> Self {
        CanonicalValue::Scalar(TaggedValue::Bool(value))
    }
}

impl From<i64> for CanonicalValue {
    fn from(value: i64) -> Self {
        CanonicalValue::Scalar(TaggedValue::Number(value.into()))
    }
}

impl From<u64> for CanonicalValue {
    fn from(value: u64) -> Self {
        CanonicalValue::Scalar(TaggedValue::Number(value.into()))
    }
}

impl From<Timestamp> for CanonicalValue {
    fn from(value: Timestamp) -> Self {
        CanonicalValue::Scalar(TaggedValue::Timestamp(value))
    }
}

impl From<Vec<CanonicalValue>> for CanonicalValue {
    fn from(value: Vec<CanonicalValue>) -> Self {
        CanonicalValue::Sequence(value)
    }
}

impl From<serde_json::Value> for CanonicalValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => CanonicalValue::NULL,
            Value::Bool(b) => b.into(),
            Value::Number(n) => CanonicalValue::Scalar(TaggedValue::Number(n)),
            Value::String(s) => s.into(),
            Value::Array(items) => {
                CanonicalValue::Sequence(items.into_iter().map(CanonicalValue::from).collect())
            }
            Value::Object(map) => {
                CanonicalValue::Record(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl Serialize for TaggedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TaggedValue::String(s) => serializer.serialize_str(s),
            TaggedValue::Number(n) => n.serialize(serializer),
            TaggedValue::Bool(b) => serializer.serialize_bool(*b),
            TaggedValue::Null => serializer.serialize_unit(),
            TaggedValue::Timestamp(ts) => ts.serialize(serializer),
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Scalar(leaf) => leaf.serialize(serializer),
            CanonicalValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            CanonicalValue::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for CanonicalValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CanonicalValueVisitor)
    }
}

struct CanonicalValueVisitor;

impl<'de> Visitor<'de> for CanonicalValueVisitor {
    type Value = CanonicalValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON-compatible value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<CanonicalValue, E> {
        Ok(v.into())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CanonicalValue, E> {
        Ok(v.into())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CanonicalValue, E> {
        Ok(v.into())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CanonicalValue, E> {
        Number::from_f64(v)
            .map(|n| CanonicalValue::Scalar(TaggedValue::Number(n)))
            .ok_or_else(|| E::custom(format!("non-finite number {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CanonicalValue, E> {
        Ok(v.into())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<CanonicalValue, E> {
        Ok(v.into())
    }

    fn visit_unit<E: de::Error>(self) -> Result<CanonicalValue, E> {
        Ok(CanonicalValue::NULL)
    }

    fn visit_none<E: de::Error>(self) -> Result<CanonicalValue, E> {
        Ok(CanonicalValue::NULL)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<CanonicalValue, D::Error> {
        CanonicalValue::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<CanonicalValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(CanonicalValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CanonicalValue, A::Error> {
        let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let mut seen = HashSet::new();
        while let Some((name, value)) = map.next_entry::<String, CanonicalValue>()? {
            if !seen.insert(name.clone()) {
                return Err(de::Error::custom(format!("duplicate key `{name}`")));
            }
            fields.push((name, value));
        }
        Ok(CanonicalValue::Record(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_text_per_kind() {
        assert_eq!(TaggedValue::String("a\"b".into()).canonical_text().unwrap(), "a\"b");
        assert_eq!(TaggedValue::Number(78.into()).canonical_text().unwrap(), "78");
        assert_eq!(TaggedValue::Bool(false).canonical_text().unwrap(), "false");
        assert_eq!(TaggedValue::Null.canonical_text(), None);
        let ts = Timestamp::from_millis(444).unwrap();
        assert_eq!(
            TaggedValue::Timestamp(ts).canonical_text().unwrap(),
            "1970-01-01T00:00:00.444Z"
        );
    }

    #[test]
    fn from_json_value_preserves_shape() {
        let value = CanonicalValue::from(json!({"a": [1, "x", null], "b": {}}));
        assert_eq!(
            value.get("a"),
            Some(&CanonicalValue::sequence([1i64.into(), "x".into(), CanonicalValue::NULL]))
        );
        assert_eq!(value.get("b"), Some(&CanonicalValue::Record(vec![])));
        assert!(value.get("c").is_none());
    }

    #[test]
    fn deserializes_from_json_text() {
        let value: CanonicalValue = serde_json::from_str(r#"{"y":4,"z":[true,1.5]}"#).unwrap();
        assert_eq!(
            value,
            CanonicalValue::record([
                ("y", 4u64.into()),
                (
                    "z",
                    CanonicalValue::sequence([
                        true.into(),
                        CanonicalValue::Scalar(TaggedValue::Number(Number::from_f64(1.5).unwrap()))
                    ])
                ),
            ])
        );
    }

    #[test]
    fn deserialize_rejects_duplicate_keys() {
        let err = serde_json::from_str::<CanonicalValue>(r#"{"a":1,"b":{"c":1,"c":2}}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate key `c`"));
    }

    #[test]
    fn integral_float_hashes_like_integer() {
        let float = TaggedValue::Number(Number::from_f64(2.0).unwrap());
        assert_eq!(float.canonical_text().unwrap(), "2");
    }

    #[test]
    fn default_is_null() {
        assert!(CanonicalValue::default().is_null());
        assert_eq!(CanonicalValue::from(TaggedValue::Null), CanonicalValue::NULL);
    }
}
