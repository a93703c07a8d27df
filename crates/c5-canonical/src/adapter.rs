//! Conversion between `serde` values and [`CanonicalValue`] trees.
//!
//! Domain types never reach the traversal directly. They are lowered here,
//! through their `Serialize` implementation, into the closed
//! `Scalar`/`Sequence`/`Record` shape. Field renames declared with
//! `#[serde(rename = "...")]` become the record member names.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::ser::{self, Impossible, Serialize};
use serde_json::Number;

use crate::canonicalizer::{CanonicalizationError, Path, MAX_DEPTH};
use crate::timestamp::{Timestamp, TIMESTAMP_TOKEN};
use crate::value::{CanonicalValue, TaggedValue};

impl ser::Error for CanonicalizationError {
    fn custom<T: Display>(msg: T) -> Self {
        CanonicalizationError::Other(msg.to_string())
    }
}

/// Lowers any `Serialize` value into a [`CanonicalValue`].
///
/// # Errors
///
/// Byte strings, 128-bit integers outside the 64-bit range, non-finite floats
/// and non-string map keys are rejected rather than mis-tagged. Containers
/// nested deeper than [`MAX_DEPTH`] fail before their contents are lowered.
pub fn to_canonical_value<T>(value: &T) -> Result<CanonicalValue, CanonicalizationError>
where
    T: Serialize + ?Sized,
{
    value.serialize(ValueSerializer { path: Path::root() })
}

/// Decodes a canonical value into a typed record.
///
/// Missing `#[serde(default)]` fields take their default; a missing required
/// field or a mistyped member is a [`CanonicalizationError::Decode`].
pub fn from_canonical_value<T>(value: &CanonicalValue) -> Result<T, CanonicalizationError>
where
    T: DeserializeOwned,
{
    let json = serde_json::to_value(value).map_err(|e| CanonicalizationError::Decode(e.to_string()))?;
    serde_json::from_value(json).map_err(|e| CanonicalizationError::Decode(e.to_string()))
}

fn number(value: Number) -> CanonicalValue {
    CanonicalValue::Scalar(TaggedValue::Number(value))
}

struct ValueSerializer {
    path: Path,
}

impl ser::Serializer for ValueSerializer {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeRecord;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(v.into())
    }

    fn serialize_i8(self, v: i8) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(number(v.into()))
    }

    fn serialize_i128(self, v: i128) -> Result<CanonicalValue, CanonicalizationError> {
        if let Ok(v) = i64::try_from(v) {
            return Ok(number(v.into()));
        }
        if let Ok(v) = u64::try_from(v) {
            return Ok(number(v.into()));
        }
        Err(CanonicalizationError::Unsupported {
            path: self.path.to_string(),
            kind: format!("integer {v} outside 64-bit range"),
        })
    }

    fn serialize_u8(self, v: u8) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(number(v.into()))
    }

    fn serialize_u128(self, v: u128) -> Result<CanonicalValue, CanonicalizationError> {
        match u64::try_from(v) {
            Ok(v) => Ok(number(v.into())),
            Err(_) => Err(CanonicalizationError::Unsupported {
                path: self.path.to_string(),
                kind: format!("integer {v} outside 64-bit range"),
            }),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<CanonicalValue, CanonicalizationError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<CanonicalValue, CanonicalizationError> {
        Number::from_f64(v)
            .map(number)
            .ok_or_else(|| CanonicalizationError::NonFiniteNumber(self.path.to_string()))
    }

    fn serialize_char(self, v: char) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(v.to_string().into())
    }

    fn serialize_str(self, v: &str) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(v.into())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<CanonicalValue, CanonicalizationError> {
        Err(CanonicalizationError::Unsupported {
            path: self.path.to_string(),
            kind: "byte string".into(),
        })
    }

    fn serialize_none(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::NULL)
    }

    fn serialize_some<T>(self, value: &T) -> Result<CanonicalValue, CanonicalizationError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::NULL)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::NULL)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(variant.into())
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<CanonicalValue, CanonicalizationError>
    where
        T: ?Sized + Serialize,
    {
        if name != TIMESTAMP_TOKEN {
            return value.serialize(self);
        }
        let path = self.path.clone();
        match value.serialize(self)? {
            CanonicalValue::Scalar(TaggedValue::String(text)) => Timestamp::parse(&text)
                .map(CanonicalValue::from)
                .map_err(|e| CanonicalizationError::Unsupported {
                    path: path.to_string(),
                    kind: e.to_string(),
                }),
            _ => Err(CanonicalizationError::Unsupported {
                path: path.to_string(),
                kind: "timestamp without RFC3339 text".into(),
            }),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<CanonicalValue, CanonicalizationError>
    where
        T: ?Sized + Serialize,
    {
        self.path.check_depth(MAX_DEPTH)?;
        let inner = value.serialize(ValueSerializer {
            path: self.path.push_field(variant),
        })?;
        Ok(CanonicalValue::Record(vec![(variant.to_owned(), inner)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec, CanonicalizationError> {
        self.path.check_depth(MAX_DEPTH)?;
        Ok(SerializeVec {
            path: self.path,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec, CanonicalizationError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeVec, CanonicalizationError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant, CanonicalizationError> {
        self.path.check_depth(MAX_DEPTH)?;
        Ok(SerializeTupleVariant {
            variant,
            inner: SerializeVec {
                path: self.path.push_field(variant),
                items: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeRecord, CanonicalizationError> {
        self.path.check_depth(MAX_DEPTH)?;
        Ok(SerializeRecord {
            path: self.path,
            fields: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeRecord, CanonicalizationError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant, CanonicalizationError> {
        self.path.check_depth(MAX_DEPTH)?;
        Ok(SerializeStructVariant {
            variant,
            inner: SerializeRecord {
                path: self.path.push_field(variant),
                fields: Vec::with_capacity(len),
                next_key: None,
            },
        })
    }
}

struct SerializeVec {
    path: Path,
    items: Vec<CanonicalValue>,
}

impl SerializeVec {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonicalizationError> {
        let item = value.serialize(ValueSerializer {
            path: self.path.push_index(self.items.len()),
        })?;
        self.items.push(item);
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonicalizationError> {
        self.push(value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Sequence(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonicalizationError> {
        self.push(value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Sequence(self.items))
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonicalizationError> {
        self.push(value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Sequence(self.items))
    }
}

struct SerializeTupleVariant {
    variant: &'static str,
    inner: SerializeVec,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonicalizationError> {
        self.inner.push(value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Record(vec![(
            self.variant.to_owned(),
            CanonicalValue::Sequence(self.inner.items),
        )]))
    }
}

struct SerializeRecord {
    path: Path,
    fields: Vec<(String, CanonicalValue)>,
    next_key: Option<String>,
}

impl SerializeRecord {
    fn push<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<(), CanonicalizationError> {
        let value = value.serialize(ValueSerializer {
            path: self.path.push_field(&key),
        })?;
        self.fields.push((key, value));
        Ok(())
    }
}

impl ser::SerializeMap for SerializeRecord {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CanonicalizationError> {
        self.next_key = Some(key.serialize(MapKeySerializer { path: &self.path })?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonicalizationError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| CanonicalizationError::Other("map value without key".into()))?;
        self.push(key, value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Record(self.fields))
    }
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CanonicalizationError> {
        self.push(key.to_owned(), value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Record(self.fields))
    }
}

struct SerializeStructVariant {
    variant: &'static str,
    inner: SerializeRecord,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = CanonicalValue;
    type Error = CanonicalizationError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CanonicalizationError> {
        self.inner.push(key.to_owned(), value)
    }

    fn end(self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Record(vec![(
            self.variant.to_owned(),
            CanonicalValue::Record(self.inner.fields),
        )]))
    }
}

/// Accepts string-like and integer keys, mirroring serde_json's object keys.
struct MapKeySerializer<'p> {
    path: &'p Path,
}

impl MapKeySerializer<'_> {
    fn reject(&self) -> CanonicalizationError {
        CanonicalizationError::NonStringKey(self.path.to_string())
    }
}

impl ser::Serializer for MapKeySerializer<'_> {
    type Ok = String;
    type Error = CanonicalizationError;

    type SerializeSeq = Impossible<String, CanonicalizationError>;
    type SerializeTuple = Impossible<String, CanonicalizationError>;
    type SerializeTupleStruct = Impossible<String, CanonicalizationError>;
    type SerializeTupleVariant = Impossible<String, CanonicalizationError>;
    type SerializeMap = Impossible<String, CanonicalizationError>;
    type SerializeStruct = Impossible<String, CanonicalizationError>;
    type SerializeStructVariant = Impossible<String, CanonicalizationError>;

    fn serialize_bool(self, _v: bool) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_i8(self, v: i8) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_f64(self, _v: f64) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_char(self, v: char) -> Result<String, CanonicalizationError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, CanonicalizationError> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_none(self) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String, CanonicalizationError>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject())
    }

    fn serialize_unit(self) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, CanonicalizationError> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String, CanonicalizationError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, CanonicalizationError>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, CanonicalizationError> {
        Err(self.reject())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, CanonicalizationError> {
        Err(self.reject())
    }
}
