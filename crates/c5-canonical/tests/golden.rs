use c5_canonical::{
    digest_of, digest_of_serialize, to_canonical_json, to_canonical_value, traverse,
    traverse_serialize, CanonicalValue, Event, HashCollector, HashWriter, JsonFormat,
    StructuralMarker, TaggedValue, Timestamp,
};
use serde::Serialize;
use sha2::{Digest as _, Sha256};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, PartialEq)]
enum Seen {
    Leaf(Option<String>, TaggedValue),
    Mark(Option<String>, StructuralMarker),
}

fn events_of<T: Serialize>(value: &T) -> Vec<Seen> {
    let mut seen = Vec::new();
    traverse_serialize(value, &mut |e: &Event<'_>| {
        let attr = e.attribute().map(str::to_owned);
        seen.push(match e.value() {
            Some(v) => Seen::Leaf(attr, v.clone()),
            None => Seen::Mark(attr, e.marker()),
        });
    })
    .unwrap();
    seen
}

fn num(n: i64) -> TaggedValue {
    TaggedValue::Number(n.into())
}

fn ts444() -> Timestamp {
    Timestamp::from_millis(444).unwrap()
}

fn compact<T: Serialize>(value: &T) -> String {
    to_canonical_json(value, None).unwrap()
}

fn indented<T: Serialize>(value: &T) -> String {
    to_canonical_json(value, Some(&JsonFormat::pretty())).unwrap()
}

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct YZ {
    y: i64,
    z: String,
}

#[derive(Serialize)]
struct Nested {
    x: YZ,
    y: Empty,
    z: Vec<i64>,
}

fn nested() -> Nested {
    Nested {
        x: YZ { y: 1, z: "x".into() },
        y: Empty {},
        z: vec![],
    }
}

#[derive(Serialize)]
struct RZ {
    r: i64,
    z: String,
}

#[derive(Serialize)]
struct WithDate {
    x: RZ,
    y: Empty,
    z: Vec<i64>,
    date: Timestamp,
}

#[test]
fn scalars_emit_one_leaf() {
    assert_eq!(events_of(&"string"), vec![Seen::Leaf(None, TaggedValue::String("string".into()))]);
    assert_eq!(events_of(&78), vec![Seen::Leaf(None, num(78))]);
    assert_eq!(events_of(&true), vec![Seen::Leaf(None, TaggedValue::Bool(true))]);
    assert_eq!(events_of(&ts444()), vec![Seen::Leaf(None, TaggedValue::Timestamp(ts444()))]);
}

#[test]
fn empty_array_is_start_then_end() {
    let empty: Vec<i64> = vec![];
    assert_eq!(
        events_of(&empty),
        vec![
            Seen::Mark(None, StructuralMarker::ArrayStart),
            Seen::Mark(None, StructuralMarker::ArrayEnd),
        ]
    );
}

#[test]
fn nested_arrays_keep_order() {
    let value = vec![vec![1, 2], vec![3, 4]];
    assert_eq!(
        events_of(&value),
        vec![
            Seen::Mark(None, StructuralMarker::ArrayStart),
            Seen::Mark(None, StructuralMarker::ArrayStart),
            Seen::Leaf(None, num(1)),
            Seen::Leaf(None, num(2)),
            Seen::Mark(None, StructuralMarker::ArrayEnd),
            Seen::Mark(None, StructuralMarker::ArrayStart),
            Seen::Leaf(None, num(3)),
            Seen::Leaf(None, num(4)),
            Seen::Mark(None, StructuralMarker::ArrayEnd),
            Seen::Mark(None, StructuralMarker::ArrayEnd),
        ]
    );
}

#[test]
fn empty_object_is_start_then_end() {
    assert_eq!(
        events_of(&Empty {}),
        vec![
            Seen::Mark(None, StructuralMarker::ObjectStart),
            Seen::Mark(None, StructuralMarker::ObjectEnd),
        ]
    );
}

#[test]
fn record_fields_are_sorted_by_alias() {
    #[derive(Serialize)]
    struct YX {
        #[serde(rename = "y")]
        big_y: i64,
        #[serde(rename = "x")]
        big_x: i64,
    }
    let value = YX { big_y: 1, big_x: 2 };
    assert_eq!(
        events_of(&value),
        vec![
            Seen::Mark(None, StructuralMarker::ObjectStart),
            Seen::Leaf(Some("x".into()), num(2)),
            Seen::Leaf(Some("y".into()), num(1)),
            Seen::Mark(None, StructuralMarker::ObjectEnd),
        ]
    );
    assert_eq!(compact(&value), r#"{"x":2,"y":1}"#);
}

#[test]
fn json_empty_containers() {
    let empty: Vec<i64> = vec![];
    assert_eq!(compact(&Empty {}), "{}");
    assert_eq!(compact(&empty), "[]");
    assert_eq!(indented(&Empty {}), "{}");
    assert_eq!(indented(&empty), "[]");
}

#[test]
fn json_compact_nested() {
    assert_eq!(compact(&nested()), r#"{"x":{"y":1,"z":"x"},"y":{},"z":[]}"#);
    assert_eq!(compact(&vec!["xx"]), r#"["xx"]"#);
    let mixed = CanonicalValue::sequence([
        1i64.into(),
        CanonicalValue::sequence(["2".into(), "A".into()]),
        "E".into(),
    ]);
    assert_eq!(compact(&mixed), r#"[1,["2","A"],"E"]"#);
}

#[test]
fn json_indented_nested() {
    assert_eq!(
        indented(&nested()),
        "{\n  \"x\": {\n    \"y\": 1,\n    \"z\": \"x\"\n  },\n  \"y\": {},\n  \"z\": []\n}"
    );
    assert_eq!(indented(&vec!["xx"]), "[\n  \"xx\"\n]");
    let mixed = CanonicalValue::sequence([1i64.into(), "2".into()]);
    assert_eq!(indented(&mixed), "[\n  1,\n  \"2\"\n]");
}

#[test]
fn json_timestamps_render_rfc3339_millis() {
    let value = CanonicalValue::sequence([1i64.into(), ts444().into()]);
    assert_eq!(compact(&value), r#"[1,"1970-01-01T00:00:00.444Z"]"#);
}

#[test]
fn json_indented_matches_generic_pretty_printer() {
    let text = compact(&nested());
    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(indented(&nested()), serde_json::to_string_pretty(&reparsed).unwrap());
}

#[test]
fn hash_of_bare_timestamp_is_pinned() {
    let digest = digest_of(&ts444().into()).unwrap();
    assert_eq!(digest.as_str(), "DzYqv3YaniBJWwqrNBn4534oTe4nL14TqcfVCguf9Yyv");
}

#[test]
fn hash_uses_declared_field_names() {
    #[derive(Serialize)]
    #[allow(non_snake_case)]
    struct Upper {
        X: i64,
        Y: i64,
    }
    let digest = digest_of_serialize(&Upper { X: 1, Y: 2 }).unwrap();
    assert_eq!(digest.as_str(), "DkPs9C3fYabdDLFxqMh4ZoTNr3xD1xYGFvYnJioF7V6H");
}

#[test]
fn hash_of_nested_record_is_pinned() {
    #[derive(Serialize)]
    struct WithD {
        x: YZ,
        y: Empty,
        z: Vec<i64>,
        d: Timestamp,
    }
    let value = WithD {
        x: YZ { y: 1, z: "x".into() },
        y: Empty {},
        z: vec![],
        d: ts444(),
    };
    let digest = digest_of_serialize(&value).unwrap();
    assert_eq!(digest.as_str(), "5PvJAWGkaKAHax6tsaKGfPYm6JfXxZs15wRTDpSKaZ2G");
}

#[test]
fn hash_of_kind_data_is_pinned() {
    #[derive(Serialize)]
    struct NameDate {
        name: String,
        date: String,
    }
    #[derive(Serialize)]
    struct KindData {
        kind: String,
        data: NameDate,
    }
    let value = KindData {
        kind: "test".into(),
        data: NameDate {
            name: "object".into(),
            date: "2021-05-20".into(),
        },
    };
    let digest = digest_of_serialize(&value).unwrap();
    assert_eq!(digest.as_str(), "5zWhdtvKuGob1FbW9vUGPQKobcLtYYr5wU8AxQRVraeB");
}

#[test]
fn hash_changes_with_values() {
    let a = digest_of(&CanonicalValue::record([("y", 1i64.into())])).unwrap();
    let b = digest_of(&CanonicalValue::record([("y", 2i64.into())])).unwrap();
    assert_ne!(a, b);
}

#[test]
fn hash_ignores_declaration_order() {
    #[derive(Serialize)]
    struct DateFirst {
        date: Timestamp,
        x: RZ,
        y: Empty,
        z: Vec<i64>,
    }
    let first = WithDate {
        x: RZ { r: 1, z: "x".into() },
        y: Empty {},
        z: vec![],
        date: ts444(),
    };
    let second = DateFirst {
        date: ts444(),
        x: RZ { r: 1, z: "x".into() },
        y: Empty {},
        z: vec![],
    };
    assert_eq!(
        digest_of_serialize(&first).unwrap(),
        digest_of_serialize(&second).unwrap()
    );
}

/// SHA-256 that also records every chunk it is fed.
#[derive(Default)]
struct Spy {
    writes: Rc<RefCell<Vec<String>>>,
    inner: Sha256,
}

impl HashWriter for Spy {
    fn write(&mut self, bytes: &[u8]) {
        self.writes
            .borrow_mut()
            .push(String::from_utf8(bytes.to_vec()).unwrap());
        self.inner.update(bytes);
    }

    fn finish(self) -> Vec<u8> {
        self.inner.finalize().to_vec()
    }
}

#[test]
fn hash_feeds_attributes_and_leaf_text_in_order() {
    let value = WithDate {
        x: RZ { r: 1, z: "u".into() },
        y: Empty {},
        z: vec![],
        date: ts444(),
    };
    let canonical = to_canonical_value(&value).unwrap();

    let spy = Spy::default();
    let writes = Rc::clone(&spy.writes);
    let mut collector = HashCollector::with_hasher(spy);
    traverse(&canonical, &mut collector).unwrap();
    let digest = collector.digest();

    assert_eq!(
        *writes.borrow(),
        vec!["date", "1970-01-01T00:00:00.444Z", "x", "r", "1", "z", "u", "y", "z"]
    );
    assert_eq!(digest.as_str(), "CwEMjUHV6BpDS7AGBAYqjY6qMKE6xC8Z56H5T2ZuUuXe");
    assert_eq!(digest, digest_of(&canonical).unwrap());
}

#[test]
fn integral_floats_render_and_hash_like_integers() {
    assert_eq!(compact(&2.0f64), "2");
    assert_eq!(compact(&2i64), "2");
    assert_eq!(compact(&1e20f64), "100000000000000000000");
    assert_eq!(compact(&0.5f64), "0.5");
    assert_eq!(compact(&vec![1.0f64, -0.25, 1e21]), "[1,-0.25,1e+21]");

    assert_eq!(
        digest_of_serialize(&2.0f64).unwrap(),
        digest_of_serialize(&2i64).unwrap()
    );
    assert_eq!(
        digest_of_serialize(&1e19f64).unwrap(),
        digest_of_serialize(&10_000_000_000_000_000_000u64).unwrap()
    );
    assert_ne!(
        digest_of_serialize(&0.5f64).unwrap(),
        digest_of_serialize(&5i64).unwrap()
    );
}
