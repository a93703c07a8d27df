//! Order-independent content digests.
//!
//! Only attribute names and leaf text reach the hash; container boundaries do
//! not. Because the traversal sorts record members, the digest depends on the
//! sorted set of (name, value) pairs and not on declaration order.

use serde::Serialize;
use sha2::Sha256;

use crate::adapter::to_canonical_value;
use crate::canonicalizer::{traverse, CanonicalizationError};
use crate::digest::Digest;
use crate::event::{Event, EventSink};
use crate::value::CanonicalValue;

/// Incremental hash primitive fed by a [`HashCollector`].
pub trait HashWriter {
    /// Feeds bytes into the running hash.
    fn write(&mut self, bytes: &[u8]);

    /// Finalizes and returns the hash bytes.
    fn finish(self) -> Vec<u8>;
}

impl HashWriter for Sha256 {
    fn write(&mut self, bytes: &[u8]) {
        sha2::Digest::update(self, bytes);
    }

    fn finish(self) -> Vec<u8> {
        sha2::Digest::finalize(self).to_vec()
    }
}

/// Event sink that folds a traversal into a base58 SHA-256 digest.
///
/// Fed bytes, in event order:
/// - a non-empty attribute, raw and undelimited;
/// - a leaf's canonical text, unquoted (`null` feeds nothing).
///
/// The collector is single use: [`HashCollector::digest`] consumes it.
pub struct HashCollector<H = Sha256> {
    hasher: H,
}

impl Default for HashCollector<Sha256> {
    fn default() -> Self {
        Self::new()
    }
}

impl HashCollector<Sha256> {
    /// Creates a SHA-256 collector.
    pub fn new() -> Self {
        Self::with_hasher(Sha256::default())
    }
}

impl<H: HashWriter> HashCollector<H> {
    /// Creates a collector around a caller-provided hash primitive.
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }

    /// Finalizes the hash. Call only after traversal has completed.
    pub fn digest(self) -> Digest {
        Digest::from_bytes(&self.hasher.finish())
    }
}

impl<H: HashWriter> EventSink for HashCollector<H> {
    fn append(&mut self, event: &Event<'_>) {
        if let Some(name) = event.attribute().filter(|name| !name.is_empty()) {
            self.hasher.write(name.as_bytes());
        }
        if let Some(text) = event.value().and_then(|value| value.canonical_text()) {
            self.hasher.write(text.as_bytes());
        }
    }
}

/// Digest of a canonical value.
///
/// ```rust
/// use c5_canonical::{digest_of, CanonicalValue, Timestamp};
///
/// let ts = Timestamp::from_millis(444).unwrap();
/// let digest = digest_of(&CanonicalValue::from(ts))?;
/// assert_eq!(digest.as_str(), "DzYqv3YaniBJWwqrNBn4534oTe4nL14TqcfVCguf9Yyv");
/// # Ok::<(), c5_canonical::CanonicalizationError>(())
/// ```
pub fn digest_of(value: &CanonicalValue) -> Result<Digest, CanonicalizationError> {
    let mut collector = HashCollector::new();
    traverse(value, &mut collector)?;
    Ok(collector.digest())
}

/// Lowers any `Serialize` value and returns its digest.
pub fn digest_of_serialize<T>(value: &T) -> Result<Digest, CanonicalizationError>
where
    T: Serialize + ?Sized,
{
    digest_of(&to_canonical_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TaggedValue;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<String>,
    }

    impl HashWriter for Recorder {
        fn write(&mut self, bytes: &[u8]) {
            self.writes.push(String::from_utf8_lossy(bytes).into_owned());
        }

        fn finish(self) -> Vec<u8> {
            self.writes.concat().into_bytes()
        }
    }

    fn fed(value: &CanonicalValue) -> Vec<String> {
        let mut collector = HashCollector::with_hasher(Recorder::default());
        traverse(value, &mut collector).unwrap();
        collector.hasher.writes
    }

    #[test]
    fn null_and_markers_feed_nothing() {
        let value = CanonicalValue::record([
            ("a", CanonicalValue::NULL),
            ("b", CanonicalValue::sequence([])),
            ("c", CanonicalValue::Record(vec![])),
        ]);
        assert_eq!(fed(&value), vec!["a", "b", "c"]);
    }

    #[test]
    fn strings_are_fed_raw() {
        let value = CanonicalValue::sequence([
            CanonicalValue::from("quote\"d"),
            CanonicalValue::Scalar(TaggedValue::Bool(true)),
            CanonicalValue::from(-12i64),
        ]);
        assert_eq!(fed(&value), vec!["quote\"d", "true", "-12"]);
    }

    #[test]
    fn empty_attribute_is_skipped() {
        let value = CanonicalValue::record([("", 1i64.into())]);
        assert_eq!(fed(&value), vec!["1"]);
    }

    #[test]
    fn recorder_digest_is_base58_of_finish() {
        let mut collector = HashCollector::with_hasher(Recorder::default());
        traverse(&CanonicalValue::from("a"), &mut collector).unwrap();
        assert_eq!(collector.digest().as_str(), bs58::encode(b"a").into_string());
    }
}
