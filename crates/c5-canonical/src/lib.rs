//! Canonical value model and event-stream canonicalization for c5.
//!
//! Any structured value is first converted into a [`CanonicalValue`] tree, then
//! walked by the [`Canonicalizer`], which emits a sorted, typed [`Event`] stream.
//! Two consumers read that stream:
//!
//! - [`JsonCollector`] renders canonical JSON text (compact or indented).
//! - [`HashCollector`] feeds attribute names and leaf text into SHA-256 and
//!   returns a base58 [`Digest`] that does not depend on field declaration order.
//!
//! Both consumers can observe one traversal at once through [`Multiplex`].
//!
#![deny(missing_docs)]

/// Serde boundary adapter converting `Serialize` values into canonical trees.
pub mod adapter;
/// Canonical traversal and its validation pass.
pub mod canonicalizer;
/// Base58 digest text.
pub mod digest;
/// Event protocol shared by traversal and collectors.
pub mod event;
/// Order-independent content hashing.
pub mod hash;
/// Canonical JSON rendering.
pub mod json;
/// Minimal decimal number text.
pub mod number;
/// Millisecond-precision UTC timestamps.
pub mod timestamp;
/// Validation helpers used by canonical types.
pub mod validation;
/// Tagged leaves and canonical value trees.
pub mod value;

pub use adapter::{from_canonical_value, to_canonical_value};
pub use canonicalizer::{traverse, traverse_serialize, CanonicalizationError, Canonicalizer, MAX_DEPTH};
pub use digest::Digest;
pub use event::{Event, EventSink, Multiplex, StructuralMarker};
pub use hash::{digest_of, digest_of_serialize, HashCollector, HashWriter};
pub use json::{to_canonical_json, to_json_string, JsonCollector, JsonFormat};
pub use number::canonical_number_text;
pub use timestamp::Timestamp;
pub use validation::ValidationError;
pub use value::{CanonicalValue, TaggedValue, ValueKind};
