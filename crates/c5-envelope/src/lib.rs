//! Content-addressed message envelopes for c5.
//!
//! An [`Envelope`] wraps a typed payload (`kind` + canonical `data`) with
//! routing metadata. Unless the caller supplies one, its identifier is derived
//! from the payload data's order-independent digest:
//! `"{timestamp_ms}-{base58(sha256(...))}"`.
//!
//! Core invariants:
//! - Envelopes are immutable once built
//! - Identifiers depend only on the timestamp and the payload data
//! - Serialization is canonical JSON with keys `data, dst, id, src, t, ttl, v`
//!
#![deny(missing_docs)]

/// Time source capability.
pub mod clock;
/// Envelope model, builder and wire format.
pub mod envelope;
/// Error types for envelope operations.
pub mod errors;

pub use clock::{Clock, FixedClock, SystemClock};
pub use envelope::{derive_id, Envelope, EnvelopeBuilder, Payload, ENVELOPE_VERSION};
pub use errors::EnvelopeError;
