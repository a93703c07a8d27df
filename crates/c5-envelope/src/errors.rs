use thiserror::Error;

/// Envelope error types.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// Payload could not be canonicalized.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] c5_canonical::CanonicalizationError),
    /// Wire text is not a valid envelope: missing or mistyped fields.
    #[error("invalid envelope: {0}")]
    Decode(String),
    /// Wire text carries a protocol version this crate does not speak.
    #[error("unsupported envelope version {found:?}, expected {expected:?}")]
    Version {
        /// Version found on the wire.
        found: String,
        /// Version this crate produces.
        expected: &'static str,
    },
    /// Timestamp outside the representable range.
    #[error("timestamp {0} ms is out of range")]
    TimestampOutOfRange(i64),
}
