use c5_canonical::{
    digest_of, from_canonical_value, to_canonical_value, to_json_string, CanonicalValue,
    Canonicalizer, JsonFormat, Timestamp,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::errors::EnvelopeError;

/// Protocol version literal carried in the `v` field.
pub const ENVELOPE_VERSION: &str = "A";

fn default_version() -> String {
    ENVELOPE_VERSION.to_string()
}

/// Typed payload: a `kind` discriminator plus arbitrary canonical data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payload {
    /// Payload type name.
    pub kind: String,
    /// Payload body.
    #[serde(default)]
    pub data: CanonicalValue,
}

impl Payload {
    /// Creates a payload from an already canonical body.
    pub fn new(kind: impl Into<String>, data: impl Into<CanonicalValue>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Creates a payload by lowering any `Serialize` body.
    pub fn from_serialize<T>(kind: impl Into<String>, data: &T) -> Result<Self, EnvelopeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self::new(kind, to_canonical_value(data)?))
    }

    /// Decodes the body into a typed record.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        Ok(from_canonical_value(&self.data)?)
    }
}

/// Derives the content-addressed identifier `"{timestamp_ms}-{digest}"`.
///
/// Only the payload's `data` is hashed, so the identifier survives changes to
/// the recipient list or TTL.
pub fn derive_id(timestamp_ms: i64, payload: &Payload) -> Result<String, EnvelopeError> {
    let digest = digest_of(&payload.data)?;
    Ok(format!("{timestamp_ms}-{digest}"))
}

/// Immutable message envelope.
///
/// Wire form (keys in canonical order):
///
/// | key    | meaning                          |
/// |--------|----------------------------------|
/// | `data` | payload `{kind, data}`           |
/// | `dst`  | recipient list                   |
/// | `id`   | identifier                       |
/// | `src`  | originator                       |
/// | `t`    | creation time, epoch milliseconds |
/// | `ttl`  | time to live, seconds            |
/// | `v`    | protocol version                 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "v", default = "default_version")]
    version: String,
    id: String,
    src: String,
    #[serde(default)]
    dst: Vec<String>,
    #[serde(rename = "data")]
    payload: Payload,
    #[serde(rename = "t", default)]
    timestamp_ms: i64,
    #[serde(rename = "ttl", default)]
    ttl_seconds: u64,
    #[serde(skip)]
    format: Option<JsonFormat>,
}

impl Envelope {
    /// Starts building an envelope.
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    /// Parses wire JSON.
    ///
    /// `id`, `src` and `data.kind` are required; `dst`, `t`, `ttl` and
    /// `data.data` default to empty, zero and null.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::Decode`] for missing or mistyped fields and for payload
    /// data that cannot be canonicalized (duplicate keys, excessive nesting),
    /// [`EnvelopeError::Version`] for a foreign `v`.
    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        Canonicalizer::new()
            .validate(&envelope.payload.data)
            .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(EnvelopeError::Version {
                found: envelope.version,
                expected: ENVELOPE_VERSION,
            });
        }
        Ok(envelope)
    }

    /// Protocol version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Originator.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Recipients.
    pub fn dst(&self) -> &[String] {
        &self.dst
    }

    /// Payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Creation time in epoch milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Creation time.
    pub fn timestamp(&self) -> Result<Timestamp, EnvelopeError> {
        Timestamp::from_millis(self.timestamp_ms)
            .ok_or(EnvelopeError::TimestampOutOfRange(self.timestamp_ms))
    }

    /// Time to live in seconds.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Rendering used by [`Envelope::as_json`].
    pub fn format(&self) -> Option<&JsonFormat> {
        self.format.as_ref()
    }

    /// The whole envelope as a canonical record.
    pub fn to_canonical(&self) -> Result<CanonicalValue, EnvelopeError> {
        Ok(to_canonical_value(self)?)
    }

    /// Canonical JSON using the envelope's configured format.
    pub fn as_json(&self) -> Result<String, EnvelopeError> {
        self.to_json(self.format.as_ref())
    }

    /// Canonical JSON with an explicit format; `None` is compact.
    pub fn to_json(&self, format: Option<&JsonFormat>) -> Result<String, EnvelopeError> {
        let text = to_json_string(&self.to_canonical()?, format)?;
        trace!(id = %self.id, bytes = text.len(), "serialized envelope");
        Ok(text)
    }

    /// Whether `id` matches the identifier derived from timestamp and payload.
    ///
    /// Caller-supplied identifiers in other formats simply report `false`.
    pub fn verify_id(&self) -> Result<bool, EnvelopeError> {
        Ok(derive_id(self.timestamp_ms, &self.payload)? == self.id)
    }
}

/// Collects envelope fields; [`EnvelopeBuilder::build`] fills the defaults.
#[derive(Default)]
pub struct EnvelopeBuilder {
    id: Option<String>,
    src: String,
    dst: Vec<String>,
    payload: Payload,
    timestamp_ms: Option<i64>,
    ttl_seconds: u64,
    clock: Option<Box<dyn Clock>>,
    format: Option<JsonFormat>,
}

impl EnvelopeBuilder {
    /// Uses `id` verbatim instead of deriving one. An empty id is ignored.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into()).filter(|id| !id.is_empty());
        self
    }

    /// Originator.
    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = src.into();
        self
    }

    /// Recipients.
    pub fn dst<I, S>(mut self, dst: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dst = dst.into_iter().map(Into::into).collect();
        self
    }

    /// Payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Creation time as epoch milliseconds.
    pub fn timestamp_ms(mut self, millis: i64) -> Self {
        self.timestamp_ms = Some(millis);
        self
    }

    /// Creation time.
    pub fn timestamp(self, timestamp: Timestamp) -> Self {
        self.timestamp_ms(timestamp.as_millis())
    }

    /// Time to live in seconds (default 0).
    pub fn ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = ttl;
        self
    }

    /// Clock consulted when no timestamp is given (default: [`SystemClock`]).
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Rendering used by [`Envelope::as_json`].
    pub fn format(mut self, format: JsonFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Builds the envelope, deriving the id when none was supplied.
    ///
    /// # Errors
    ///
    /// Fails only when the payload cannot be canonicalized.
    pub fn build(self) -> Result<Envelope, EnvelopeError> {
        let timestamp_ms = match self.timestamp_ms {
            Some(millis) => millis,
            None => match &self.clock {
                Some(clock) => clock.now().as_millis(),
                None => SystemClock.now().as_millis(),
            },
        };
        let id = match self.id {
            Some(id) => id,
            None => {
                let id = derive_id(timestamp_ms, &self.payload)?;
                debug!(%id, kind = %self.payload.kind, "derived envelope id");
                id
            }
        };
        Ok(Envelope {
            version: default_version(),
            id,
            src: self.src,
            dst: self.dst,
            payload: self.payload,
            timestamp_ms,
            ttl_seconds: self.ttl_seconds,
            format: self.format,
        })
    }
}
