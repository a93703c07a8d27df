use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// SHA-256 digest bytes, encoded as base58 (Bitcoin alphabet).
///
/// Leading zero bytes compress to `1`, so the text length varies between
/// 32 and 44 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Encodes raw digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    /// Parses validated base58 digest text.
    pub fn parse(b58: impl Into<String>) -> Result<Self, ValidationError> {
        let b58 = b58.into();
        let re = Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("invalid regex");
        if !re.is_match(&b58) {
            return Err(ValidationError::PatternMismatch {
                field: "digest",
                value: b58,
            });
        }
        Ok(Digest(b58))
    }

    /// Digest text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the text back into raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Text was produced by `from_bytes` or checked by `parse`.
        bs58::decode(&self.0).into_vec().unwrap_or_default()
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
