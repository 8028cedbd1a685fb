//! Opaque change-log cursor and its transaction-token encoding.
//!
//! # Invariants
//! - The platform owns the byte payload; core never interprets it.
//! - Tokens are `base64(json({"v":1,"data":[..]}))`.
//! - Decoding never panics: every malformed token is an `AnchorError`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TOKEN_FORMAT_VERSION: u8 = 1;

/// Position in the platform's change log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor(Vec<u8>);

/// Serialized anchor attached to routed events.
pub type TransactionToken = String;

#[derive(Serialize, Deserialize)]
struct AnchorEnvelope {
    v: u8,
    data: Vec<u8>,
}

impl Anchor {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encodes this anchor as a transaction token.
    ///
    /// # Errors
    /// - `AnchorError::Empty` for a zero-length payload.
    pub fn serialize(&self) -> Result<TransactionToken, AnchorError> {
        if self.0.is_empty() {
            return Err(AnchorError::Empty);
        }
        let envelope = AnchorEnvelope {
            v: TOKEN_FORMAT_VERSION,
            data: self.0.clone(),
        };
        let json = serde_json::to_vec(&envelope)
            .map_err(|err| AnchorError::Malformed(err.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Decodes a transaction token produced by [`Anchor::serialize`].
    pub fn deserialize(token: &str) -> Result<Self, AnchorError> {
        let raw = STANDARD
            .decode(token.trim())
            .map_err(|err| AnchorError::Malformed(err.to_string()))?;
        let envelope: AnchorEnvelope =
            serde_json::from_slice(&raw).map_err(|err| AnchorError::Malformed(err.to_string()))?;
        if envelope.v != TOKEN_FORMAT_VERSION {
            return Err(AnchorError::UnsupportedVersion(envelope.v));
        }
        if envelope.data.is_empty() {
            return Err(AnchorError::Empty);
        }
        Ok(Self(envelope.data))
    }
}

/// Anchor encoding/decoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    Empty,
    Malformed(String),
    UnsupportedVersion(u8),
}

impl Display for AnchorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "anchor payload is empty"),
            Self::Malformed(message) => write!(f, "malformed anchor token: {message}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported anchor token version: {version}")
            }
        }
    }
}

impl Error for AnchorError {}
