//! Stored audio assets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::dsp::EffectKind;
use crate::engine::{AudioFormat, PcmBuffer};
use crate::error::{LabError, Result};

/// Opaque asset identifier (random UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AssetId {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(AssetId)
            .map_err(|_| LabError::InvalidRequest {
                reason: format!("'{}' is not a valid asset id", s),
            })
    }
}

/// Where an asset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetOrigin {
    /// Uploaded by a client.
    Uploaded { file_name: Option<String> },
    /// Output of an effect applied to another asset.
    Processed { source: AssetId, effect: EffectKind },
}

/// Encoded bytes as they will be served for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Lowercase hex SHA-256 of `bytes`.
    pub checksum: String,
}

impl EncodedAudio {
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Self {
        let checksum = sha256_hex(&bytes);
        Self {
            bytes,
            format,
            checksum,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// An immutable stored asset.
///
/// Assets are shared as `Arc<Asset>`; nothing mutates one after registration.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: AssetId,
    pub pcm: PcmBuffer,
    pub encoded: EncodedAudio,
    pub origin: AssetOrigin,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Asset {
    /// Bytes charged against the registry's capacity.
    pub fn size_bytes(&self) -> usize {
        self.pcm.size_bytes() + self.encoded.len()
    }

    /// True once `now` has reached the expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Suggested download file name, e.g. `3f2a...-reverb.wav`.
    pub fn file_name(&self) -> String {
        match &self.origin {
            AssetOrigin::Processed { effect, .. } => {
                format!("{}-{}.{}", self.id, effect, self.encoded.format.extension())
            }
            AssetOrigin::Uploaded { .. } => {
                format!("{}.{}", self.id, self.encoded.format.extension())
            }
        }
    }
}
