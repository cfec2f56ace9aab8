//! Session records captured between ticks and their single-line encoding.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use hashguard_core::WaveProgress;
use hashguard_world::WorldRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const RECORD_DOMAIN: &str = "hg";
const RECORD_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Prefix emitted before the encoded record payload.
pub const RECORD_HEADER: &str = "hg:v1";

/// Opaque snapshot of a session, handed back unchanged to
/// [`crate::Simulation::resume`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub(crate) world: WorldRecord,
    pub(crate) waves: WaveProgress,
}

impl SessionRecord {
    /// Number of ticks the session had processed when captured.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        self.world.tick_index()
    }

    /// Hash balance at capture time.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.world.hash()
    }

    /// Wave pointer at capture time.
    #[must_use]
    pub fn waves(&self) -> WaveProgress {
        self.waves
    }

    /// Encodes the record into a single-line string suitable for clipboard transfer.
    pub fn encode(&self) -> Result<String, RecordError> {
        let json = serde_json::to_vec(self).map_err(RecordError::Serialize)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{RECORD_HEADER}{FIELD_DELIMITER}{encoded}"))
    }

    /// Decodes a record from its single-line representation.
    pub fn decode(value: &str) -> Result<Self, RecordError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RecordError::EmptyPayload);
        }

        let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
        let domain = parts.next().ok_or(RecordError::MissingPrefix)?;
        let version = parts.next().ok_or(RecordError::MissingVersion)?;
        let payload = parts.next().ok_or(RecordError::MissingPayload)?;

        if domain != RECORD_DOMAIN {
            return Err(RecordError::InvalidPrefix(domain.to_owned()));
        }
        if version != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion(version.to_owned()));
        }

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(RecordError::InvalidEncoding)?;
        serde_json::from_slice(&bytes).map_err(RecordError::InvalidPayload)
    }
}

/// Errors raised while capturing, encoding or decoding session records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A tick was in progress, so the state is not settled.
    #[error("session is mid-update and cannot be captured")]
    MidUpdate,
    /// The provided string was empty or contained only whitespace.
    #[error("record string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("record string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("record string is missing the version")]
    MissingVersion,
    /// The payload segment was missing.
    #[error("record string is missing the payload")]
    MissingPayload,
    /// The prefix segment named another format.
    #[error("record prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment named an unsupported revision.
    #[error("record version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode record payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse record payload")]
    InvalidPayload(#[source] serde_json::Error),
    /// The record could not be serialised.
    #[error("could not serialise record")]
    Serialize(#[source] serde_json::Error),
}
