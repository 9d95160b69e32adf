//! Device fingerprint: first 8 hex chars of SHA-256(device name)
//!
//! Identifies "this installation", it does not authenticate it. Device names
//! are human-readable and guessable, so the binding is weak.

use sha2::{Digest, Sha256};
use std::fmt;

use geocrypt_core::{GeoError, GeoResult};

use crate::DEVICE_HASH_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceFingerprint(String);

/// Fingerprint a raw device identifier (e.g. the device model or name).
pub fn device_fingerprint(raw_device_id: &str) -> DeviceFingerprint {
    let digest = Sha256::digest(raw_device_id.as_bytes());
    let hex = format!("{digest:x}");
    DeviceFingerprint(hex[..DEVICE_HASH_LEN].to_string())
}

impl DeviceFingerprint {
    /// Validate a fingerprint read back from a stored identifier.
    pub fn parse(s: &str) -> GeoResult<Self> {
        let well_formed = s.len() == DEVICE_HASH_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !well_formed {
            return Err(GeoError::MalformedIdentifier(format!(
                "device hash must be {DEVICE_HASH_LEN} lowercase hex chars, got {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
