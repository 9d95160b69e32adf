use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 position in decimal degrees, as supplied by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Why the access verifier refused a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Current geohash cell differs from the one the file was sealed in
    WrongLocation,
    /// Current device fingerprint differs from the uploading device
    WrongDevice,
    /// The identifier's expiration timestamp has passed
    Expired,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DenyReason::WrongLocation => "not at the location this file was sealed in",
            DenyReason::WrongDevice => "file can only be opened from the device that sealed it",
            DenyReason::Expired => "file has expired",
        };
        f.write_str(msg)
    }
}

/// Outcome of an access check. Advisory: it gates whether decryption is
/// attempted, it does not make decryption impossible by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}
