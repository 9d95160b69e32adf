use thiserror::Error;

use crate::types::DenyReason;

pub type GeoResult<T> = Result<T, GeoError>;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("invalid geohash precision: {0} (must be 1..=12)")]
    InvalidPrecision(usize),

    #[error("input is not valid base64: {0}")]
    InvalidInputEncoding(String),

    #[error("envelope too short: {len} bytes (minimum {min})")]
    MalformedEnvelope { len: usize, min: usize },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: wrong location/device key or corrupted data")]
    DecryptionFailed,

    #[error("decryption produced an empty result")]
    EmptyResult,

    #[error("malformed file identifier: {0}")]
    MalformedIdentifier(String),

    #[error("access denied: {0}")]
    AccessDenied(DenyReason),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
