//! geocrypt-crypto: location-and-device-bound file encryption
//!
//! A file sealed here can only be opened from the same geohash cell, on the
//! same device, before its expiration deadline.
//!
//! Pipeline:
//! ```text
//! upload:   (lat, lon) → geohash ─┐
//!           device name → SHA-256[..8] ─┴→ DerivedKey → encrypt → base64(IV ‖ ciphertext)
//!           make_file_id → geohash-deviceHash-uniqueTag-expiresMs-fileType
//!
//! download: verify_access(id, lat, lon, device) → Allow → DerivedKey → decrypt
//! ```
//!
//! The key is recomputed on both sides from the same inputs, nothing is
//! transported or stored. The inputs carry little entropy (a geohash cell and
//! a guessable device name), so this binds files to a place and device, it
//! does not protect them against an attacker who can enumerate both.

pub mod access;
pub mod cipher;
pub mod device;
pub mod file_id;
pub mod geohash;
pub mod kdf;
pub mod lock;
pub mod policy;

pub use access::{verify_access, verify_access_at};
pub use cipher::{decrypt, encrypt, CipherEnvelope};
pub use device::{device_fingerprint, DeviceFingerprint};
pub use file_id::{make_file_id, make_file_id_at, FileIdentifier};
pub use geohash::{fingerprint, ArealFingerprint, CellBounds};
pub use kdf::{derive_key, derive_key_from_fingerprints, DerivedKey};
pub use lock::{GeoLock, SealedFile};
pub use policy::Policy;

pub use geocrypt_core::config::{CipherSuite, KdfScheme};
pub use geocrypt_core::{AccessDecision, Coordinates, DenyReason, GeoError, GeoResult};

/// Size of a derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the IV / nonce prefix of every envelope
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Length of a device fingerprint in hex characters
pub const DEVICE_HASH_LEN: usize = 8;

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
