//! Key derivation: (geohash, device hash) → 256-bit key
//!
//! Pure and deterministic: sealing and opening recompute the same key from
//! the same location and device, so no key is ever stored or transported.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use geocrypt_core::config::KdfScheme;
use geocrypt_core::{GeoError, GeoResult};

use crate::device::{device_fingerprint, DeviceFingerprint};
use crate::geohash::{fingerprint, ArealFingerprint};
use crate::KEY_SIZE;

const HKDF_SALT: &[u8] = b"geocrypt-v1";
const HKDF_INFO: &[u8] = b"geocrypt-file-key";

/// A 256-bit key bound to a location cell and a device. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the key for a coordinate and a raw device name.
pub fn derive_key(
    latitude: f64,
    longitude: f64,
    raw_device_id: &str,
    precision: usize,
    scheme: KdfScheme,
) -> GeoResult<DerivedKey> {
    let areal = fingerprint(latitude, longitude, precision)?;
    let device = device_fingerprint(raw_device_id);
    derive_key_from_fingerprints(&areal, &device, scheme)
}

/// Derive the key from already-computed fingerprints.
pub fn derive_key_from_fingerprints(
    areal: &ArealFingerprint,
    device: &DeviceFingerprint,
    scheme: KdfScheme,
) -> GeoResult<DerivedKey> {
    tracing::debug!(?scheme, precision = areal.precision(), "deriving key");
    match scheme {
        KdfScheme::LegacyRepeat => Ok(legacy_repeat(areal, device)),
        KdfScheme::HkdfSha256 => hkdf_derive(areal, device),
    }
}

/// `geohash ++ deviceHash`, repeated cyclically and cut to 32 bytes.
fn legacy_repeat(areal: &ArealFingerprint, device: &DeviceFingerprint) -> DerivedKey {
    let combined = format!("{areal}{device}");
    let mut bytes = [0u8; KEY_SIZE];
    for (dst, src) in bytes.iter_mut().zip(combined.bytes().cycle()) {
        *dst = src;
    }
    DerivedKey::from_bytes(bytes)
}

/// HKDF-SHA256 over `geohash ‖ 0x00 ‖ deviceHash`.
fn hkdf_derive(areal: &ArealFingerprint, device: &DeviceFingerprint) -> GeoResult<DerivedKey> {
    let mut ikm = Vec::with_capacity(areal.precision() + 1 + device.as_str().len());
    ikm.extend_from_slice(areal.as_str().as_bytes());
    ikm.push(0);
    ikm.extend_from_slice(device.as_str().as_bytes());

    let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), &ikm);
    let mut okm = [0u8; KEY_SIZE];
    let expanded = hkdf.expand(HKDF_INFO, &mut okm);
    ikm.zeroize();
    expanded.map_err(|e| GeoError::KeyDerivation(format!("HKDF expand failed: {e}")))?;

    Ok(DerivedKey::from_bytes(okm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MADRID: (f64, f64) = (40.4168, -3.7038);
    const PARIS: (f64, f64) = (48.8584, 2.2945);

    #[test]
    fn test_legacy_vector() {
        let key = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, KdfScheme::LegacyRepeat).unwrap();
        assert_eq!(key.as_bytes(), b"ezjmgtw216d1b8cezjmgtw216d1b8cez");
    }

    #[test]
    fn test_legacy_short_precision_still_fills_key() {
        let key = derive_key(MADRID.0, MADRID.1, "Pixel-7", 1, KdfScheme::LegacyRepeat).unwrap();
        // "e" + "216d1b8c" = 9 chars, cycled
        assert_eq!(key.as_bytes(), b"e216d1b8ce216d1b8ce216d1b8ce216d");
    }

    #[test]
    fn test_hkdf_deterministic() {
        let k1 = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, KdfScheme::HkdfSha256).unwrap();
        let k2 = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, KdfScheme::HkdfSha256).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_hkdf_differs_from_legacy() {
        let legacy = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, KdfScheme::LegacyRepeat).unwrap();
        let hkdf = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, KdfScheme::HkdfSha256).unwrap();
        assert_ne!(legacy.as_bytes(), hkdf.as_bytes());
    }

    #[test]
    fn test_different_locations() {
        for scheme in [KdfScheme::LegacyRepeat, KdfScheme::HkdfSha256] {
            let a = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, scheme).unwrap();
            let b = derive_key(PARIS.0, PARIS.1, "Pixel-7", 7, scheme).unwrap();
            assert_ne!(a.as_bytes(), b.as_bytes(), "{scheme:?}");
        }
    }

    #[test]
    fn test_different_devices() {
        for scheme in [KdfScheme::LegacyRepeat, KdfScheme::HkdfSha256] {
            let a = derive_key(MADRID.0, MADRID.1, "Pixel-7", 7, scheme).unwrap();
            let b = derive_key(MADRID.0, MADRID.1, "iPhone 15", 7, scheme).unwrap();
            assert_ne!(a.as_bytes(), b.as_bytes(), "{scheme:?}");
        }
    }

    #[test]
    fn test_invalid_coordinate_propagates() {
        let err = derive_key(f64::NAN, 0.0, "Pixel-7", 7, KdfScheme::HkdfSha256).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = DerivedKey::from_bytes([7u8; KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains('7'));
    }

    proptest! {
        #[test]
        fn derivation_is_pure(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
            device in "[A-Za-z0-9 _-]{0,24}",
            legacy in any::<bool>(),
        ) {
            let scheme = if legacy { KdfScheme::LegacyRepeat } else { KdfScheme::HkdfSha256 };
            let k1 = derive_key(lat, lon, &device, 7, scheme).unwrap();
            let k2 = derive_key(lat, lon, &device, 7, scheme).unwrap();
            prop_assert_eq!(k1.as_bytes(), k2.as_bytes());
        }
    }
}
