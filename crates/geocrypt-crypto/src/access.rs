//! Access verifier: location → device → expiration, first failure wins

use geocrypt_core::{AccessDecision, DenyReason, GeoResult};

use crate::device::device_fingerprint;
use crate::file_id::FileIdentifier;
use crate::geohash::fingerprint;

/// Check whether `id` may be opened here, on this device, now.
///
/// The current location is fingerprinted at the identifier's own geohash
/// precision. Invalid current coordinates are an error, not a denial.
pub fn verify_access(
    id: &FileIdentifier,
    latitude: f64,
    longitude: f64,
    raw_device_id: &str,
) -> GeoResult<AccessDecision> {
    verify_access_at(id, latitude, longitude, raw_device_id, crate::now_millis())
}

/// [`verify_access`] evaluated at `now_ms`.
pub fn verify_access_at(
    id: &FileIdentifier,
    latitude: f64,
    longitude: f64,
    raw_device_id: &str,
    now_ms: u64,
) -> GeoResult<AccessDecision> {
    let here = fingerprint(latitude, longitude, id.areal().precision())?;
    let reason = if here != *id.areal() {
        Some(DenyReason::WrongLocation)
    } else if device_fingerprint(raw_device_id) != *id.device() {
        Some(DenyReason::WrongDevice)
    } else if id.is_expired_at(now_ms) {
        Some(DenyReason::Expired)
    } else {
        None
    };

    match reason {
        Some(reason) => {
            tracing::warn!(
                file_type = id.file_type(),
                expires_at_ms = id.expires_at_ms(),
                %reason,
                "access denied"
            );
            Ok(AccessDecision::Deny(reason))
        }
        None => Ok(AccessDecision::Allow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_id::make_file_id_at;
    use crate::policy::Policy;
    use geocrypt_core::GeoError;

    const NOW: u64 = 1_767_225_600_000;
    const DAY_MS: u64 = 24 * 60 * 60 * 1000;
    const MADRID: (f64, f64) = (40.4168, -3.7038);
    const PARIS: (f64, f64) = (48.8584, 2.2945);

    fn sealed_in_madrid() -> FileIdentifier {
        make_file_id_at(MADRID.0, MADRID.1, "Pixel-7", "pdf", &Policy::default(), NOW).unwrap()
    }

    #[test]
    fn test_allow() {
        let id = sealed_in_madrid();
        let decision = verify_access_at(&id, MADRID.0, MADRID.1, "Pixel-7", NOW + 1000).unwrap();
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn test_allow_elsewhere_in_same_cell() {
        let id = sealed_in_madrid();
        let decision = verify_access_at(&id, 40.4169, -3.7038, "Pixel-7", NOW).unwrap();
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_wrong_location() {
        let id = sealed_in_madrid();
        let decision = verify_access_at(&id, PARIS.0, PARIS.1, "Pixel-7", NOW).unwrap();
        assert_eq!(decision, AccessDecision::Deny(DenyReason::WrongLocation));
    }

    #[test]
    fn test_wrong_device() {
        let id = sealed_in_madrid();
        let decision = verify_access_at(&id, MADRID.0, MADRID.1, "iPhone 15", NOW).unwrap();
        assert_eq!(decision, AccessDecision::Deny(DenyReason::WrongDevice));
    }

    #[test]
    fn test_expired() {
        let id = sealed_in_madrid();
        let decision =
            verify_access_at(&id, MADRID.0, MADRID.1, "Pixel-7", NOW + DAY_MS + 1).unwrap();
        assert_eq!(decision, AccessDecision::Deny(DenyReason::Expired));
    }

    #[test]
    fn test_expiration_boundary_is_inclusive() {
        let id = sealed_in_madrid();
        let decision = verify_access_at(&id, MADRID.0, MADRID.1, "Pixel-7", NOW + DAY_MS).unwrap();
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_expired_via_wall_clock() {
        // Sealed two days ago, so already past its one-day window
        let id = make_file_id_at(
            MADRID.0,
            MADRID.1,
            "Pixel-7",
            "pdf",
            &Policy::default(),
            crate::now_millis() - 2 * DAY_MS,
        )
        .unwrap();
        let decision = verify_access(&id, MADRID.0, MADRID.1, "Pixel-7").unwrap();
        assert_eq!(decision, AccessDecision::Deny(DenyReason::Expired));
    }

    #[test]
    fn test_first_failure_wins() {
        let id = sealed_in_madrid();
        let late = NOW + 10 * DAY_MS;

        // Everything wrong: location reported
        let d = verify_access_at(&id, PARIS.0, PARIS.1, "iPhone 15", late).unwrap();
        assert_eq!(d, AccessDecision::Deny(DenyReason::WrongLocation));

        // Device and time wrong: device reported
        let d = verify_access_at(&id, MADRID.0, MADRID.1, "iPhone 15", late).unwrap();
        assert_eq!(d, AccessDecision::Deny(DenyReason::WrongDevice));
    }

    #[test]
    fn test_uses_identifier_precision() {
        let coarse = Policy {
            geohash_precision: 4,
            ..Policy::default()
        };
        let id = make_file_id_at(MADRID.0, MADRID.1, "Pixel-7", "pdf", &coarse, NOW).unwrap();
        // ~1 km away: different 7-char cell, same 4-char cell
        let decision = verify_access_at(&id, 40.4250, -3.7100, "Pixel-7", NOW).unwrap();
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_invalid_current_location_is_error() {
        let id = sealed_in_madrid();
        let err = verify_access_at(&id, f64::NAN, 0.0, "Pixel-7", NOW).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate { .. }));
    }
}
