//! File identifier synthesis and parsing
//!
//! ```text
//! geohash-deviceHash-uniqueTag-expirationEpochMs-fileType
//! ezjmgtw-216d1b8c-6f1c0c2e9a8b4c7d9e0f1a2b3c4d5e6f-1767225600000-pdf
//! ```
//!
//! The unique tag is a v4 UUID in simple form (32 hex chars), so the first
//! four fields never contain the delimiter and the file type takes whatever
//! remains. Identifiers whose tag is a hyphenated UUID (8-4-4-4-12) are also
//! accepted and keep their original text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use geocrypt_core::{GeoError, GeoResult};

use crate::device::{device_fingerprint, DeviceFingerprint};
use crate::geohash::{fingerprint, ArealFingerprint};
use crate::policy::Policy;

const DELIMITER: char = '-';
const HYPHENATED_UUID_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Metadata carried next to a sealed file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileIdentifier {
    areal: ArealFingerprint,
    device: DeviceFingerprint,
    unique_tag: String,
    expires_at_ms: u64,
    file_type: String,
}

/// Build an identifier for a file sealed now at the given location.
pub fn make_file_id(
    latitude: f64,
    longitude: f64,
    raw_device_id: &str,
    file_type: &str,
    policy: &Policy,
) -> GeoResult<FileIdentifier> {
    make_file_id_at(
        latitude,
        longitude,
        raw_device_id,
        file_type,
        policy,
        crate::now_millis(),
    )
}

/// Build an identifier as if sealed at `now_ms`.
pub fn make_file_id_at(
    latitude: f64,
    longitude: f64,
    raw_device_id: &str,
    file_type: &str,
    policy: &Policy,
    now_ms: u64,
) -> GeoResult<FileIdentifier> {
    let areal = fingerprint(latitude, longitude, policy.geohash_precision)?;
    let device = device_fingerprint(raw_device_id);
    Ok(FileIdentifier {
        areal,
        device,
        unique_tag: Uuid::new_v4().simple().to_string(),
        expires_at_ms: now_ms.saturating_add(policy.expiration_ms()),
        file_type: file_type.to_string(),
    })
}

impl FileIdentifier {
    pub fn areal(&self) -> &ArealFingerprint {
        &self.areal
    }

    pub fn device(&self) -> &DeviceFingerprint {
        &self.device
    }

    pub fn unique_tag(&self) -> &str {
        &self.unique_tag
    }

    pub fn expires_at_ms(&self) -> u64 {
        self.expires_at_ms
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms
    }
}

fn is_hyphenated_uuid(parts: &[&str]) -> bool {
    parts.len() >= HYPHENATED_UUID_GROUPS.len()
        && parts
            .iter()
            .zip(HYPHENATED_UUID_GROUPS)
            .all(|(p, len)| p.len() == len && p.bytes().all(|b| b.is_ascii_hexdigit()))
}

impl FromStr for FileIdentifier {
    type Err = GeoError;

    fn from_str(s: &str) -> GeoResult<Self> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        if parts.len() < 5 {
            return Err(GeoError::MalformedIdentifier(format!(
                "expected at least 5 fields, got {}",
                parts.len()
            )));
        }

        let areal = ArealFingerprint::parse(parts[0])?;
        let device = DeviceFingerprint::parse(parts[1])?;

        let (unique_tag, rest) = if is_hyphenated_uuid(&parts[2..]) {
            let groups = HYPHENATED_UUID_GROUPS.len();
            (parts[2..2 + groups].join("-"), &parts[2 + groups..])
        } else {
            (parts[2].to_string(), &parts[3..])
        };
        Uuid::parse_str(&unique_tag).map_err(|e| {
            GeoError::MalformedIdentifier(format!("unique tag {unique_tag:?}: {e}"))
        })?;

        let [expiration, type_parts @ ..] = rest else {
            return Err(GeoError::MalformedIdentifier("missing expiration".into()));
        };
        if type_parts.is_empty() {
            return Err(GeoError::MalformedIdentifier("missing file type".into()));
        }
        let expires_at_ms = expiration.parse::<u64>().map_err(|e| {
            GeoError::MalformedIdentifier(format!("expiration {expiration:?}: {e}"))
        })?;

        Ok(Self {
            areal,
            device,
            unique_tag,
            expires_at_ms,
            file_type: type_parts.join("-"),
        })
    }
}

impl fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            self.areal, self.device, self.unique_tag, self.expires_at_ms, self.file_type
        )
    }
}

impl TryFrom<String> for FileIdentifier {
    type Error = GeoError;

    fn try_from(s: String) -> GeoResult<Self> {
        s.parse()
    }
}

impl From<FileIdentifier> for String {
    fn from(id: FileIdentifier) -> Self {
        id.to_string()
    }
}
