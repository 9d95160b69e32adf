//! GeoLock: the upload (seal) and download (open) paths in one place

use geocrypt_core::config::{CipherSuite, GeocryptConfig, KdfScheme};
use geocrypt_core::{AccessDecision, Coordinates, GeoError, GeoResult};

use crate::access::verify_access_at;
use crate::cipher::{decrypt, encrypt, CipherEnvelope};
use crate::file_id::{make_file_id_at, FileIdentifier};
use crate::kdf::{derive_key, DerivedKey};
use crate::policy::Policy;

/// Output of [`GeoLock::seal`]: the identifier to store as object metadata
/// and the envelope to store as the object body.
#[derive(Debug, Clone)]
pub struct SealedFile {
    pub id: FileIdentifier,
    pub envelope: CipherEnvelope,
}

/// Immutable binding settings. Holds no secrets, cheap to copy across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeoLock {
    policy: Policy,
    cipher: CipherSuite,
    kdf: KdfScheme,
}

impl GeoLock {
    pub fn new(policy: Policy, cipher: CipherSuite, kdf: KdfScheme) -> Self {
        Self {
            policy,
            cipher,
            kdf,
        }
    }

    pub fn from_config(config: &GeocryptConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self::new(
            Policy::from_config(&config.policy),
            config.crypto.cipher,
            config.crypto.kdf,
        ))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn cipher(&self) -> CipherSuite {
        self.cipher
    }

    pub fn kdf(&self) -> KdfScheme {
        self.kdf
    }

    /// Key for `location` and `raw_device_id` at the policy precision.
    pub fn derive_key(&self, location: Coordinates, raw_device_id: &str) -> GeoResult<DerivedKey> {
        derive_key(
            location.latitude,
            location.longitude,
            raw_device_id,
            self.policy.geohash_precision,
            self.kdf,
        )
    }

    /// Encrypt base64 `content` bound to `location` and `raw_device_id`.
    pub fn seal(
        &self,
        content: &str,
        location: Coordinates,
        raw_device_id: &str,
        file_type: &str,
    ) -> GeoResult<SealedFile> {
        self.seal_at(content, location, raw_device_id, file_type, crate::now_millis())
    }

    pub fn seal_at(
        &self,
        content: &str,
        location: Coordinates,
        raw_device_id: &str,
        file_type: &str,
        now_ms: u64,
    ) -> GeoResult<SealedFile> {
        let key = self.derive_key(location, raw_device_id)?;
        let envelope = encrypt(content, &key, self.cipher)?;
        let id = make_file_id_at(
            location.latitude,
            location.longitude,
            raw_device_id,
            file_type,
            &self.policy,
            now_ms,
        )?;
        tracing::info!(
            geohash = %id.areal(),
            file_type,
            expires_at_ms = id.expires_at_ms(),
            "sealed file"
        );
        Ok(SealedFile { id, envelope })
    }

    /// Verify access for `id`, then decrypt `envelope` to base64 content.
    pub fn open(
        &self,
        id: &FileIdentifier,
        envelope: &str,
        location: Coordinates,
        raw_device_id: &str,
    ) -> GeoResult<String> {
        self.open_at(id, envelope, location, raw_device_id, crate::now_millis())
    }

    pub fn open_at(
        &self,
        id: &FileIdentifier,
        envelope: &str,
        location: Coordinates,
        raw_device_id: &str,
        now_ms: u64,
    ) -> GeoResult<String> {
        let decision = verify_access_at(
            id,
            location.latitude,
            location.longitude,
            raw_device_id,
            now_ms,
        )?;
        if let AccessDecision::Deny(reason) = decision {
            return Err(GeoError::AccessDenied(reason));
        }

        // The identifier records the precision it was sealed with
        let key = derive_key(
            location.latitude,
            location.longitude,
            raw_device_id,
            id.areal().precision(),
            self.kdf,
        )?;
        decrypt(envelope, &key, self.cipher, id.file_type())
    }
}
