use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GeoError, GeoResult};

/// Geohash length used when no config overrides it
pub const DEFAULT_GEOHASH_PRECISION: usize = 7;

/// Expiration window used when no config overrides it
pub const DEFAULT_EXPIRATION_HOURS: u64 = 24;

/// Longest geohash that still fits the 60 bits of interleaved coordinates
pub const MAX_GEOHASH_PRECISION: usize = 12;

/// Top-level configuration (loaded from geocrypt.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocryptConfig {
    pub policy: PolicyConfig,
    pub crypto: CryptoConfig,
    pub device: DeviceConfig,
    pub log: LogConfig,
}

/// Binding policy. Must be identical on the sealing and opening side or the
/// derived keys will not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Geohash length of the areal fingerprint (default: 7, roughly 150 m cells)
    pub geohash_precision: usize,
    /// Hours until a sealed file expires (default: 24)
    pub expiration_hours: u64,
}

/// Symmetric cipher used for envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CipherSuite {
    /// AES-256-GCM with a 16-byte nonce in the IV slot (authenticated)
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// AES-256-CBC with PKCS#7 padding, no integrity tag
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
}

/// How the 32-byte key is built from the two fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KdfScheme {
    /// HKDF-SHA256 over the fingerprints
    #[default]
    #[serde(rename = "hkdf-sha256")]
    HkdfSha256,
    /// Fingerprint string repeated and truncated to 32 bytes
    #[serde(rename = "legacy-repeat")]
    LegacyRepeat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub cipher: CipherSuite,
    pub kdf: KdfScheme,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Raw device name fed to the device fingerprint (defaults to hostname)
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            geohash_precision: DEFAULT_GEOHASH_PRECISION,
            expiration_hours: DEFAULT_EXPIRATION_HOURS,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl GeocryptConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> GeoResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| GeoError::Config(format!("parsing: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a config file
    pub fn load(path: &Path) -> GeoResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> GeoResult<()> {
        let precision = self.policy.geohash_precision;
        if precision == 0 || precision > MAX_GEOHASH_PRECISION {
            return Err(GeoError::InvalidPrecision(precision));
        }
        if self.policy.expiration_hours == 0 {
            return Err(GeoError::Config(
                "policy.expiration_hours must be greater than zero".into(),
            ));
        }
        match self.log.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(GeoError::Config(format!(
                "log.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }
}
