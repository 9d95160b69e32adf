//! Binding policy shared by sealing and opening

use std::time::Duration;

use geocrypt_core::config::{PolicyConfig, DEFAULT_EXPIRATION_HOURS, DEFAULT_GEOHASH_PRECISION};

/// Geohash precision and expiration window applied to newly sealed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub geohash_precision: usize,
    pub expiration: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            geohash_precision: DEFAULT_GEOHASH_PRECISION,
            expiration: Duration::from_secs(DEFAULT_EXPIRATION_HOURS * 3600),
        }
    }
}

impl Policy {
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            geohash_precision: config.geohash_precision,
            expiration: Duration::from_secs(config.expiration_hours.saturating_mul(3600)),
        }
    }

    pub fn expiration_ms(&self) -> u64 {
        u64::try_from(self.expiration.as_millis()).unwrap_or(u64::MAX)
    }
}
