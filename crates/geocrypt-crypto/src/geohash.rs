//! Geospatial fingerprint: (latitude, longitude) → geohash cell
//!
//! Standard geohash bit interleaving. Even bits refine longitude, odd bits
//! latitude; a coordinate strictly above the cell midpoint takes the upper
//! half. Every 5 bits become one character of the base32 alphabet below.

use std::fmt;

use geocrypt_core::config::MAX_GEOHASH_PRECISION;
use geocrypt_core::{Coordinates, GeoError, GeoResult};

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// A geohash string of fixed precision. Two coordinates in the same cell
/// produce equal fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArealFingerprint(String);

/// Latitude/longitude box covered by a geohash cell (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl CellBounds {
    fn world() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Encode a coordinate as a geohash of `precision` characters.
pub fn fingerprint(latitude: f64, longitude: f64, precision: usize) -> GeoResult<ArealFingerprint> {
    if precision == 0 || precision > MAX_GEOHASH_PRECISION {
        return Err(GeoError::InvalidPrecision(precision));
    }
    let point = Coordinates::new(latitude, longitude);
    if !point.is_valid() {
        return Err(GeoError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }

    let mut cell = CellBounds::world();
    let mut hash = String::with_capacity(precision);
    let mut even = true;

    while hash.len() < precision {
        let mut idx = 0usize;
        for _ in 0..5 {
            idx <<= 1;
            if even {
                let mid = (cell.min_lon + cell.max_lon) / 2.0;
                if longitude > mid {
                    idx |= 1;
                    cell.min_lon = mid;
                } else {
                    cell.max_lon = mid;
                }
            } else {
                let mid = (cell.min_lat + cell.max_lat) / 2.0;
                if latitude > mid {
                    idx |= 1;
                    cell.min_lat = mid;
                } else {
                    cell.max_lat = mid;
                }
            }
            even = !even;
        }
        hash.push(BASE32[idx] as char);
    }

    Ok(ArealFingerprint(hash))
}

impl ArealFingerprint {
    /// Validate a geohash read back from a stored identifier.
    pub fn parse(s: &str) -> GeoResult<Self> {
        if s.is_empty() || s.len() > MAX_GEOHASH_PRECISION {
            return Err(GeoError::MalformedIdentifier(format!(
                "geohash length {} out of range",
                s.len()
            )));
        }
        if let Some(c) = s.bytes().find(|b| !BASE32.contains(b)) {
            return Err(GeoError::MalformedIdentifier(format!(
                "invalid geohash character {:?}",
                c as char
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn precision(&self) -> usize {
        self.0.len()
    }

    /// Decode the cell this geohash names.
    pub fn bounds(&self) -> CellBounds {
        let mut cell = CellBounds::world();
        let mut even = true;

        for byte in self.0.bytes() {
            // parse() guarantees membership
            let idx = BASE32.iter().position(|&b| b == byte).unwrap_or(0);
            for bit in (0..5).rev() {
                let upper = (idx >> bit) & 1 == 1;
                if even {
                    let mid = (cell.min_lon + cell.max_lon) / 2.0;
                    if upper {
                        cell.min_lon = mid;
                    } else {
                        cell.max_lon = mid;
                    }
                } else {
                    let mid = (cell.min_lat + cell.max_lat) / 2.0;
                    if upper {
                        cell.min_lat = mid;
                    } else {
                        cell.max_lat = mid;
                    }
                }
                even = !even;
            }
        }
        cell
    }

    pub fn center(&self) -> Coordinates {
        self.bounds().center()
    }
}

impl fmt::Display for ArealFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArealFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
