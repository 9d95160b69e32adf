pub mod config;
pub mod error;
pub mod types;

pub use config::GeocryptConfig;
pub use error::{GeoError, GeoResult};
pub use types::{AccessDecision, Coordinates, DenyReason};
