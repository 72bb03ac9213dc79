//! Token rotation service library.
//!
//! Issues access/refresh token pairs, rotates refresh sessions on a
//! single-use basis and raises alerts when a refresh arrives from a
//! different client address than the session was created from.

#![forbid(unsafe_code)]

pub mod alert;
pub mod config;
pub mod error;
pub mod http;
pub mod jwt;
pub mod metrics;
pub mod refresh;
pub mod storage;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, RotationError};
pub use refresh::{Issuance, RotationEngine, RotationSettings, TokenPair};
