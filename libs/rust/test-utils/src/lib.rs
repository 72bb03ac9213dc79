//! Shared test utilities for auth-platform Rust services.
//!
//! This crate provides:
//! - Proptest generators for user identifiers, client addresses and secrets
//! - Test fixtures with sample data

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
