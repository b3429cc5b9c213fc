//! Test utilities for DigiInsta services.
//!
//! Provides a hand-driven clock and request header builders. Import from
//! tests and `dev-dependencies` only, never from production code.

pub mod auth;
pub mod clock;
