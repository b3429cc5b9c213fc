//! Service plumbing shared by DigiInsta backend services.
//!
//! Config loading, the JSON error envelope, health checks, request-id and
//! tracing setup, and the wall clock abstraction used by expiry logic.

pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
