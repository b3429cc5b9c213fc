//! Auth types shared by DigiInsta services that sit behind the admin session.
//!
//! Provides the session cookie builders, the `SessionIdentity` extractor, and
//! client identifier derivation for rate limiting.

pub mod client_ip;
pub mod cookie;
pub mod identity;
