pub mod auth;
pub mod otp;
pub mod rate_limit;
pub mod session;
