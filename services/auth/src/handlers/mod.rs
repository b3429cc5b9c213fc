pub mod admin;
pub mod health;
pub mod otp;
pub mod session;

use serde::Serialize;

use crate::error::AuthServiceError;

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Reject absent or blank JSON fields with a 400 naming the field.
pub(crate) fn required(value: Option<String>, field: &'static str) -> Result<String, AuthServiceError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AuthServiceError::MissingField(field))
}
