use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::repository::OtpMailer;
use crate::error::AuthServiceError;

/// Transactional email over the Resend HTTP API.
#[derive(Clone)]
pub struct ResendMailer {
    pub client: reqwest::Client,
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    /// Stated in the email body; matches the OTP TTL.
    pub otp_ttl_minutes: u64,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: String,
}

fn otp_email_text(code: &str, ttl_minutes: u64) -> String {
    format!(
        "Your DigiInsta admin sign-in code is {code}.\n\n\
         It expires in {ttl_minutes} minutes and can be used once. \
         If you did not request it, you can ignore this email."
    )
}

#[async_trait]
impl OtpMailer for ResendMailer {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), AuthServiceError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [email],
            subject: "Your DigiInsta sign-in code",
            text: otp_email_text(code, self.otp_ttl_minutes),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, email, "otp email request failed");
                AuthServiceError::DeliveryUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), email, "otp email rejected by provider");
            return Err(AuthServiceError::DeliveryUnavailable);
        }

        info!(email, "otp email sent");
        Ok(())
    }
}
