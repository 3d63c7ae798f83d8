//! reCAPTCHA site-verify client guarding demo account creation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// reCAPTCHA verification endpoint.
const VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Errors that can occur when verifying a token.
#[derive(Debug, Error)]
pub enum RecaptchaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Bot verification.
#[async_trait]
pub trait BotVerifier: Send + Sync {
    /// True when the token proves a human.
    async fn verify(&self, token: &str) -> Result<bool, RecaptchaError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA client.
#[derive(Clone)]
pub struct RecaptchaClient {
    client: reqwest::Client,
    secret: SecretString,
}

impl RecaptchaClient {
    /// Create a new reCAPTCHA client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(secret: SecretString) -> Result<Self, RecaptchaError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, secret })
    }
}

#[async_trait]
impl BotVerifier for RecaptchaClient {
    async fn verify(&self, token: &str) -> Result<bool, RecaptchaError> {
        if self.secret.expose_secret().is_empty() {
            tracing::warn!("RECAPTCHA_SECRET_KEY not set, rejecting verification");
            return Ok(false);
        }

        let response = self
            .client
            .post(VERIFY_URL)
            .form(&[("secret", self.secret.expose_secret()), ("response", token)])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecaptchaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SiteVerifyResponse = response.json().await?;
        if !body.success {
            tracing::info!(errors = ?body.error_codes, "recaptcha rejected token");
        }
        Ok(body.success)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_secret_rejects_without_network() {
        let client = RecaptchaClient::new(SecretString::from("")).unwrap();
        assert!(!client.verify("token").await.unwrap());
    }

    #[test]
    fn test_parses_error_codes() {
        let body: SiteVerifyResponse =
            serde_json::from_str(r#"{"success":false,"error-codes":["timeout-or-duplicate"]}"#)
                .unwrap();
        assert!(!body.success);
        assert_eq!(body.error_codes, ["timeout-or-duplicate"]);
    }
}
