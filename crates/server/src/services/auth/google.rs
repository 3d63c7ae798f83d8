//! Google OAuth client.
//!
//! Handles the authorization-code exchange for the popup (`postmessage`)
//! flow, access-token refresh, userinfo lookup and id-token verification
//! through Google's tokeninfo endpoint.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::config::GoogleConfig;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Redirect URI used by the browser popup code flow.
const REDIRECT_URI: &str = "postmessage";

const VALID_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Tokens refresh when they expire within this window.
pub const REFRESH_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Token material stored in the Google session cookie.
///
/// `expires_in` is the absolute expiry in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl GoogleTokens {
    /// True when the access token expires within [`REFRESH_WINDOW_MS`] of
    /// `now_ms`.
    #[must_use]
    pub const fn is_expiring(&self, now_ms: i64) -> bool {
        self.expires_in.saturating_sub(now_ms) < REFRESH_WINDOW_MS
    }
}

/// Profile returned by the userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

/// OAuth identity provider operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, AuthError>;

    /// Refresh the access and id tokens. The refresh token is carried over
    /// when the provider does not rotate it.
    async fn refresh(&self, tokens: &GoogleTokens) -> Result<GoogleTokens, AuthError>;

    async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError>;

    /// Verify an id token and return its subject.
    async fn verify_id_token(&self, id_token: &str) -> Result<String, AuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_tokens(self, fallback_refresh: Option<&str>) -> Result<GoogleTokens, AuthError> {
        let access_token = self
            .access_token
            .ok_or(AuthError::MissingCredentials("access_token"))?;
        let id_token = self.id_token.ok_or(AuthError::MissingCredentials("id_token"))?;
        let refresh_token = self
            .refresh_token
            .or_else(|| fallback_refresh.map(str::to_owned))
            .ok_or(AuthError::MissingCredentials("refresh_token"))?;
        let expires_in_secs = self
            .expires_in
            .ok_or(AuthError::MissingCredentials("expires_in"))?;

        Ok(GoogleTokens {
            access_token,
            id_token,
            refresh_token,
            expires_in: Utc::now()
                .timestamp_millis()
                .saturating_add(expires_in_secs.saturating_mul(1000)),
        })
    }
}

#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    exp: String,
}

/// Google OAuth API client.
#[derive(Clone)]
pub struct GoogleClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
}

impl GoogleClient {
    /// Create a new Google OAuth client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GoogleConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self.client.post(TOKEN_URL).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for GoogleClient {
    async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, AuthError> {
        let response = self
            .post_token(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("redirect_uri", REDIRECT_URI),
                ("grant_type", "authorization_code"),
            ])
            .await?;
        response.into_tokens(None)
    }

    async fn refresh(&self, tokens: &GoogleTokens) -> Result<GoogleTokens, AuthError> {
        let response = self
            .post_token(&[
                ("refresh_token", tokens.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        tracing::debug!("google tokens refreshed");
        response.into_tokens(Some(&tokens.refresh_token))
    }

    async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError> {
        let response = self
            .client
            .get(USER_INFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<String, AuthError> {
        let url = url::Url::parse_with_params(TOKEN_INFO_URL, &[("id_token", id_token)])
            .map_err(|e| AuthError::InvalidIdToken(e.to_string()))?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let info: TokenInfo = response.json().await?;
        check_token_info(&info, &self.client_id, Utc::now().timestamp())?;
        Ok(info.sub)
    }
}

fn check_token_info(info: &TokenInfo, client_id: &str, now_secs: i64) -> Result<(), AuthError> {
    if info.aud != client_id {
        return Err(AuthError::InvalidIdToken("audience mismatch".to_string()));
    }
    if !VALID_ISSUERS.contains(&info.iss.as_str()) {
        return Err(AuthError::InvalidIdToken(format!("unexpected issuer {}", info.iss)));
    }
    let exp: i64 = info
        .exp
        .parse()
        .map_err(|_| AuthError::InvalidIdToken("malformed expiry".to_string()))?;
    if exp <= now_secs {
        return Err(AuthError::InvalidIdToken("token expired".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(expires_in: i64) -> GoogleTokens {
        GoogleTokens {
            access_token: "at".to_string(),
            id_token: "it".to_string(),
            refresh_token: "rt".to_string(),
            expires_in,
        }
    }

    #[test]
    fn test_expiring_window() {
        let now = 1_000_000;
        assert!(tokens(now + 60_000).is_expiring(now));
        assert!(tokens(now - 1).is_expiring(now));
        assert!(!tokens(now + REFRESH_WINDOW_MS + 1).is_expiring(now));
    }

    #[test]
    fn test_expiring_window_at_extremes() {
        // Cookie contents are client supplied.
        let now = 1_700_000_000_000;
        assert!(tokens(i64::MIN).is_expiring(now));
        assert!(!tokens(i64::MAX).is_expiring(now));
        assert!(tokens(0).is_expiring(i64::MAX));
        assert!(!tokens(i64::MAX).is_expiring(i64::MIN));

        let session: GoogleTokens = serde_json::from_str(
            r#"{"accessToken":"at","idToken":"it","refreshToken":"rt","expiresIn":-9223372036854775808}"#,
        )
        .unwrap();
        assert!(session.is_expiring(now));
    }

    #[test]
    fn test_refresh_keeps_old_refresh_token() {
        let response = TokenResponse {
            access_token: Some("new-at".to_string()),
            id_token: Some("new-it".to_string()),
            refresh_token: None,
            expires_in: Some(3600),
        };
        let before = Utc::now().timestamp_millis();
        let refreshed = response.into_tokens(Some("old-rt")).unwrap();
        assert_eq!(refreshed.refresh_token, "old-rt");
        assert!(refreshed.expires_in >= before + 3_600_000);
    }

    #[test]
    fn test_code_exchange_requires_refresh_token() {
        let response = TokenResponse {
            access_token: Some("at".to_string()),
            id_token: Some("it".to_string()),
            refresh_token: None,
            expires_in: Some(3600),
        };
        assert!(matches!(
            response.into_tokens(None),
            Err(AuthError::MissingCredentials("refresh_token"))
        ));
    }

    #[test]
    fn test_token_info_checks() {
        let info = TokenInfo {
            aud: "client".to_string(),
            iss: "https://accounts.google.com".to_string(),
            sub: "123".to_string(),
            exp: "2000".to_string(),
        };
        assert!(check_token_info(&info, "client", 1000).is_ok());
        assert!(check_token_info(&info, "other", 1000).is_err());
        assert!(check_token_info(&info, "client", 3000).is_err());
    }

    #[test]
    fn test_tokens_serialize_camel_case() {
        let json = serde_json::to_value(tokens(42)).unwrap();
        assert_eq!(json["accessToken"], "at");
        assert_eq!(json["expiresIn"], 42);
    }
}
