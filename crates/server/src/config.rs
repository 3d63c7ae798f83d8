//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the server runs against an in-memory store
//! with third-party integrations disabled when nothing is set.
//!
//! - `COOKBOOK_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string
//! - `COOKBOOK_HOST` - Bind address (default: 127.0.0.1)
//! - `COOKBOOK_PORT` - Listen port (default: 3000)
//! - `COOKBOOK_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `COOKBOOK_PAGE_SIZE` - Default recipe page size (default: 20)
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` - Google sign-in
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` - Image host
//! - `RECAPTCHA_SECRET_KEY` - reCAPTCHA site-verify secret
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use cookbook_core::PageLimit;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password). `None`
    /// selects the in-memory store.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https` enables secure cookies
    pub base_url: String,
    /// Default recipe page size
    pub page_size: PageLimit,
    /// Google OAuth client, when sign-in is enabled
    pub google: Option<GoogleConfig>,
    /// Cloudinary credentials, when image hosting is enabled
    pub cloudinary: Option<CloudinaryConfig>,
    /// reCAPTCHA secret; empty rejects every verification
    pub recaptcha_secret: SecretString,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Google OAuth client credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Cloudinary API credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, if only part of a
    /// credential group is set, or if a secret fails validation
    /// (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("COOKBOOK_DATABASE_URL");
        let host = get_env_or_default("COOKBOOK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("COOKBOOK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("COOKBOOK_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("COOKBOOK_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("COOKBOOK_BASE_URL", "http://localhost:3000");
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("COOKBOOK_BASE_URL".to_string(), e.to_string())
        })?;
        let page_size = get_env_or_default("COOKBOOK_PAGE_SIZE", "20")
            .parse::<u32>()
            .map(PageLimit::new)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("COOKBOOK_PAGE_SIZE".to_string(), e.to_string())
            })?;

        let google = GoogleConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;

        let recaptcha_secret = match get_optional_env("RECAPTCHA_SECRET_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "RECAPTCHA_SECRET_KEY")?;
                SecretString::from(value)
            }
            None => SecretString::from(""),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            page_size,
            google,
            cloudinary,
            recaptcha_secret,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Local configuration with every integration disabled and the
    /// in-memory store selected.
    #[must_use]
    pub fn development() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            page_size: PageLimit::default(),
            google: None,
            cloudinary: None,
            recaptcha_secret: SecretString::from(""),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl GoogleConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some((client_id, client_secret)) =
            get_pair("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET")?
        else {
            return Ok(None);
        };
        validate_secret_strength(&client_secret, "GOOGLE_CLIENT_SECRET")?;
        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
        }))
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cloud_name = get_optional_env("CLOUDINARY_CLOUD_NAME");
        let Some((api_key, api_secret)) =
            get_pair("CLOUDINARY_API_KEY", "CLOUDINARY_API_SECRET")?
        else {
            return match cloud_name {
                Some(_) => Err(ConfigError::MissingEnvVar("CLOUDINARY_API_KEY".to_string())),
                None => Ok(None),
            };
        };
        let cloud_name = cloud_name
            .ok_or_else(|| ConfigError::MissingEnvVar("CLOUDINARY_CLOUD_NAME".to_string()))?;
        validate_secret_strength(&api_secret, "CLOUDINARY_API_SECRET")?;
        Ok(Some(Self {
            cloud_name,
            api_key,
            api_secret: SecretString::from(api_secret),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Two variables that must be set together or not at all.
fn get_pair(first: &str, second: &str) -> Result<Option<(String, String)>, ConfigError> {
    match (get_optional_env(first), get_optional_env(second)) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingEnvVar(second.to_string())),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar(first.to_string())),
    }
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the value issued by the provider."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-client-secret", "GOOGLE_CLIENT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaa", "CLOUDINARY_API_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("GOCSPX-9fQ2kLm7Zr4Tx8VbN1cWj", "GOOGLE_CLIENT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = ServerConfig::development();
        assert!(config.database_url.is_none());
        assert!(config.google.is_none());
        assert!(!config.secure_cookies());
        assert_eq!(config.page_size.get(), 20);

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_https_base_url_enables_secure_cookies() {
        let config = ServerConfig {
            base_url: "https://cookbook.example.org".to_string(),
            ..ServerConfig::development()
        };
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let google = GoogleConfig {
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_secret_google"),
        };
        let cloudinary = CloudinaryConfig {
            cloud_name: "demo-cloud".to_string(),
            api_key: "1234".to_string(),
            api_secret: SecretString::from("super_secret_cloudinary"),
        };

        let debug_output = format!("{google:?} {cloudinary:?}");
        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("demo-cloud"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_google"));
        assert!(!debug_output.contains("super_secret_cloudinary"));
    }
}
