//! Cloudinary Admin API client for per-account image folders.
//!
//! Every account gets a folder `cookbook/demo/{accountId}` that the browser
//! uploads recipe photos into. The server only creates and removes folders
//! and deletes images that a recipe no longer references.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use cookbook_core::AccountId;

use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Root under which account folders live.
const FOLDER_ROOT: &str = "cookbook/demo";

/// Errors that can occur when interacting with the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Request URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Image folder and asset management.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Create a folder; succeeds if it already exists.
    async fn create_folder(&self, path: &str) -> Result<(), ImageHostError>;

    async fn delete_folder(&self, path: &str) -> Result<(), ImageHostError>;

    /// Delete an uploaded image by its public id.
    async fn destroy_image(&self, public_id: &str) -> Result<(), ImageHostError>;
}

/// Folder that holds an account's images.
#[must_use]
pub fn account_folder(account: &AccountId) -> String {
    format!("{FOLDER_ROOT}/{account}")
}

/// Cloudinary Admin API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{BASE_URL}/{}/{path}", self.cloud_name)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(), ImageHostError> {
        let response = request
            .basic_auth(&self.api_key, Some(self.api_secret.expose_secret()))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn create_folder(&self, path: &str) -> Result<(), ImageHostError> {
        let url = self.endpoint(&format!("folders/{path}"));
        self.send(self.client.post(url)).await?;
        tracing::debug!(folder = path, "image folder ensured");
        Ok(())
    }

    async fn delete_folder(&self, path: &str) -> Result<(), ImageHostError> {
        // Folders must be empty before they can be removed.
        let resources = url::Url::parse_with_params(
            &self.endpoint("resources/image/upload"),
            &[("prefix", format!("{path}/"))],
        )?;
        self.send(self.client.delete(resources)).await?;

        let url = self.endpoint(&format!("folders/{path}"));
        self.send(self.client.delete(url)).await
    }

    async fn destroy_image(&self, public_id: &str) -> Result<(), ImageHostError> {
        let url = url::Url::parse_with_params(
            &self.endpoint("resources/image/upload"),
            &[("public_ids[]", public_id)],
        )?;
        self.send(self.client.delete(url)).await
    }
}

/// Image host used when Cloudinary is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImageHost;

#[async_trait]
impl ImageHost for NoopImageHost {
    async fn create_folder(&self, path: &str) -> Result<(), ImageHostError> {
        tracing::debug!(folder = path, "image host disabled, skipping folder create");
        Ok(())
    }

    async fn delete_folder(&self, path: &str) -> Result<(), ImageHostError> {
        tracing::debug!(folder = path, "image host disabled, skipping folder delete");
        Ok(())
    }

    async fn destroy_image(&self, public_id: &str) -> Result<(), ImageHostError> {
        tracing::debug!(public_id, "image host disabled, skipping destroy");
        Ok(())
    }
}
