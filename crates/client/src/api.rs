//! HTTP client for the cookbook API.
//!
//! Every call sends `Authorization: Basic <accountId>` once a token is set.
//! Failures carry a message fit to show the user; nothing is retried.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use cookbook_core::{
    Account, AccountId, Recipe, RecipeDraft, RecipeId, RecipePage, RecipeSummary, ShoppingItem,
    ShoppingList, ShoppingListId,
};

/// Errors returned by API calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("{message}")]
    Http {
        message: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{message} ({status})")]
    Status { status: u16, message: &'static str },

    /// The stored identity is no longer valid.
    #[error("Please sign in again.")]
    Unauthorized,

    /// The response body did not have the expected shape.
    #[error("{message}")]
    Decode {
        message: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The base URL could not be combined with a path.
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Message suitable for display.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Http { message, .. }
            | Self::Status { message, .. }
            | Self::Decode { message, .. } => *message,
            Self::Unauthorized => "Please sign in again.",
            Self::Url(_) => "The cookbook service is misconfigured.",
        }
    }

    /// HTTP status of a rejected call.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// Parameters for one page of the recipe list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams {
    pub search: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody<'a> {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_demo_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ItemsBody<'a> {
    items: &'a [ShoppingItem],
}

#[derive(Debug, Deserialize)]
struct Generated {
    created: usize,
}

/// Cookbook API client.
///
/// Cheap to clone; clones share the identity token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<AccountId>>,
}

impl ApiClient {
    /// Create a client for the API at `base_url` (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|source| ClientError::Http {
                message: "Could not start the HTTP client.",
                source,
            })?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                token: RwLock::new(None),
            }),
        })
    }

    /// The account the client acts for.
    #[must_use]
    pub fn token(&self) -> Option<AccountId> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: Option<AccountId>) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, ClientError> {
        let mut url = self.inner.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let mut builder = self.inner.client.request(method, url);
        if let Some(token) = self.token() {
            builder = builder.header(header::AUTHORIZATION, format!("Basic {token}"));
        }
        Ok(builder)
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        message: &'static str,
    ) -> Result<reqwest::Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Http { message, source })?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), detail = %detail, "API call failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        message: &'static str,
    ) -> Result<T, ClientError> {
        self.send(builder, message)
            .await?
            .json()
            .await
            .map_err(|source| ClientError::Decode { message, source })
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// One page of the caller's recipes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn list_recipes(
        &self,
        params: &ListParams,
        cursor: Option<RecipeId>,
    ) -> Result<RecipePage, ClientError> {
        let mut query = vec![("resource", "recipes".to_string())];
        if !params.search.trim().is_empty() {
            query.push(("search", params.search.clone()));
        }
        if let Some(category) = &params.category {
            query.push(("category", category.clone()));
        }
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let builder = self.request(Method::GET, "/api/recipes", &query)?;
        self.send_json(builder, "Could not load recipes.").await
    }

    /// Up to three random recipes, optionally from one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn recipe_selection(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<RecipeSummary>, ClientError> {
        let mut query = vec![
            ("resource", "recipes".to_string()),
            ("mode", "selection".to_string()),
        ];
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }

        let builder = self.request(Method::GET, "/api/recipes", &query)?;
        self.send_json(builder, "Could not load recipe suggestions.")
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn get_recipe(&self, id: RecipeId) -> Result<Recipe, ClientError> {
        let query = [("resource", "recipes".to_string()), ("id", id.to_string())];
        let builder = self.request(Method::GET, "/api/recipes", &query)?;
        self.send_json(builder, "Could not load the recipe.").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_recipe(&self, draft: &RecipeDraft) -> Result<Recipe, ClientError> {
        let query = [("resource", "recipes".to_string())];
        let builder = self
            .request(Method::POST, "/api/recipes", &query)?
            .json(draft);
        self.send_json(builder, "Could not save the recipe.").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, draft))]
    pub async fn update_recipe(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<Recipe, ClientError> {
        let query = [("resource", "recipes".to_string()), ("id", id.to_string())];
        let builder = self
            .request(Method::PUT, "/api/recipes", &query)?
            .json(draft);
        self.send_json(builder, "Could not update the recipe.").await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn delete_recipe(&self, id: RecipeId) -> Result<(), ClientError> {
        let query = [("resource", "recipes".to_string()), ("id", id.to_string())];
        let builder = self.request(Method::DELETE, "/api/recipes", &query)?;
        self.send(builder, "Could not delete the recipe.").await?;
        Ok(())
    }

    /// Add the bundled example recipes to the account. Returns how many
    /// were created.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn generate_recipes(&self) -> Result<usize, ClientError> {
        let query = [
            ("resource", "recipes".to_string()),
            ("mode", "generate".to_string()),
        ];
        let builder = self.request(Method::POST, "/api/recipes", &query)?;
        let generated: Generated = self
            .send_json(builder, "Could not add example recipes.")
            .await?;
        Ok(generated.created)
    }

    // =========================================================================
    // Shopping list
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn get_shopping_list(&self) -> Result<ShoppingList, ClientError> {
        let builder = self.request(Method::GET, "/api/shopping-list", &[])?;
        self.send_json(builder, "Could not load the shopping list.")
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn update_shopping_list(
        &self,
        id: &ShoppingListId,
        items: &[ShoppingItem],
    ) -> Result<ShoppingList, ClientError> {
        let query = [("id", id.to_string())];
        let builder = self
            .request(Method::PUT, "/api/shopping-list", &query)?
            .json(&ItemsBody { items });
        self.send_json(builder, "Could not update the shopping list.")
            .await
    }

    // =========================================================================
    // User
    // =========================================================================

    /// Fetch an account. A 404 means the stored identity points at a deleted
    /// account, so the token is cleared.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` when the account is gone or the
    /// token is rejected.
    pub async fn get_account(&self, id: &AccountId) -> Result<Account, ClientError> {
        let query = [("id", id.to_string())];
        let builder = self.request(Method::GET, "/api/user", &query)?;
        match self.send_json(builder, "Could not load your account.").await {
            Err(ClientError::Status { status: 404, .. } | ClientError::Unauthorized) => {
                tracing::info!(account_id = %id, "stored identity is gone, signing out");
                self.set_token(None);
                Err(ClientError::Unauthorized)
            }
            other => other,
        }
    }

    /// Create a demo account and act for it from now on.
    ///
    /// # Errors
    ///
    /// Returns an error if bot verification fails or the request is rejected.
    #[instrument(skip(self, recaptcha_token))]
    pub async fn create_demo_account(&self, recaptcha_token: &str) -> Result<Account, ClientError> {
        let body = SignInBody {
            is_demo_user: true,
            recaptcha_token: Some(recaptcha_token),
            google_code: None,
        };
        let builder = self.request(Method::POST, "/api/user", &[])?.json(&body);
        let account: Account = self
            .send_json(builder, "Could not create a demo account.")
            .await?;
        self.set_token(Some(account.id.clone()));
        Ok(account)
    }

    /// Sign in with a Google authorization code and act for that account.
    ///
    /// # Errors
    ///
    /// Returns an error if verification fails.
    #[instrument(skip(self, code))]
    pub async fn sign_in_with_google(&self, code: &str) -> Result<Account, ClientError> {
        let body = SignInBody {
            is_demo_user: false,
            recaptcha_token: None,
            google_code: Some(code),
        };
        let builder = self.request(Method::POST, "/api/user", &[])?.json(&body);
        let account: Account = self
            .send_json(builder, "User verification failed.")
            .await?;
        self.set_token(Some(account.id.clone()));
        Ok(account)
    }

    /// Forget the identity and ask the server to clear session cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the token is cleared regardless.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.set_token(None);
        let query = [("logout", "true".to_string())];
        let builder = self.request(Method::GET, "/api/user", &query)?;
        self.send(builder, "Could not sign out.").await?;
        Ok(())
    }

    /// Delete the account and everything in it, then sign out.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: &AccountId) -> Result<(), ClientError> {
        let query = [("id", id.to_string())];
        let builder = self.request(Method::DELETE, "/api/user", &query)?;
        self.send(builder, "Could not delete your account.").await?;
        self.set_token(None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_carry_token() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let request = client
            .request(Method::GET, "/api/recipes", &[])
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get(header::AUTHORIZATION).is_none());

        client.set_token(Some(AccountId::new("acc-1")));
        let request = client
            .request(Method::GET, "/api/recipes", &[("id", "4".to_string())])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(header::AUTHORIZATION).unwrap(),
            "Basic acc-1"
        );
        assert_eq!(
            request.url().as_str(),
            "http://localhost:3000/api/recipes?id=4"
        );
    }

    #[test]
    fn test_clones_share_token() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let clone = client.clone();
        client.set_token(Some(AccountId::new("acc-2")));
        assert_eq!(clone.token(), Some(AccountId::new("acc-2")));
    }

    #[test]
    fn test_sign_in_body_omits_unused_fields() {
        let body = SignInBody {
            is_demo_user: false,
            recaptcha_token: None,
            google_code: Some("code"),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"googleCode":"code"}"#
        );
    }

    #[test]
    fn test_user_messages() {
        let err = ClientError::Status {
            status: 403,
            message: "Could not delete the recipe.",
        };
        assert_eq!(err.user_message(), "Could not delete the recipe.");
        assert_eq!(err.status(), Some(403));
        assert_eq!(ClientError::Unauthorized.status(), Some(401));
    }
}
