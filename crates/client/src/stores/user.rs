//! Current account and sign-in state.

use cookbook_core::Account;

use crate::api::{ApiClient, ClientError};
use crate::cache::{QueryCache, QueryKey};

#[derive(Clone)]
pub struct UserStore {
    api: ApiClient,
    cache: QueryCache,
}

impl UserStore {
    #[must_use]
    pub const fn new(api: ApiClient, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.api.token().is_some()
    }

    /// The signed-in account, or `None` when there is no identity.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` when the stored identity no
    /// longer exists; the identity and cache are cleared.
    pub async fn current(&self) -> Result<Option<Account>, ClientError> {
        let Some(id) = self.api.token() else {
            return Ok(None);
        };

        let result = self
            .cache
            .fetch(QueryKey::Account(id.clone()), || self.api.get_account(&id))
            .await;

        match result {
            Ok(account) => Ok(Some(account)),
            Err(ClientError::Unauthorized) => {
                self.cache.clear().await;
                Err(ClientError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a demo account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns an error if bot verification fails or the request is rejected.
    pub async fn sign_up_demo(&self, recaptcha_token: &str) -> Result<Account, ClientError> {
        let account = self.api.create_demo_account(recaptcha_token).await?;
        self.signed_in(&account).await;
        Ok(account)
    }

    /// # Errors
    ///
    /// Returns an error if the Google account is not allowed in.
    pub async fn sign_in_with_google(&self, code: &str) -> Result<Account, ClientError> {
        let account = self.api.sign_in_with_google(code).await?;
        self.signed_in(&account).await;
        Ok(account)
    }

    /// Sign out and forget everything cached for the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the server could not be told; local state is
    /// cleared regardless.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.api.logout().await;
        self.cache.clear().await;
        result
    }

    /// Delete the signed-in account and everything in it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` without an identity, or the
    /// request's error.
    pub async fn delete_account(&self) -> Result<(), ClientError> {
        let id = self.api.token().ok_or(ClientError::Unauthorized)?;
        self.api.delete_account(&id).await?;
        self.cache.clear().await;
        Ok(())
    }

    async fn signed_in(&self, account: &Account) {
        // Anything cached belonged to the previous identity.
        self.cache.clear().await;
        self.cache
            .set(QueryKey::Account(account.id.clone()), account.clone())
            .await;
    }
}
