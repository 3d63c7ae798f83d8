//! Authentication service.
//!
//! Resolves the calling account from a session cookie and performs the
//! Google sign-in flow. Demo sessions carry the account id directly; Google
//! sessions are verified against the provider on every request, with a
//! token refresh first when the access token is about to expire.

mod error;
mod google;

pub use error::AuthError;
pub use google::{GoogleClient, GoogleTokens, GoogleUserInfo, IdentityProvider, REFRESH_WINDOW_MS};

use chrono::Utc;

use cookbook_core::{Account, AccountId, Email, UserProfile};

use crate::db::Store;
use crate::session::Session;

/// Account resolved from a session, plus replacement tokens when a refresh
/// happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub account_id: AccountId,
    pub refreshed: Option<GoogleTokens>,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    identity: Option<&'a dyn IdentityProvider>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, identity: Option<&'a dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn provider(&self) -> Result<&'a dyn IdentityProvider, AuthError> {
        self.identity.ok_or(AuthError::ProviderDisabled)
    }

    /// Map a decoded session to the owning account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if Google verification fails or no user is linked
    /// to the verified subject.
    pub async fn resolve(&self, session: &Session) -> Result<ResolvedSession, AuthError> {
        match session {
            Session::Demo { demo_user_id } => Ok(ResolvedSession {
                account_id: demo_user_id.clone(),
                refreshed: None,
            }),
            Session::Google(tokens) => {
                let provider = self.provider()?;

                let refreshed = if tokens.is_expiring(Utc::now().timestamp_millis()) {
                    Some(provider.refresh(tokens).await?)
                } else {
                    None
                };
                let id_token = refreshed.as_ref().unwrap_or(tokens).id_token.as_str();
                let subject = provider.verify_id_token(id_token).await?;

                let user = self
                    .store
                    .find_user_by_google_id(&subject)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;

                Ok(ResolvedSession {
                    account_id: user.account_id,
                    refreshed,
                })
            }
        }
    }

    /// Exchange an authorization code and sign in a pre-registered user.
    ///
    /// Only users whose email was registered beforehand may sign in; their
    /// profile fields are refreshed from Google on every login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotRegistered` when no user has the Google
    /// account's email, or any provider/database failure.
    pub async fn login_with_google(
        &self,
        code: &str,
    ) -> Result<(Account, GoogleTokens), AuthError> {
        let provider = self.provider()?;

        let tokens = provider.exchange_code(code).await?;
        let info = provider.user_info(&tokens.access_token).await?;
        let email = Email::parse(info.email.as_deref().unwrap_or_default())?;

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::NotRegistered)?;

        let profile = UserProfile {
            first_name: info.given_name,
            last_name: info.family_name,
            display_name: info.name,
            profile_image: info.picture,
            google_id: info.sub,
        };
        let user = self.store.update_user_profile(&user.id, &profile).await?;
        tracing::info!(user_id = %user.id, account_id = %user.account_id, "google sign-in");

        let account = self
            .store
            .get_account(&user.account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok((account, tokens))
    }
}
