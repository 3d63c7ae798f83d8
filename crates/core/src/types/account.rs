//! Accounts and the users living under them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Email, UserId};

/// Top-level tenant. Owns users, recipes, tags and one shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub users: Vec<User>,
    pub created_at: DateTime<Utc>,
}

/// A person using an account (an account may be shared, e.g. by a family).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub account_id: AccountId,
    pub email: Option<Email>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    pub google_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields copied from the identity provider on sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    pub google_id: String,
}

impl User {
    /// A bare user row, as created for demo and test accounts.
    #[must_use]
    pub fn blank(id: UserId, account_id: AccountId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            email: None,
            first_name: None,
            last_name: None,
            display_name: None,
            profile_image: None,
            google_id: None,
            created_at,
        }
    }

    /// Overwrite the provider-owned profile fields.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        self.first_name.clone_from(&profile.first_name);
        self.last_name.clone_from(&profile.last_name);
        self.display_name.clone_from(&profile.display_name);
        self.profile_image.clone_from(&profile.profile_image);
        self.google_id = Some(profile.google_id.clone());
    }
}
