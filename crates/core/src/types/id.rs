//! Newtype IDs for type-safe entity references.
//!
//! Two flavours exist:
//!
//! - `define_id!` wraps a database-assigned `i32` serial (recipes). These ids
//!   are totally ordered, which is what cursor pagination relies on.
//! - `define_string_id!` wraps an application-generated string (accounts,
//!   users, shopping lists, tags).

use rand::Rng;

/// Macro to define a type-safe integer ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations, `FromStr`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use cookbook_core::define_id;
/// define_id!(DraftId);
///
/// let id = DraftId::new(7);
/// assert_eq!(id.as_i32(), 7);
/// assert_eq!("7".parse::<DraftId>().unwrap(), id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

/// Macro to define a type-safe string ID wrapper.
///
/// Same shape as [`define_id!`] but around an owned `String`, for ids the
/// application generates itself.
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(RecipeId);

define_string_id!(AccountId);
define_string_id!(UserId);
define_string_id!(ShoppingListId);
define_string_id!(TagId);

/// Generate a random lowercase hex id with an optional prefix.
///
/// Produces 16 hex digits (64 random bits) after the prefix.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let bits: u64 = rand::rng().random();
    format!("{prefix}{bits:016x}")
}

impl AccountId {
    /// Generate a fresh account id.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_id(""))
    }
}

impl UserId {
    /// Generate a fresh user id (`user` prefix).
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_id("user"))
    }
}

impl ShoppingListId {
    /// Generate a fresh shopping list id (`sl` prefix).
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_id("sl"))
    }
}

impl TagId {
    /// Composite tag key: tags are unique per account and name.
    #[must_use]
    pub fn compose(account: &AccountId, name: &str) -> Self {
        Self(format!("{account}:{name}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_have_prefix_and_length() {
        let user = UserId::generate();
        assert!(user.as_str().starts_with("user"));
        assert_eq!(user.as_str().len(), 4 + 16);

        let list = ShoppingListId::generate();
        assert!(list.as_str().starts_with("sl"));

        let account = AccountId::generate();
        assert!(account.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(AccountId::generate(), AccountId::generate());
    }

    #[test]
    fn test_tag_id_is_account_scoped() {
        let a = AccountId::new("acc1");
        let b = AccountId::new("acc2");
        assert_eq!(TagId::compose(&a, "vegan").as_str(), "acc1:vegan");
        assert_ne!(TagId::compose(&a, "vegan"), TagId::compose(&b, "vegan"));
    }

    #[test]
    fn test_recipe_id_parse_and_order() {
        assert_eq!(" 42 ".parse::<RecipeId>().unwrap(), RecipeId::new(42));
        assert!("abc".parse::<RecipeId>().is_err());
        assert!(RecipeId::new(1) < RecipeId::new(2));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&RecipeId::new(5)).unwrap();
        assert_eq!(json, "5");
        let json = serde_json::to_string(&AccountId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
