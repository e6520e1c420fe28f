//! Local projection of identity-provider users.
//!
//! The identity provider owns user identity; this crate keeps a derived copy
//! in the `users` table so quizzes and attempts can reference it. Only the
//! identity synchroniser writes these records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback display name when the provider supplies nothing usable.
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Domain of the placeholder email written when a user is soft deleted.
///
/// `.invalid` is reserved (RFC 2606) so the address can never be delivered.
pub const DELETED_EMAIL_DOMAIN: &str = "deleted.invalid";

/// Validation errors returned by the user value constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("user id must not be empty")]
    EmptyId,
    #[error("user id must not contain surrounding whitespace")]
    InvalidId,
    #[error("email address must contain a local part and a domain")]
    InvalidEmail,
    #[error("display name must not be empty")]
    EmptyDisplayName,
}

/// Identity-provider issued user identifier (for example `user_2abc`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    ///
    /// # Examples
    /// ```
    /// use quiz_backend::domain::UserId;
    ///
    /// let id = UserId::new("user_2abc").expect("valid id");
    /// assert_eq!(id.as_ref(), "user_2abc");
    /// assert!(UserId::new(" user_2abc").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address stored on the projection.
///
/// Validation is deliberately shallow: the provider has already verified the
/// address, so only the `local@domain` shape is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`].
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        let email = email.into();
        let trimmed = email.trim();
        match trimmed.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(UserValidationError::InvalidEmail),
        }
    }

    /// Placeholder address written when a user is soft deleted.
    ///
    /// Embedding the user id keeps sentinels unique across deleted users.
    ///
    /// # Examples
    /// ```
    /// use quiz_backend::domain::{EmailAddress, UserId};
    ///
    /// let id = UserId::new("user_42").expect("valid id");
    /// let sentinel = EmailAddress::deleted_sentinel(&id);
    /// assert_eq!(sentinel.as_ref(), "deleted_user_42@deleted.invalid");
    /// ```
    pub fn deleted_sentinel(id: &UserId) -> Self {
        Self(format!("deleted_{id}@{DELETED_EMAIL_DOMAIN}"))
    }

    /// Portion of the address before the first `@`.
    pub fn local_part(&self) -> &str {
        self.0
            .split_once('@')
            .map_or(self.0.as_str(), |(local, _)| local)
    }

    /// Whether this address is a soft-delete sentinel.
    #[cfg(test)]
    pub(crate) fn is_deleted_sentinel(&self) -> bool {
        self.0.starts_with("deleted_") && self.0.ends_with(DELETED_EMAIL_DOMAIN)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Human readable display name; never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`], trimming surrounding space.
    pub fn new(name: impl Into<String>) -> Result<Self, UserValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The `"Unknown User"` fallback.
    pub fn unknown() -> Self {
        Self(UNKNOWN_USER_NAME.to_owned())
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Locally stored copy of a provider user.
///
/// ## Invariants
/// - At most one projection exists per [`UserId`].
/// - `updated_at` only moves forward; writers compare it before applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProjection {
    pub id: UserId,
    pub email: EmailAddress,
    pub name: DisplayName,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
