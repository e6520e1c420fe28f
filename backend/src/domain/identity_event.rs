//! Identity-provider event payloads and their resolution into projections.
//!
//! Events arrive as `{"type": "...", "data": {...}}` envelopes. Only the
//! user lifecycle kinds are decoded; every other kind is carried through as
//! [`IdentityEvent::Unhandled`] so the caller can acknowledge it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::user::{DisplayName, EmailAddress, UserId, UserProjection, UserValidationError};

/// Event type emitted when a provider user is created.
pub const USER_CREATED: &str = "user.created";
/// Event type emitted when a provider user is updated.
pub const USER_UPDATED: &str = "user.updated";
/// Event type emitted when a provider user is deleted.
pub const USER_DELETED: &str = "user.deleted";

/// Which upsert-shaped lifecycle event was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

impl UpsertKind {
    /// Wire name of the event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => USER_CREATED,
            Self::Updated => USER_UPDATED,
        }
    }
}

/// Decoded identity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// `user.created` or `user.updated`; both are applied as the same upsert.
    UserUpserted {
        kind: UpsertKind,
        payload: IdentityUserPayload,
    },
    /// `user.deleted`.
    UserDeleted(DeletedUserPayload),
    /// Any other event type.
    Unhandled { event_type: String },
}

/// Failure to decode an event body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed identity event: {message}")]
pub struct EventParseError {
    pub message: String,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

impl IdentityEvent {
    /// Decode an event envelope from raw JSON bytes.
    ///
    /// # Examples
    /// ```
    /// use quiz_backend::domain::IdentityEvent;
    ///
    /// let body = br#"{"type":"session.created","data":{}}"#;
    /// let event = IdentityEvent::parse(body).expect("valid envelope");
    /// assert!(matches!(event, IdentityEvent::Unhandled { .. }));
    /// ```
    pub fn parse(body: &[u8]) -> Result<Self, EventParseError> {
        let raw: RawEvent = serde_json::from_slice(body).map_err(|err| EventParseError {
            message: err.to_string(),
        })?;

        let upsert = |kind: UpsertKind, data: Value| {
            IdentityUserPayload::deserialize(data)
                .map(|payload| Self::UserUpserted { kind, payload })
                .map_err(|err| EventParseError {
                    message: format!("{}: {err}", kind.as_str()),
                })
        };

        match raw.event_type.as_str() {
            USER_CREATED => upsert(UpsertKind::Created, raw.data),
            USER_UPDATED => upsert(UpsertKind::Updated, raw.data),
            USER_DELETED => DeletedUserPayload::deserialize(raw.data)
                .map(Self::UserDeleted)
                .map_err(|err| EventParseError {
                    message: format!("{USER_DELETED}: {err}"),
                }),
            _ => Ok(Self::Unhandled {
                event_type: raw.event_type,
            }),
        }
    }

    /// Wire name of the event type.
    pub fn event_type(&self) -> &str {
        match self {
            Self::UserUpserted { kind, .. } => kind.as_str(),
            Self::UserDeleted(_) => USER_DELETED,
            Self::Unhandled { event_type } => event_type,
        }
    }
}

/// One entry of the provider's email address list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderEmail {
    /// Provider sub-identifier for this email entry.
    pub id: String,
    pub email_address: String,
}

/// User payload carried by created and updated events.
///
/// Timestamps are unix milliseconds as sent by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUserPayload {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ProviderEmail>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payload carried by `user.deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedUserPayload {
    pub id: String,
    #[serde(default)]
    pub deleted: Option<bool>,
}

impl DeletedUserPayload {
    /// Validated identifier of the deleted user.
    pub fn user_id(&self) -> Result<UserId, IdentityPayloadError> {
        UserId::new(self.id.clone()).map_err(IdentityPayloadError::InvalidUserId)
    }
}

/// Reasons a user payload cannot become a projection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityPayloadError {
    /// No usable email address was supplied.
    #[error("user {user_id} has no email address")]
    MissingEmail { user_id: String },
    #[error("invalid user id: {0}")]
    InvalidUserId(UserValidationError),
    #[error("invalid email address for user {user_id}")]
    InvalidEmail { user_id: String },
    #[error("{field} is not a valid millisecond timestamp")]
    InvalidTimestamp { field: &'static str },
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the display name from the provider fields.
///
/// Order: `first last`, first name, username, local part of the email, then
/// [`DisplayName::unknown`]. Blank values count as absent.
///
/// # Examples
/// ```
/// use quiz_backend::domain::resolve_display_name;
///
/// let name = resolve_display_name(None, None, Some("quizmaster"), None);
/// assert_eq!(name.as_ref(), "quizmaster");
/// ```
pub fn resolve_display_name(
    first_name: Option<&str>,
    last_name: Option<&str>,
    username: Option<&str>,
    email: Option<&EmailAddress>,
) -> DisplayName {
    let first = present(first_name);
    let last = present(last_name);

    let candidate = match (first, last) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_owned()),
        _ => present(username)
            .or_else(|| email.map(EmailAddress::local_part))
            .map(str::to_owned),
    };

    candidate
        .and_then(|name| DisplayName::new(name).ok())
        .unwrap_or_else(DisplayName::unknown)
}

fn millis(value: i64, field: &'static str) -> Result<DateTime<Utc>, IdentityPayloadError> {
    DateTime::from_timestamp_millis(value).ok_or(IdentityPayloadError::InvalidTimestamp { field })
}

impl IdentityUserPayload {
    /// Validated provider user identifier.
    pub fn user_id(&self) -> Result<UserId, IdentityPayloadError> {
        UserId::new(self.id.clone()).map_err(IdentityPayloadError::InvalidUserId)
    }

    /// Resolve the primary email address.
    ///
    /// Prefers the entry whose sub-identifier equals the user id, then the
    /// first entry. Entries with blank addresses are skipped.
    pub fn primary_email(&self) -> Result<EmailAddress, IdentityPayloadError> {
        let usable: Vec<&ProviderEmail> = self
            .email_addresses
            .iter()
            .filter(|entry| !entry.email_address.trim().is_empty())
            .collect();
        let chosen = usable
            .iter()
            .find(|entry| entry.id == self.id)
            .or_else(|| usable.first())
            .ok_or_else(|| IdentityPayloadError::MissingEmail {
                user_id: self.id.clone(),
            })?;

        EmailAddress::new(chosen.email_address.clone()).map_err(|_| {
            IdentityPayloadError::InvalidEmail {
                user_id: self.id.clone(),
            }
        })
    }

    /// Build the projection this payload describes.
    pub fn to_projection(&self) -> Result<UserProjection, IdentityPayloadError> {
        let id = self.user_id()?;
        let email = self.primary_email()?;
        let name = resolve_display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.username.as_deref(),
            Some(&email),
        );
        let avatar = self
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_owned);

        Ok(UserProjection {
            id,
            email,
            name,
            avatar,
            created_at: millis(self.created_at, "created_at")?,
            updated_at: millis(self.updated_at, "updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn payload() -> IdentityUserPayload {
        IdentityUserPayload {
            id: "user_1".to_owned(),
            email_addresses: vec![
                ProviderEmail {
                    id: "idn_a".to_owned(),
                    email_address: "first@example.com".to_owned(),
                },
                ProviderEmail {
                    id: "user_1".to_owned(),
                    email_address: "primary@example.com".to_owned(),
                },
            ],
            first_name: Some("Ada".to_owned()),
            last_name: Some("Lovelace".to_owned()),
            username: Some("ada".to_owned()),
            image_url: Some("https://img.example.com/ada.png".to_owned()),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_100_000,
        }
    }

    #[rstest]
    fn parses_created_event() {
        let body = json!({
            "type": "user.created",
            "object": "event",
            "data": {
                "id": "user_1",
                "email_addresses": [{"id": "idn_1", "email_address": "a@example.com"}],
                "first_name": "Ada",
                "last_name": null,
                "created_at": 1_700_000_000_000_i64,
                "updated_at": 1_700_000_000_000_i64,
                "unrelated": true
            }
        });
        let bytes = serde_json::to_vec(&body).expect("serialise");

        let event = IdentityEvent::parse(&bytes).expect("event parses");

        let IdentityEvent::UserUpserted { kind, payload } = event else {
            panic!("expected upsert event");
        };
        assert_eq!(kind, UpsertKind::Created);
        assert_eq!(payload.id, "user_1");
        assert_eq!(payload.first_name.as_deref(), Some("Ada"));
        assert!(payload.last_name.is_none());
    }

    #[rstest]
    fn parses_deleted_event() {
        let body =
            br#"{"type":"user.deleted","data":{"id":"user_1","deleted":true,"object":"user"}}"#;
        let event = IdentityEvent::parse(body).expect("event parses");
        assert_eq!(event.event_type(), USER_DELETED);
        let IdentityEvent::UserDeleted(payload) = event else {
            panic!("expected delete event");
        };
        assert_eq!(payload.user_id().expect("valid id").as_ref(), "user_1");
    }

    #[rstest]
    fn unknown_types_are_unhandled_without_decoding_data() {
        let body = br#"{"type":"organization.created","data":{"anything":[1,2,3]}}"#;
        let event = IdentityEvent::parse(body).expect("event parses");
        assert_eq!(
            event,
            IdentityEvent::Unhandled {
                event_type: "organization.created".to_owned()
            }
        );
    }

    #[rstest]
    #[case(b"not json".as_slice())]
    #[case(br#"{"data":{}}"#.as_slice())]
    #[case(br#"{"type":"user.updated","data":{"id":"user_1"}}"#.as_slice())]
    fn malformed_bodies_are_rejected(#[case] body: &[u8]) {
        assert!(IdentityEvent::parse(body).is_err());
    }

    #[rstest]
    fn primary_email_prefers_entry_matching_user_id(payload: IdentityUserPayload) {
        let email = payload.primary_email().expect("email resolves");
        assert_eq!(email.as_ref(), "primary@example.com");
    }

    #[rstest]
    fn primary_email_falls_back_to_first_entry(mut payload: IdentityUserPayload) {
        payload.email_addresses[1].id = "idn_b".to_owned();
        let email = payload.primary_email().expect("email resolves");
        assert_eq!(email.as_ref(), "first@example.com");
    }

    #[rstest]
    fn primary_email_skips_blank_entries(mut payload: IdentityUserPayload) {
        payload.email_addresses[1].email_address = "  ".to_owned();
        let email = payload.primary_email().expect("email resolves");
        assert_eq!(email.as_ref(), "first@example.com");
    }

    #[rstest]
    fn missing_email_is_reported(mut payload: IdentityUserPayload) {
        payload.email_addresses.clear();
        assert_eq!(
            payload.primary_email(),
            Err(IdentityPayloadError::MissingEmail {
                user_id: "user_1".to_owned()
            })
        );
    }

    #[rstest]
    #[case(Some("Ada"), Some("Lovelace"), Some("ada"), "Ada Lovelace")]
    #[case(Some(" Ada "), Some(" Lovelace "), None, "Ada Lovelace")]
    #[case(Some("Ada"), None, Some("ada"), "Ada")]
    #[case(Some("Ada"), Some("  "), None, "Ada")]
    #[case(None, Some("Lovelace"), Some("countess"), "countess")]
    #[case(Some(""), None, Some(" "), "ada.l")]
    fn display_name_resolution_order(
        #[case] first: Option<&str>,
        #[case] last: Option<&str>,
        #[case] username: Option<&str>,
        #[case] expected: &str,
    ) {
        let email = EmailAddress::new("ada.l@example.com").expect("valid email");
        let name = resolve_display_name(first, last, username, Some(&email));
        assert_eq!(name.as_ref(), expected);
    }

    #[rstest]
    fn display_name_falls_back_to_unknown_user() {
        let name = resolve_display_name(None, Some("Lovelace"), None, None);
        assert_eq!(name.as_ref(), crate::domain::user::UNKNOWN_USER_NAME);
    }

    #[rstest]
    fn projection_uses_payload_timestamps(payload: IdentityUserPayload) {
        let projection = payload.to_projection().expect("projection builds");

        assert_eq!(projection.name.as_ref(), "Ada Lovelace");
        assert_eq!(
            projection.avatar.as_deref(),
            Some("https://img.example.com/ada.png")
        );
        assert_eq!(projection.created_at.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(projection.updated_at.timestamp_millis(), 1_700_000_100_000);
    }

    #[rstest]
    fn blank_avatar_is_absent(mut payload: IdentityUserPayload) {
        payload.image_url = Some(String::new());
        let projection = payload.to_projection().expect("projection builds");
        assert!(projection.avatar.is_none());
    }

    #[rstest]
    fn blank_user_id_is_rejected(mut payload: IdentityUserPayload) {
        payload.id = String::new();
        assert!(matches!(
            payload.to_projection(),
            Err(IdentityPayloadError::InvalidUserId(_))
        ));
    }
}
