//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the strongly typed entities shared by the HTTP adapters
//! and the persistence and cache adapters, plus the services that implement
//! the driving ports. Transport and storage details stay outside this module.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - TraceId: per-request correlation identifier.
//! - User projection types and identity event payloads.
//! - WebhookVerifier: signature and replay checks for identity deliveries.
//! - Quiz aggregates and the cache key scheme.
//! - IdentitySyncService and QuizService: driving port implementations.

pub mod cache_key;
pub mod error;
pub mod identity_event;
pub mod identity_sync;
pub mod ports;
pub mod quiz;
pub mod quiz_service;
pub mod read_through_cache;
pub mod trace_id;
pub mod user;
pub mod webhook_verification;

pub use self::cache_key::{CacheKey, CacheNamespace};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identity_event::{
    DeletedUserPayload, EventParseError, IdentityEvent, IdentityPayloadError, IdentityUserPayload,
    ProviderEmail, USER_CREATED, USER_DELETED, USER_UPDATED, UpsertKind, resolve_display_name,
};
pub use self::identity_sync::{IdentitySyncService, SyncError, SyncOperation, SyncOutcome};
pub use self::quiz::{
    AnswerSubmission, AttemptCompletion, AttemptId, AttemptStart, AttemptSummary,
    LEADERBOARD_LIMIT, LeaderboardEntry, PUBLIC_QUIZ_LIMIT, Question, QuestionDraft, QuestionId,
    QuestionType, Quiz, QuizChanges, QuizDetail, QuizDraft, QuizId, QuizRevision, QuizSource,
    QuizStatus, QuizValidationError, UnknownVariant,
};
pub use self::quiz_service::QuizService;
pub use self::read_through_cache::{CacheUnavailable, ReadThroughCache};
pub use self::trace_id::TraceId;
pub use self::user::{
    DELETED_EMAIL_DOMAIN, DisplayName, EmailAddress, UNKNOWN_USER_NAME, UserId, UserProjection,
    UserValidationError,
};
pub use self::webhook_verification::{
    DEFAULT_TOLERANCE_SECS, SigningSecret, SigningSecretError, VerificationError,
    VerifiedEnvelope, WEBHOOK_ID_HEADER, WEBHOOK_SIGNATURE_HEADER, WEBHOOK_TIMESTAMP_HEADER,
    WebhookHeaders, WebhookVerifier,
};

/// HTTP header name used to propagate trace identifiers.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use quiz_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
