//! Authenticity checks for identity-provider webhook deliveries.
//!
//! Deliveries carry three headers: a message id, a unix-seconds timestamp,
//! and a space-separated list of `v1,<base64>` signatures. Each signature is
//! an HMAC-SHA256 over `"{id}.{timestamp}.{body}"` keyed with the decoded
//! signing secret. A delivery is accepted when any `v1` entry matches and the
//! timestamp lies within the replay tolerance of the injected clock.
//!
//! Verification is pure: the body is decoded into an [`IdentityEvent`] only
//! after the signature has been checked.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use mockable::Clock;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::identity_event::IdentityEvent;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery's unique message id.
pub const WEBHOOK_ID_HEADER: &str = "svix-id";
/// Header carrying the delivery timestamp in unix seconds.
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "svix-timestamp";
/// Header carrying the space-separated signature list.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "svix-signature";

/// Maximum distance, in seconds, between the delivery timestamp and now.
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";
const FINGERPRINT_BYTES: usize = 8;

/// Errors raised while decoding the configured signing secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningSecretError {
    #[error("signing secret is empty")]
    Empty,
    #[error("signing secret is not valid base64")]
    InvalidEncoding,
}

/// Decoded webhook signing key.
///
/// Raw key bytes are wiped as soon as the keyed MAC state has been derived.
/// `Debug` prints only the fingerprint.
#[derive(Clone)]
pub struct SigningSecret {
    mac: HmacSha256,
    fingerprint: String,
}

impl SigningSecret {
    /// Decode a `whsec_<base64>` secret. The prefix is optional.
    ///
    /// # Examples
    /// ```
    /// use quiz_backend::domain::SigningSecret;
    ///
    /// let secret = SigningSecret::parse("whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw").expect("valid");
    /// assert_eq!(secret.fingerprint().len(), 16);
    /// assert!(SigningSecret::parse("whsec_!!!").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, SigningSecretError> {
        let encoded = raw.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        if encoded.is_empty() {
            return Err(SigningSecretError::Empty);
        }

        let mut key = STANDARD
            .decode(encoded)
            .map_err(|_| SigningSecretError::InvalidEncoding)?;
        if key.is_empty() {
            return Err(SigningSecretError::Empty);
        }

        let fingerprint = hex::encode(&Sha256::digest(&key)[..FINGERPRINT_BYTES]);
        let mac = HmacSha256::new_from_slice(&key);
        key.zeroize();

        // HMAC accepts keys of any length; the error arm is unreachable in practice.
        let mac = mac.map_err(|_| SigningSecretError::Empty)?;
        Ok(Self { mac, fingerprint })
    }

    /// Truncated SHA-256 of the key, safe to log for rotation checks.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Raw delivery headers as received by the inbound adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookHeaders<'a> {
    pub message_id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

/// Reasons a delivery is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("missing required header {name}")]
    MissingHeader { name: &'static str },
    #[error("webhook timestamp is not a unix-seconds integer")]
    MalformedTimestamp,
    #[error("webhook timestamp is outside the accepted tolerance")]
    TimestampOutOfTolerance,
    #[error("webhook signature header has no usable v1 entry")]
    MalformedSignature,
    #[error("webhook signature does not match")]
    SignatureMismatch,
    #[error("webhook payload is malformed: {message}")]
    MalformedPayload { message: String },
}

/// A delivery whose signature and timestamp have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEnvelope {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: IdentityEvent,
}

/// Verifies webhook deliveries against a configured secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SigningSecret,
    clock: Arc<dyn Clock>,
    tolerance_secs: u64,
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, VerificationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(VerificationError::MissingHeader { name })
}

impl WebhookVerifier {
    /// Create a verifier using [`DEFAULT_TOLERANCE_SECS`].
    pub fn new(secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            clock,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Override the replay tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Check a delivery and decode its event.
    pub fn verify(
        &self,
        headers: &WebhookHeaders<'_>,
        body: &[u8],
    ) -> Result<VerifiedEnvelope, VerificationError> {
        let message_id = required(headers.message_id, WEBHOOK_ID_HEADER)?;
        let raw_timestamp = required(headers.timestamp, WEBHOOK_TIMESTAMP_HEADER)?;
        let signatures = required(headers.signature, WEBHOOK_SIGNATURE_HEADER)?;

        let seconds: i64 = raw_timestamp
            .parse()
            .map_err(|_| VerificationError::MalformedTimestamp)?;
        let timestamp =
            DateTime::from_timestamp(seconds, 0).ok_or(VerificationError::MalformedTimestamp)?;

        let now = self.clock.utc().timestamp();
        if now.abs_diff(seconds) > self.tolerance_secs {
            return Err(VerificationError::TimestampOutOfTolerance);
        }

        let mac = self.keyed(message_id, seconds, body);
        let candidates: Vec<Vec<u8>> = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, encoded)| STANDARD.decode(encoded).ok())
            .collect();
        if candidates.is_empty() {
            return Err(VerificationError::MalformedSignature);
        }
        let matched = candidates
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
        if !matched {
            return Err(VerificationError::SignatureMismatch);
        }

        let event = IdentityEvent::parse(body).map_err(|err| VerificationError::MalformedPayload {
            message: err.message,
        })?;

        Ok(VerifiedEnvelope {
            message_id: message_id.to_owned(),
            timestamp,
            event,
        })
    }

    /// Produce a `v1,<base64>` signature entry for the given delivery.
    ///
    /// Used by tests and tooling that replay deliveries locally.
    pub fn sign(&self, message_id: &str, timestamp: i64, body: &[u8]) -> String {
        let tag = self.keyed(message_id, timestamp, body).finalize().into_bytes();
        format!("{SIGNATURE_VERSION},{}", STANDARD.encode(tag))
    }

    fn keyed(&self, message_id: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
        let mut mac = self.secret.mac.clone();
        mac.update(message_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use rstest::{fixture, rstest};

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
    const NOW: i64 = 1_700_000_000;
    const BODY: &[u8] = br#"{"type":"user.deleted","data":{"id":"user_1","deleted":true}}"#;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[fixture]
    fn verifier() -> WebhookVerifier {
        let secret = SigningSecret::parse(SECRET).expect("valid secret");
        let now = Utc.timestamp_opt(NOW, 0).single().expect("valid instant");
        WebhookVerifier::new(secret, Arc::new(FixedClock(now)))
    }

    fn headers<'a>(id: &'a str, ts: &'a str, sig: &'a str) -> WebhookHeaders<'a> {
        WebhookHeaders {
            message_id: Some(id),
            timestamp: Some(ts),
            signature: Some(sig),
        }
    }

    #[rstest]
    fn accepts_a_correctly_signed_delivery(verifier: WebhookVerifier) {
        let sig = verifier.sign("msg_1", NOW, BODY);
        let ts = NOW.to_string();

        let envelope = verifier
            .verify(&headers("msg_1", &ts, &sig), BODY)
            .expect("delivery verifies");

        assert_eq!(envelope.message_id, "msg_1");
        assert_eq!(envelope.timestamp.timestamp(), NOW);
        assert!(matches!(envelope.event, IdentityEvent::UserDeleted(_)));
    }

    #[rstest]
    fn accepts_when_any_listed_signature_matches(verifier: WebhookVerifier) {
        let good = verifier.sign("msg_1", NOW, BODY);
        let list = format!("v1,AAAA v2,ignored {good}");
        let ts = NOW.to_string();

        assert!(verifier.verify(&headers("msg_1", &ts, &list), BODY).is_ok());
    }

    #[rstest]
    fn rejects_tampered_body(verifier: WebhookVerifier) {
        let sig = verifier.sign("msg_1", NOW, BODY);
        let ts = NOW.to_string();
        let tampered = br#"{"type":"user.deleted","data":{"id":"user_2","deleted":true}}"#;

        let result = verifier.verify(&headers("msg_1", &ts, &sig), tampered);

        assert_eq!(result, Err(VerificationError::SignatureMismatch));
    }

    #[rstest]
    fn rejects_signature_bound_to_another_message_id(verifier: WebhookVerifier) {
        let sig = verifier.sign("msg_1", NOW, BODY);
        let ts = NOW.to_string();

        let result = verifier.verify(&headers("msg_2", &ts, &sig), BODY);

        assert_eq!(result, Err(VerificationError::SignatureMismatch));
    }

    #[rstest]
    #[case(NOW - 301)]
    #[case(NOW + 301)]
    fn rejects_replays_outside_tolerance(verifier: WebhookVerifier, #[case] sent_at: i64) {
        let sig = verifier.sign("msg_1", sent_at, BODY);
        let ts = sent_at.to_string();

        let result = verifier.verify(&headers("msg_1", &ts, &sig), BODY);

        assert_eq!(result, Err(VerificationError::TimestampOutOfTolerance));
    }

    #[rstest]
    fn accepts_timestamps_at_the_tolerance_edge(verifier: WebhookVerifier) {
        let sent_at = NOW - 300;
        let sig = verifier.sign("msg_1", sent_at, BODY);
        let ts = sent_at.to_string();

        assert!(verifier.verify(&headers("msg_1", &ts, &sig), BODY).is_ok());
    }

    #[rstest]
    fn custom_tolerance_is_honoured(verifier: WebhookVerifier) {
        let verifier = verifier.with_tolerance(10);
        let sent_at = NOW - 11;
        let sig = verifier.sign("msg_1", sent_at, BODY);
        let ts = sent_at.to_string();

        let result = verifier.verify(&headers("msg_1", &ts, &sig), BODY);

        assert_eq!(result, Err(VerificationError::TimestampOutOfTolerance));
    }

    #[rstest]
    #[case(None, Some("1"), Some("v1,x"), WEBHOOK_ID_HEADER)]
    #[case(Some("msg"), None, Some("v1,x"), WEBHOOK_TIMESTAMP_HEADER)]
    #[case(Some("msg"), Some("1"), Some("  "), WEBHOOK_SIGNATURE_HEADER)]
    fn reports_missing_headers(
        verifier: WebhookVerifier,
        #[case] message_id: Option<&str>,
        #[case] timestamp: Option<&str>,
        #[case] signature: Option<&str>,
        #[case] name: &'static str,
    ) {
        let headers = WebhookHeaders {
            message_id,
            timestamp,
            signature,
        };
        assert_eq!(
            verifier.verify(&headers, BODY),
            Err(VerificationError::MissingHeader { name })
        );
    }

    #[rstest]
    fn rejects_non_numeric_timestamp(verifier: WebhookVerifier) {
        let result = verifier.verify(&headers("msg_1", "yesterday", "v1,AAAA"), BODY);
        assert_eq!(result, Err(VerificationError::MalformedTimestamp));
    }

    #[rstest]
    fn rejects_signature_lists_without_v1_entries(verifier: WebhookVerifier) {
        let ts = NOW.to_string();
        let result = verifier.verify(&headers("msg_1", &ts, "v2,AAAA garbage"), BODY);
        assert_eq!(result, Err(VerificationError::MalformedSignature));
    }

    #[rstest]
    fn signed_but_undecodable_bodies_are_malformed(verifier: WebhookVerifier) {
        let body = b"not json";
        let sig = verifier.sign("msg_1", NOW, body);
        let ts = NOW.to_string();

        let result = verifier.verify(&headers("msg_1", &ts, &sig), body);

        assert!(matches!(
            result,
            Err(VerificationError::MalformedPayload { .. })
        ));
    }

    #[rstest]
    fn prefix_is_optional_and_fingerprint_is_stable() {
        let with_prefix = SigningSecret::parse(SECRET).expect("valid secret");
        let without = SigningSecret::parse(SECRET.trim_start_matches("whsec_")).expect("valid");

        assert_eq!(with_prefix.fingerprint(), without.fingerprint());
        assert!(with_prefix.fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!format!("{with_prefix:?}").contains("MfKQ9r8"));
    }

    #[rstest]
    #[case("", SigningSecretError::Empty)]
    #[case("whsec_", SigningSecretError::Empty)]
    #[case("whsec_%%%", SigningSecretError::InvalidEncoding)]
    fn rejects_unusable_secrets(#[case] raw: &str, #[case] expected: SigningSecretError) {
        assert_eq!(SigningSecret::parse(raw).map(|_| ()), Err(expected));
    }
}
