//! Builders for identity webhook bodies and signed deliveries.

use serde_json::{Value, json};

use crate::domain::WebhookVerifier;

/// Signing secret shared by the webhook tests.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

/// `user.created` or `user.updated` body with a single primary email.
///
/// Timestamps are unix milliseconds.
pub fn user_event(
    event_type: &str,
    user_id: &str,
    email: &str,
    first_name: Option<&str>,
    updated_at_ms: i64,
) -> Value {
    json!({
        "type": event_type,
        "data": {
            "id": user_id,
            "email_addresses": [{ "id": user_id, "email_address": email }],
            "first_name": first_name,
            "last_name": null,
            "username": null,
            "image_url": "",
            "created_at": 1_700_000_000_000_i64,
            "updated_at": updated_at_ms,
        }
    })
}

/// `user.deleted` body.
pub fn deleted_event(user_id: &str) -> Value {
    json!({
        "type": "user.deleted",
        "data": { "id": user_id, "deleted": true }
    })
}

/// A body together with the header values that authenticate it.
#[derive(Debug, Clone)]
pub struct SignedDelivery {
    pub message_id: String,
    pub timestamp: String,
    pub signature: String,
    pub body: Vec<u8>,
}

/// Serialise `body` and sign it with `verifier`'s secret at `timestamp`.
pub fn sign_delivery(
    verifier: &WebhookVerifier,
    message_id: &str,
    timestamp: i64,
    body: &Value,
) -> SignedDelivery {
    let bytes = body.to_string().into_bytes();
    let signature = verifier.sign(message_id, timestamp, &bytes);
    SignedDelivery {
        message_id: message_id.to_owned(),
        timestamp: timestamp.to_string(),
        signature,
        body: bytes,
    }
}
