//! Identity provider webhook endpoint.
//!
//! ```text
//! POST    /api/webhooks/identity
//! OPTIONS /api/webhooks/identity
//! ```
//!
//! The body is verified before it is parsed. Status codes tell the provider
//! whether to redeliver: 4xx for deliveries that can never succeed, 5xx when
//! the store failed and a retry may help.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, options, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::domain::{
    Error, SyncError, VerificationError, WEBHOOK_ID_HEADER, WEBHOOK_SIGNATURE_HEADER,
    WEBHOOK_TIMESTAMP_HEADER, WebhookHeaders,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Acknowledgement returned for every accepted delivery.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// What the delivery did to the user projection.
    #[schema(example = "upserted")]
    pub outcome: String,
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}

fn verification_failure(error: &VerificationError) -> Error {
    let code = match error {
        VerificationError::MalformedPayload { .. } => "malformed_payload",
        _ => "verification_failed",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "code": code }))
}

/// Receive a signed identity event and apply it to the user projection.
#[utoipa::path(
    post,
    path = "/api/webhooks/identity",
    request_body(
        content = String,
        description = "Signed identity event",
        content_type = "application/json"
    ),
    params(
        ("svix-id" = String, Header, description = "Delivery identifier"),
        ("svix-timestamp" = String, Header, description = "Unix seconds at signing"),
        ("svix-signature" = String, Header, description = "Space-separated v1 signatures"),
    ),
    responses(
        (status = 200, description = "Event applied, skipped, or ignored", body = WebhookAck),
        (status = 400, description = "Verification failed or payload unusable", body = Error),
        (status = 500, description = "User store failed; redelivery expected", body = Error)
    ),
    tags = ["webhooks"],
    operation_id = "receiveIdentityEvent"
)]
#[post("/webhooks/identity")]
pub async fn receive_identity_event(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let headers = WebhookHeaders {
        message_id: header_value(&req, WEBHOOK_ID_HEADER),
        timestamp: header_value(&req, WEBHOOK_TIMESTAMP_HEADER),
        signature: header_value(&req, WEBHOOK_SIGNATURE_HEADER),
    };

    let envelope = state.verifier.verify(&headers, &body).map_err(|err| {
        warn!(error = %err, message_id = ?headers.message_id, "identity webhook rejected");
        verification_failure(&err)
    })?;

    match state.identity_sync.apply(&envelope).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(WebhookAck {
            outcome: outcome.as_str().to_owned(),
        })),
        Err(err @ SyncError::Store { .. }) => {
            error!(error = %err, message_id = %envelope.message_id, "identity event not applied");
            Err(err.into())
        }
        Err(err) => {
            warn!(error = %err, message_id = %envelope.message_id, "identity event unusable");
            Err(err.into())
        }
    }
}

/// CORS preflight for the webhook endpoint.
#[utoipa::path(
    options,
    path = "/api/webhooks/identity",
    responses((status = 200, description = "Preflight accepted")),
    tags = ["webhooks"],
    operation_id = "identityWebhookPreflight"
)]
#[options("/webhooks/identity")]
pub async fn identity_webhook_preflight() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS))
        .finish()
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
