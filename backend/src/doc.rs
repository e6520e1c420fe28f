//! OpenAPI documentation for the REST surface.
//!
//! The document is served as JSON at `/api-docs/openapi.json`.

use actix_web::{HttpResponse, get};
use utoipa::OpenApi;

use crate::domain::{
    AttemptSummary, Error, ErrorCode, LeaderboardEntry, Question, QuestionType, Quiz, QuizDetail,
    QuizSource, QuizStatus,
};
use crate::inbound::http::webhooks::WebhookAck;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quiz backend API",
        description = "Identity webhook intake, cached quiz reads, and health checks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::webhooks::receive_identity_event,
        crate::inbound::http::webhooks::identity_webhook_preflight,
        crate::inbound::http::quizzes::list_public_quizzes,
        crate::inbound::http::quizzes::get_quiz,
        crate::inbound::http::quizzes::get_leaderboard,
        crate::inbound::http::quizzes::list_user_quizzes,
        crate::inbound::http::quizzes::list_favorite_quizzes,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Quiz,
        QuizDetail,
        Question,
        QuestionType,
        QuizStatus,
        QuizSource,
        AttemptSummary,
        LeaderboardEntry,
        WebhookAck
    )),
    tags(
        (name = "webhooks", description = "Identity provider deliveries"),
        (name = "quizzes", description = "Cached quiz reads"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document.
#[get("/api-docs/openapi.json")]
pub async fn openapi_document() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
