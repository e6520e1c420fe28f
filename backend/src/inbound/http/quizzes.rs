//! Cached quiz read endpoints.
//!
//! ```text
//! GET /api/v1/quizzes/public
//! GET /api/v1/quizzes/{quizId}
//! GET /api/v1/quizzes/{quizId}/leaderboard
//! GET /api/v1/users/{userId}/quizzes
//! GET /api/v1/users/{userId}/favorites
//! ```
//!
//! Register `list_public_quizzes` before `get_quiz` so `public` is not taken
//! for a quiz id.

use actix_web::{HttpResponse, get, web};
use serde_json::json;

use crate::domain::{Error, LeaderboardEntry, Quiz, QuizDetail, QuizId, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

fn parse_quiz_id(raw: &str) -> Result<QuizId, Error> {
    raw.parse().map_err(|_| {
        Error::invalid_request("quiz id must be a UUID")
            .with_details(json!({ "field": "quizId", "value": raw }))
    })
}

fn parse_user_id(raw: String) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "userId" }))
    })
}

/// List public quizzes, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/public",
    responses(
        (status = 200, description = "Public quizzes", body = [Quiz]),
        (status = 503, description = "Store unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "listPublicQuizzes"
)]
#[get("/quizzes/public")]
pub async fn list_public_quizzes(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let quizzes = state.quizzes.list_public_quizzes().await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

/// Fetch a quiz with its questions in order.
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quizId}",
    params(("quizId" = String, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Quiz with questions", body = QuizDetail),
        (status = 400, description = "Malformed quiz id", body = Error),
        (status = 404, description = "Quiz not found", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "getQuiz"
)]
#[get("/quizzes/{quiz_id}")]
pub async fn get_quiz(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let quiz_id = parse_quiz_id(&path)?;
    let detail = state.quizzes.get_quiz(&quiz_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Best completed attempts for a quiz.
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quizId}/leaderboard",
    params(("quizId" = String, Path, description = "Quiz UUID")),
    responses(
        (status = 200, description = "Leaderboard, best first", body = [LeaderboardEntry]),
        (status = 400, description = "Malformed quiz id", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "getLeaderboard"
)]
#[get("/quizzes/{quiz_id}/leaderboard")]
pub async fn get_leaderboard(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let quiz_id = parse_quiz_id(&path)?;
    let entries = state.quizzes.leaderboard(&quiz_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Quizzes authored by a user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/quizzes",
    params(("userId" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "Quizzes authored by the user", body = [Quiz]),
        (status = 400, description = "Malformed user id", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "listUserQuizzes"
)]
#[get("/users/{user_id}/quizzes")]
pub async fn list_user_quizzes(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = parse_user_id(path.into_inner())?;
    let quizzes = state.quizzes.list_user_quizzes(&user_id).await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

/// Quizzes a user has bookmarked, most recent first.
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/favorites",
    params(("userId" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "Quizzes bookmarked by the user", body = [Quiz]),
        (status = 400, description = "Malformed user id", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "listFavoriteQuizzes"
)]
#[get("/users/{user_id}/favorites")]
pub async fn list_favorite_quizzes(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = parse_user_id(path.into_inner())?;
    let quizzes = state.quizzes.list_favorite_quizzes(&user_id).await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use mockall::predicate::eq;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::ports::{MockIdentitySyncCommand, MockQuizQuery};
    use crate::domain::{SigningSecret, WebhookVerifier};
    use crate::test_support::{MutableClock, TEST_WEBHOOK_SECRET};

    async fn call(quizzes: MockQuizQuery, uri: &str) -> actix_web::dev::ServiceResponse {
        let secret = SigningSecret::parse(TEST_WEBHOOK_SECRET).expect("valid secret");
        let clock = Arc::new(MutableClock::new(chrono::Utc::now()));
        let verifier = WebhookVerifier::new(secret, clock);
        let state = HttpState::new(
            Arc::new(MockIdentitySyncCommand::new()),
            Arc::new(quizzes),
            verifier,
        );
        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::scope("/api/v1")
                    .service(list_public_quizzes)
                    .service(get_quiz)
                    .service(get_leaderboard)
                    .service(list_user_quizzes)
                    .service(list_favorite_quizzes),
            ),
        )
        .await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await
    }

    #[rstest]
    #[actix_web::test]
    async fn public_route_is_not_parsed_as_quiz_id() {
        let mut quizzes = MockQuizQuery::new();
        quizzes
            .expect_list_public_quizzes()
            .times(1)
            .returning(|| Ok(Vec::new()));
        quizzes.expect_get_quiz().times(0);

        let res = call(quizzes, "/api/v1/quizzes/public").await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_quiz_id_is_rejected_without_lookup() {
        let mut quizzes = MockQuizQuery::new();
        quizzes.expect_get_quiz().times(0);

        let res = call(quizzes, "/api/v1/quizzes/not-a-uuid").await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[actix_web::test]
    async fn missing_quiz_maps_to_not_found() {
        let quiz_id = QuizId::random();
        let mut quizzes = MockQuizQuery::new();
        quizzes
            .expect_get_quiz()
            .with(eq(quiz_id))
            .times(1)
            .returning(|id| Err(Error::not_found(format!("quiz {id} not found"))));

        let res = call(quizzes, &format!("/api/v1/quizzes/{quiz_id}")).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn leaderboard_is_served_from_the_query_port() {
        let quiz_id = QuizId::random();
        let mut quizzes = MockQuizQuery::new();
        quizzes
            .expect_leaderboard()
            .with(eq(quiz_id))
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let res = call(quizzes, &format!("/api/v1/quizzes/{quiz_id}/leaderboard")).await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn user_quizzes_pass_the_user_id_through() {
        let mut quizzes = MockQuizQuery::new();
        quizzes
            .expect_list_user_quizzes()
            .withf(|user| user.as_ref() == "user_2abc")
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let res = call(quizzes, "/api/v1/users/user_2abc/quizzes").await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn favorites_are_listed_per_user() {
        let mut quizzes = MockQuizQuery::new();
        quizzes
            .expect_list_favorite_quizzes()
            .withf(|user| user.as_ref() == "user_2abc")
            .times(1)
            .returning(|_| Ok(Vec::new()));
        quizzes.expect_list_user_quizzes().times(0);

        let res = call(quizzes, "/api/v1/users/user_2abc/favorites").await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn store_outage_maps_to_service_unavailable() {
        let mut quizzes = MockQuizQuery::new();
        quizzes
            .expect_list_public_quizzes()
            .returning(|| Err(Error::service_unavailable("quiz store unavailable")));

        let res = call(quizzes, "/api/v1/quizzes/public").await;

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
