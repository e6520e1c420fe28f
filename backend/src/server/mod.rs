//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use quiz_backend::Trace;
use quiz_backend::doc::openapi_document;
use quiz_backend::inbound::http::health::{HealthState, live, ready};
use quiz_backend::inbound::http::quizzes::{
    get_leaderboard, get_quiz, list_favorite_quizzes, list_public_quizzes, list_user_quizzes,
};
use quiz_backend::inbound::http::state::HttpState;
use quiz_backend::inbound::http::webhooks::{identity_webhook_preflight, receive_identity_event};

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    // `public` must be registered ahead of the `{quiz_id}` pattern.
    let quizzes = web::scope("/api/v1")
        .service(list_public_quizzes)
        .service(get_leaderboard)
        .service(get_quiz)
        .service(list_user_quizzes)
        .service(list_favorite_quizzes);

    let webhooks = web::scope("/api")
        .service(receive_identity_event)
        .service(identity_webhook_preflight);

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(quizzes)
        .service(webhooks)
        .service(openapi_document)
        .service(ready)
        .service(live)
}

/// Construct the Actix HTTP server and mark the service ready once bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = build_http_state(&config);
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
