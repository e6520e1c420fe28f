//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod quizzes;
pub mod state;
pub mod webhooks;

pub use error::ApiResult;
