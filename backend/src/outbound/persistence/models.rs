//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use super::schema::{questions, quiz_attempts, quiz_favorites, quizzes, user_answers, users};

// ---------------------------------------------------------------------------
// User projection models
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for upserting user projections.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub avatar: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Quiz models
// ---------------------------------------------------------------------------

/// Row struct for reading from the quizzes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = quizzes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuizRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub status: String,
    pub source: String,
    pub is_public: bool,
    pub time_limit: Option<i32>,
    pub passing_score: Option<i32>,
    pub allow_retake: bool,
    pub show_correct_answers: bool,
    pub randomize_questions: bool,
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating quizzes.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = quizzes)]
pub(crate) struct NewQuizRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub creator_id: &'a str,
    pub status: &'a str,
    pub source: &'a str,
    pub is_public: bool,
    pub time_limit: Option<i32>,
    pub passing_score: Option<i32>,
    pub allow_retake: bool,
    pub show_correct_answers: bool,
    pub randomize_questions: bool,
    pub tags: &'a [String],
    pub metadata: Option<&'a Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full header changeset; `None` clears nullable columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = quizzes)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct QuizHeaderUpdate<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub is_public: bool,
    pub time_limit: Option<i32>,
    pub passing_score: Option<i32>,
    pub allow_retake: bool,
    pub show_correct_answers: bool,
    pub randomize_questions: bool,
    pub tags: &'a [String],
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the questions table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuestionRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_type: String,
    pub question: String,
    pub explanation: Option<String>,
    pub points: i32,
    pub position: i32,
    pub options: Option<Value>,
    pub correct_answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating questions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = questions)]
pub(crate) struct NewQuestionRow<'a> {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_type: &'a str,
    pub question: &'a str,
    pub explanation: Option<&'a str>,
    pub points: i32,
    pub position: i32,
    pub options: Option<&'a Value>,
    pub correct_answer: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Attempt models
// ---------------------------------------------------------------------------

/// Row struct for reading from the quiz_attempts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = quiz_attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AttemptRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: Option<i32>,
    pub total_questions: i32,
    pub correct_answers: Option<i32>,
    pub time_spent: Option<i32>,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insertable struct for opening attempts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = quiz_attempts)]
pub(crate) struct NewAttemptRow<'a> {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: &'a str,
    pub total_questions: i32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
}

/// Insertable struct for recording answers.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_answers)]
pub(crate) struct NewUserAnswerRow<'a> {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub answer: &'a str,
    pub is_correct: Option<bool>,
    pub time_spent: Option<i32>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Favorite models
// ---------------------------------------------------------------------------

/// Insertable struct for bookmarking a quiz.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = quiz_favorites)]
pub(crate) struct NewFavoriteRow<'a> {
    pub id: Uuid,
    pub user_id: &'a str,
    pub quiz_id: Uuid,
    pub created_at: DateTime<Utc>,
}
