//! Quiz and attempt aggregates.
//!
//! These are the read models cached by the quiz service and the write
//! requests it forwards to the store. Scoring happens elsewhere; completed
//! attempts arrive with their score already computed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserId;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Quiz identifier.
    QuizId
);
uuid_id!(
    /// Question identifier.
    QuestionId
);
uuid_id!(
    /// Quiz attempt identifier.
    AttemptId
);

/// Error returned when a stored enum label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal
        { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Storage and wire label.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

labelled_enum!(
    /// Publication state of a quiz.
    QuizStatus, "quiz status" {
        Draft => "draft",
        Published => "published",
        Archived => "archived",
    }
);

labelled_enum!(
    /// How the quiz content was produced.
    QuizSource, "quiz source" {
        Manual => "manual",
        TextPaste => "text_paste",
        PdfUpload => "pdf_upload",
    }
);

labelled_enum!(
    /// Answer format of a question.
    QuestionType, "question type" {
        MultipleChoice => "multiple_choice",
        TrueFalse => "true_false",
        ShortAnswer => "short_answer",
        Essay => "essay",
    }
);

/// Quiz header without its questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[schema(value_type = String, format = Uuid)]
    pub id: QuizId,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "user_2abc")]
    pub creator_id: UserId,
    pub status: QuizStatus,
    pub source: QuizSource,
    pub is_public: bool,
    /// Minutes allowed per attempt.
    pub time_limit: Option<i32>,
    /// Percentage required to pass.
    pub passing_score: Option<i32>,
    pub allow_retake: bool,
    pub show_correct_answers: bool,
    pub randomize_questions: bool,
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A question belonging to a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[schema(value_type = String, format = Uuid)]
    pub id: QuestionId,
    #[schema(value_type = String, format = Uuid)]
    pub quiz_id: QuizId,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    pub explanation: Option<String>,
    pub points: i32,
    /// 1-based position, unique within the quiz.
    pub order: i32,
    pub options: Option<Value>,
    pub correct_answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quiz with its questions sorted by `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// Summary of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    #[schema(value_type = String, format = Uuid)]
    pub id: AttemptId,
    #[schema(value_type = String, format = Uuid)]
    pub quiz_id: QuizId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub score: Option<i32>,
    pub total_questions: i32,
    pub correct_answers: Option<i32>,
    /// Seconds spent on the attempt.
    pub time_spent: Option<i32>,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub user_name: String,
    pub score: i32,
    pub time_spent: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

/// Maximum number of leaderboard rows.
pub const LEADERBOARD_LIMIT: usize = 10;
/// Maximum number of quizzes in the public list.
pub const PUBLIC_QUIZ_LIMIT: usize = 50;

/// Validation failures for quiz write requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizValidationError {
    #[error("quiz title must not be empty")]
    EmptyTitle,
    #[error("a quiz needs at least one question")]
    NoQuestions,
    #[error("question {index} has empty text")]
    EmptyQuestion { index: usize },
    #[error("question {index} has no correct answer")]
    EmptyCorrectAnswer { index: usize },
    #[error("question {index} must award non-negative points")]
    NegativePoints { index: usize },
    #[error("passing score must be between 0 and 100")]
    PassingScoreOutOfRange,
    #[error("time limit must be positive")]
    NonPositiveTimeLimit,
    #[error("attempt values must be non-negative")]
    NegativeAttemptValue,
}

fn check_settings(
    time_limit: Option<i32>,
    passing_score: Option<i32>,
) -> Result<(), QuizValidationError> {
    if time_limit.is_some_and(|minutes| minutes <= 0) {
        return Err(QuizValidationError::NonPositiveTimeLimit);
    }
    if passing_score.is_some_and(|score| !(0..=100).contains(&score)) {
        return Err(QuizValidationError::PassingScoreOutOfRange);
    }
    Ok(())
}

/// Question supplied when creating a quiz; its order is its list position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    pub explanation: Option<String>,
    pub points: i32,
    pub options: Option<Value>,
    pub correct_answer: String,
}

/// Request to create a quiz together with its questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub creator_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: QuizStatus,
    pub source: QuizSource,
    pub is_public: bool,
    pub time_limit: Option<i32>,
    pub passing_score: Option<i32>,
    pub allow_retake: bool,
    pub show_correct_answers: bool,
    pub randomize_questions: bool,
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    /// A draft with the store defaults and the given questions.
    pub fn new(
        creator_id: UserId,
        title: impl Into<String>,
        questions: Vec<QuestionDraft>,
    ) -> Self {
        Self {
            creator_id,
            title: title.into(),
            description: None,
            status: QuizStatus::Draft,
            source: QuizSource::Manual,
            is_public: false,
            time_limit: None,
            passing_score: None,
            allow_retake: true,
            show_correct_answers: true,
            randomize_questions: false,
            tags: Vec::new(),
            metadata: None,
            questions,
        }
    }

    /// Check the draft before it reaches the store.
    pub fn validate(&self) -> Result<(), QuizValidationError> {
        if self.title.trim().is_empty() {
            return Err(QuizValidationError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(QuizValidationError::NoQuestions);
        }
        check_settings(self.time_limit, self.passing_score)?;
        for (index, question) in self.questions.iter().enumerate() {
            if question.question.trim().is_empty() {
                return Err(QuizValidationError::EmptyQuestion { index });
            }
            if question.correct_answer.trim().is_empty() {
                return Err(QuizValidationError::EmptyCorrectAnswer { index });
            }
            if question.points < 0 {
                return Err(QuizValidationError::NegativePoints { index });
            }
        }
        Ok(())
    }

    /// Questions paired with their 1-based order.
    pub fn ordered_questions(&self) -> impl Iterator<Item = (i32, &QuestionDraft)> {
        (1..).zip(self.questions.iter())
    }
}

/// Partial update of a quiz header. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<QuizStatus>,
    pub is_public: Option<bool>,
    pub time_limit: Option<Option<i32>>,
    pub passing_score: Option<Option<i32>>,
    pub allow_retake: Option<bool>,
    pub show_correct_answers: Option<bool>,
    pub randomize_questions: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl QuizChanges {
    /// Produce the updated quiz, stamping `updated_at` with `now`.
    pub fn apply_to(&self, quiz: &Quiz, now: DateTime<Utc>) -> Result<Quiz, QuizValidationError> {
        let mut next = quiz.clone();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(QuizValidationError::EmptyTitle);
            }
            next.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        if let Some(time_limit) = self.time_limit {
            next.time_limit = time_limit;
        }
        if let Some(passing_score) = self.passing_score {
            next.passing_score = passing_score;
        }
        check_settings(next.time_limit, next.passing_score)?;

        next.status = self.status.unwrap_or(next.status);
        next.is_public = self.is_public.unwrap_or(next.is_public);
        next.allow_retake = self.allow_retake.unwrap_or(next.allow_retake);
        next.show_correct_answers = self.show_correct_answers.unwrap_or(next.show_correct_answers);
        next.randomize_questions = self.randomize_questions.unwrap_or(next.randomize_questions);
        if let Some(tags) = &self.tags {
            next.tags.clone_from(tags);
        }
        next.updated_at = now;
        Ok(next)
    }
}

/// Quiz header before and after an update.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizRevision {
    pub previous: Quiz,
    pub current: Quiz,
}

impl QuizRevision {
    /// Whether the public list could show this quiz before or after the write.
    pub fn touches_public_list(&self) -> bool {
        self.previous.is_public || self.current.is_public
    }
}

/// Answer recorded as part of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: QuestionId,
    pub answer: String,
    pub is_correct: Option<bool>,
    pub time_spent: Option<i32>,
}

/// Request to start an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptStart {
    pub quiz_id: QuizId,
    pub user_id: UserId,
}

/// Request to close an attempt with its externally computed score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptCompletion {
    pub attempt_id: AttemptId,
    pub score: i32,
    pub correct_answers: i32,
    pub time_spent: Option<i32>,
    pub answers: Vec<AnswerSubmission>,
}

impl AttemptCompletion {
    /// Reject negative counters.
    pub fn validate(&self) -> Result<(), QuizValidationError> {
        let negative = self.score < 0
            || self.correct_answers < 0
            || self.time_spent.is_some_and(|s| s < 0)
            || self
                .answers
                .iter()
                .any(|answer| answer.time_spent.is_some_and(|s| s < 0));
        if negative {
            return Err(QuizValidationError::NegativeAttemptValue);
        }
        Ok(())
    }
}
