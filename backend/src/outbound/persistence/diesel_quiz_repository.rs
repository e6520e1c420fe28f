//! PostgreSQL-backed `QuizRepository` implementation using Diesel ORM.
//!
//! Multi-row writes (quiz with questions, attempt completion with answers)
//! run in one transaction. Header updates lock the row so the before and
//! after images returned to the service describe the same write.

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{QuizPersistenceError, QuizRepository};
use crate::domain::{
    AttemptCompletion, AttemptId, AttemptStart, AttemptSummary, LeaderboardEntry, Question,
    QuestionId, QuestionType, Quiz, QuizChanges, QuizDetail, QuizDraft, QuizId, QuizRevision,
    QuizSource, QuizStatus, UserId,
};

use super::diesel_basic_error_mapping::{DieselFailure, classify_diesel_error, pool_error_message};
use super::models::{
    AttemptRow, NewAttemptRow, NewFavoriteRow, NewQuestionRow, NewQuizRow, NewUserAnswerRow,
    QuestionRow, QuizHeaderUpdate, QuizRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{questions, quiz_attempts, quiz_favorites, quizzes, user_answers, users};

/// Diesel-backed implementation of the `QuizRepository` port.
#[derive(Clone)]
pub struct DieselQuizRepository {
    pool: DbPool,
}

impl DieselQuizRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Error carried out of a transaction closure.
enum TxError {
    Diesel(diesel::result::Error),
    Rejected(String),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_pool_error(error: PoolError) -> QuizPersistenceError {
    QuizPersistenceError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> QuizPersistenceError {
    match classify_diesel_error(error, operation) {
        DieselFailure::Connection(message) => QuizPersistenceError::connection(message),
        DieselFailure::ForeignKeyViolation { constraint } => {
            map_foreign_key_violation(operation, constraint.as_deref())
        }
        DieselFailure::UniqueViolation { .. } => {
            QuizPersistenceError::conflict(format!("{operation}: duplicate record"))
        }
        DieselFailure::ConstraintViolation { constraint } => QuizPersistenceError::rejected(
            format!(
                "{operation}: value violates {}",
                constraint.as_deref().unwrap_or("a table constraint")
            ),
        ),
        DieselFailure::Query(message) => QuizPersistenceError::query(message),
    }
}

/// Deletes are blocked by referencing rows; inserts reference missing rows.
fn map_foreign_key_violation(operation: &str, constraint: Option<&str>) -> QuizPersistenceError {
    match constraint {
        Some("quiz_attempts_quiz_id_fkey") => {
            QuizPersistenceError::conflict("quiz has recorded attempts")
        }
        Some("quizzes_creator_id_fkey") => {
            QuizPersistenceError::rejected("quiz creator is not a known user")
        }
        Some("quiz_attempts_user_id_fkey") => {
            QuizPersistenceError::rejected("attempt user is not a known user")
        }
        Some("user_answers_question_id_fkey") => {
            QuizPersistenceError::rejected("answer references an unknown question")
        }
        Some("quiz_favorites_quiz_id_fkey") => {
            QuizPersistenceError::rejected("favorited quiz does not exist")
        }
        Some("quiz_favorites_user_id_fkey") => {
            QuizPersistenceError::rejected("favoriting user is not a known user")
        }
        other => {
            tracing::warn!(
                operation,
                constraint = ?other,
                "unrecognised foreign key violation"
            );
            QuizPersistenceError::conflict(format!("{operation}: referenced record conflict"))
        }
    }
}

fn map_tx_error(error: TxError, operation: &str) -> QuizPersistenceError {
    match error {
        TxError::Diesel(error) => map_diesel_error(error, operation),
        TxError::Rejected(message) => QuizPersistenceError::rejected(message),
    }
}

fn corrupt(
    table: &str,
    id: impl std::fmt::Display,
    detail: impl std::fmt::Display,
) -> QuizPersistenceError {
    QuizPersistenceError::query(format!("stored {table} row {id} is invalid: {detail}"))
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn row_to_quiz(row: QuizRow) -> Result<Quiz, QuizPersistenceError> {
    let creator_id = UserId::new(row.creator_id).map_err(|err| corrupt("quiz", row.id, err))?;
    let status = QuizStatus::from_str(&row.status).map_err(|err| corrupt("quiz", row.id, err))?;
    let source = QuizSource::from_str(&row.source).map_err(|err| corrupt("quiz", row.id, err))?;
    Ok(Quiz {
        id: QuizId::from_uuid(row.id),
        title: row.title,
        description: row.description,
        creator_id,
        status,
        source,
        is_public: row.is_public,
        time_limit: row.time_limit,
        passing_score: row.passing_score,
        allow_retake: row.allow_retake,
        show_correct_answers: row.show_correct_answers,
        randomize_questions: row.randomize_questions,
        tags: row.tags,
        metadata: row.metadata,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_question(row: QuestionRow) -> Result<Question, QuizPersistenceError> {
    let question_type = QuestionType::from_str(&row.question_type)
        .map_err(|err| corrupt("question", row.id, err))?;
    Ok(Question {
        id: QuestionId::from_uuid(row.id),
        quiz_id: QuizId::from_uuid(row.quiz_id),
        question_type,
        question: row.question,
        explanation: row.explanation,
        points: row.points,
        order: row.position,
        options: row.options,
        correct_answer: row.correct_answer,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_attempt(row: AttemptRow) -> Result<AttemptSummary, QuizPersistenceError> {
    let user_id = UserId::new(row.user_id).map_err(|err| corrupt("attempt", row.id, err))?;
    Ok(AttemptSummary {
        id: AttemptId::from_uuid(row.id),
        quiz_id: QuizId::from_uuid(row.quiz_id),
        user_id,
        score: row.score,
        total_questions: row.total_questions,
        correct_answers: row.correct_answers,
        time_spent: row.time_spent,
        completed: row.completed,
        started_at: row.started_at,
        completed_at: row.completed_at,
    })
}

fn rows_to_leaderboard(
    rows: Vec<(AttemptRow, String)>,
) -> Result<Vec<LeaderboardEntry>, QuizPersistenceError> {
    (1_u32..)
        .zip(rows)
        .map(|(rank, (attempt, user_name))| {
            let (Some(score), Some(completed_at)) = (attempt.score, attempt.completed_at) else {
                return Err(corrupt("attempt", attempt.id, "completed without score"));
            };
            let user_id =
                UserId::new(attempt.user_id).map_err(|err| corrupt("attempt", attempt.id, err))?;
            Ok(LeaderboardEntry {
                rank,
                user_id,
                user_name,
                score,
                time_spent: attempt.time_spent,
                completed_at,
            })
        })
        .collect()
}

fn quiz_row<'a>(id: Uuid, draft: &'a QuizDraft, now: DateTime<Utc>) -> NewQuizRow<'a> {
    NewQuizRow {
        id,
        title: draft.title.trim(),
        description: draft.description.as_deref(),
        creator_id: draft.creator_id.as_ref(),
        status: draft.status.as_str(),
        source: draft.source.as_str(),
        is_public: draft.is_public,
        time_limit: draft.time_limit,
        passing_score: draft.passing_score,
        allow_retake: draft.allow_retake,
        show_correct_answers: draft.show_correct_answers,
        randomize_questions: draft.randomize_questions,
        tags: &draft.tags,
        metadata: draft.metadata.as_ref(),
        created_at: now,
        updated_at: now,
    }
}

fn question_rows(
    quiz_id: Uuid,
    draft: &QuizDraft,
    now: DateTime<Utc>,
) -> Vec<NewQuestionRow<'_>> {
    draft
        .ordered_questions()
        .map(|(position, question)| NewQuestionRow {
            id: Uuid::new_v4(),
            quiz_id,
            question_type: question.question_type.as_str(),
            question: question.question.as_str(),
            explanation: question.explanation.as_deref(),
            points: question.points,
            position,
            options: question.options.as_ref(),
            correct_answer: question.correct_answer.as_str(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// First answered question that is not part of the attempt's quiz.
fn foreign_question(answers: &[NewUserAnswerRow<'_>], owned: &HashSet<Uuid>) -> Option<Uuid> {
    answers
        .iter()
        .map(|answer| answer.question_id)
        .find(|question_id| !owned.contains(question_id))
}

fn header_update(quiz: &Quiz) -> QuizHeaderUpdate<'_> {
    QuizHeaderUpdate {
        title: quiz.title.as_str(),
        description: quiz.description.as_deref(),
        status: quiz.status.as_str(),
        is_public: quiz.is_public,
        time_limit: quiz.time_limit,
        passing_score: quiz.passing_score,
        allow_retake: quiz.allow_retake,
        show_correct_answers: quiz.show_correct_answers,
        randomize_questions: quiz.randomize_questions,
        tags: &quiz.tags,
        updated_at: quiz.updated_at,
    }
}

#[async_trait]
impl QuizRepository for DieselQuizRepository {
    async fn find_quiz(&self, id: &QuizId) -> Result<Option<QuizDetail>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let quiz_id = *id.as_uuid();

        // Both SELECTs observe one snapshot.
        let rows = conn
            .transaction(|conn| {
                async move {
                    let quiz = quizzes::table
                        .filter(quizzes::id.eq(quiz_id))
                        .select(QuizRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(quiz) = quiz else {
                        return Ok::<_, diesel::result::Error>(None);
                    };
                    let questions = questions::table
                        .filter(questions::quiz_id.eq(quiz_id))
                        .order(questions::position.asc())
                        .select(QuestionRow::as_select())
                        .load(conn)
                        .await?;
                    Ok(Some((quiz, questions)))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "find quiz"))?;

        let Some((quiz, questions)) = rows else {
            return Ok(None);
        };
        Ok(Some(QuizDetail {
            quiz: row_to_quiz(quiz)?,
            questions: questions
                .into_iter()
                .map(row_to_question)
                .collect::<Result<_, _>>()?,
        }))
    }

    async fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Quiz>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        quizzes::table
            .filter(quizzes::creator_id.eq(creator.as_ref()))
            .order(quizzes::created_at.desc())
            .select(QuizRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list quizzes by creator"))?
            .into_iter()
            .map(row_to_quiz)
            .collect()
    }

    async fn list_public(&self, limit: usize) -> Result<Vec<Quiz>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        quizzes::table
            .filter(quizzes::is_public.eq(true))
            .order(quizzes::created_at.desc())
            .limit(to_limit(limit))
            .select(QuizRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list public quizzes"))?
            .into_iter()
            .map(row_to_quiz)
            .collect()
    }

    async fn list_completed_attempts(
        &self,
        user: &UserId,
        quiz: &QuizId,
    ) -> Result<Vec<AttemptSummary>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        quiz_attempts::table
            .filter(quiz_attempts::user_id.eq(user.as_ref()))
            .filter(quiz_attempts::quiz_id.eq(quiz.as_uuid()))
            .filter(quiz_attempts::completed.eq(true))
            .order(quiz_attempts::completed_at.desc())
            .select(AttemptRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list completed attempts"))?
            .into_iter()
            .map(row_to_attempt)
            .collect()
    }

    async fn leaderboard(
        &self,
        quiz: &QuizId,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Postgres sorts NULL last for ASC, so untimed attempts rank after timed ties.
        let rows: Vec<(AttemptRow, String)> = quiz_attempts::table
            .inner_join(users::table)
            .filter(quiz_attempts::quiz_id.eq(quiz.as_uuid()))
            .filter(quiz_attempts::completed.eq(true))
            .filter(quiz_attempts::score.is_not_null())
            .filter(quiz_attempts::completed_at.is_not_null())
            .order((quiz_attempts::score.desc(), quiz_attempts::time_spent.asc()))
            .limit(to_limit(limit))
            .select((AttemptRow::as_select(), users::name))
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "load leaderboard"))?;
        rows_to_leaderboard(rows)
    }

    async fn create_quiz(
        &self,
        draft: &QuizDraft,
        now: DateTime<Utc>,
    ) -> Result<QuizDetail, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let quiz_id = Uuid::new_v4();
        let quiz = quiz_row(quiz_id, draft, now);
        let questions = question_rows(quiz_id, draft, now);

        let (quiz, questions) = conn
            .transaction(|conn| {
                async move {
                    let quiz: QuizRow = diesel::insert_into(quizzes::table)
                        .values(&quiz)
                        .returning(QuizRow::as_returning())
                        .get_result(conn)
                        .await?;
                    let questions: Vec<QuestionRow> = diesel::insert_into(questions::table)
                        .values(&questions)
                        .returning(QuestionRow::as_returning())
                        .get_results(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>((quiz, questions))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "create quiz"))?;

        let mut questions = questions
            .into_iter()
            .map(row_to_question)
            .collect::<Result<Vec<_>, _>>()?;
        questions.sort_by_key(|question| question.order);
        Ok(QuizDetail {
            quiz: row_to_quiz(quiz)?,
            questions,
        })
    }

    async fn update_quiz(
        &self,
        id: &QuizId,
        changes: &QuizChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<QuizRevision>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let quiz_id = *id.as_uuid();

        let rows = conn
            .transaction(|conn| {
                async move {
                    let previous = quizzes::table
                        .filter(quizzes::id.eq(quiz_id))
                        .select(QuizRow::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(previous) = previous else {
                        return Ok::<_, TxError>(None);
                    };
                    let previous_quiz = row_to_quiz(previous.clone())
                        .map_err(|err| TxError::Rejected(err.to_string()))?;
                    let next = changes
                        .apply_to(&previous_quiz, now)
                        .map_err(|err| TxError::Rejected(err.to_string()))?;
                    let target = quizzes::table.filter(quizzes::id.eq(quiz_id));
                    let current: QuizRow = diesel::update(target)
                        .set(&header_update(&next))
                        .returning(QuizRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Some((previous, current)))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_tx_error(err, "update quiz"))?;

        rows.map(|(previous, current)| {
            Ok(QuizRevision {
                previous: row_to_quiz(previous)?,
                current: row_to_quiz(current)?,
            })
        })
        .transpose()
    }

    async fn delete_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(quizzes::table.filter(quizzes::id.eq(id.as_uuid())))
            .returning(QuizRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "delete quiz"))?
            .map(row_to_quiz)
            .transpose()
    }

    async fn start_attempt(
        &self,
        start: &AttemptStart,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptSummary>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let quiz_id = *start.quiz_id.as_uuid();
        let user_id = start.user_id.as_ref();

        let row = conn
            .transaction(|conn| {
                async move {
                    let exists: Option<Uuid> = quizzes::table
                        .filter(quizzes::id.eq(quiz_id))
                        .select(quizzes::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if exists.is_none() {
                        return Ok::<_, TxError>(None);
                    }
                    let total: i64 = questions::table
                        .filter(questions::quiz_id.eq(quiz_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    let total_questions = i32::try_from(total)
                        .map_err(|_| TxError::Rejected("quiz has too many questions".to_owned()))?;
                    let attempt: AttemptRow = diesel::insert_into(quiz_attempts::table)
                        .values(&NewAttemptRow {
                            id: Uuid::new_v4(),
                            quiz_id,
                            user_id,
                            total_questions,
                            completed: false,
                            started_at: now,
                        })
                        .returning(AttemptRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Some(attempt))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_tx_error(err, "start attempt"))?;

        row.map(row_to_attempt).transpose()
    }

    async fn complete_attempt(
        &self,
        completion: &AttemptCompletion,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptSummary>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let attempt_id = *completion.attempt_id.as_uuid();
        let answers: Vec<NewUserAnswerRow<'_>> = completion
            .answers
            .iter()
            .map(|answer| NewUserAnswerRow {
                id: Uuid::new_v4(),
                attempt_id,
                question_id: *answer.question_id.as_uuid(),
                answer: answer.answer.as_str(),
                is_correct: answer.is_correct,
                time_spent: answer.time_spent,
                created_at: now,
            })
            .collect();

        let row = conn
            .transaction(|conn| {
                async move {
                    let closed: Option<AttemptRow> = diesel::update(
                        quiz_attempts::table
                            .filter(quiz_attempts::id.eq(attempt_id))
                            .filter(quiz_attempts::completed.eq(false)),
                    )
                    .set((
                        quiz_attempts::score.eq(Some(completion.score)),
                        quiz_attempts::correct_answers.eq(Some(completion.correct_answers)),
                        quiz_attempts::time_spent.eq(completion.time_spent),
                        quiz_attempts::completed.eq(true),
                        quiz_attempts::completed_at.eq(Some(now)),
                    ))
                    .returning(AttemptRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;
                    let Some(closed) = closed else {
                        return Ok::<_, TxError>(None);
                    };
                    let owned: HashSet<Uuid> = questions::table
                        .filter(questions::quiz_id.eq(closed.quiz_id))
                        .select(questions::id)
                        .load::<Uuid>(conn)
                        .await?
                        .into_iter()
                        .collect();
                    if let Some(stray) = foreign_question(&answers, &owned) {
                        return Err(TxError::Rejected(format!(
                            "question {stray} does not belong to quiz {}",
                            closed.quiz_id
                        )));
                    }
                    if !answers.is_empty() {
                        diesel::insert_into(user_answers::table)
                            .values(&answers)
                            .execute(conn)
                            .await?;
                    }
                    Ok(Some(closed))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_tx_error(err, "complete attempt"))?;

        row.map(row_to_attempt).transpose()
    }

    async fn add_favorite(
        &self,
        user: &UserId,
        quiz: &QuizId,
        now: DateTime<Utc>,
    ) -> Result<bool, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(quiz_favorites::table)
            .values(&NewFavoriteRow {
                id: Uuid::new_v4(),
                user_id: user.as_ref(),
                quiz_id: *quiz.as_uuid(),
                created_at: now,
            })
            .on_conflict((quiz_favorites::user_id, quiz_favorites::quiz_id))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "add favorite"))?;
        Ok(inserted > 0)
    }

    async fn remove_favorite(
        &self,
        user: &UserId,
        quiz: &QuizId,
    ) -> Result<bool, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(
            quiz_favorites::table
                .filter(quiz_favorites::user_id.eq(user.as_ref()))
                .filter(quiz_favorites::quiz_id.eq(quiz.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(err, "remove favorite"))?;
        Ok(removed > 0)
    }

    async fn list_favorites(&self, user: &UserId) -> Result<Vec<Quiz>, QuizPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        quiz_favorites::table
            .inner_join(quizzes::table)
            .filter(quiz_favorites::user_id.eq(user.as_ref()))
            .order(quiz_favorites::created_at.desc())
            .select(QuizRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list favorites"))?
            .into_iter()
            .map(row_to_quiz)
            .collect()
    }
}
