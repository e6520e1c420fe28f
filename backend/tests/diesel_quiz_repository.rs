//! Integration tests for `DieselQuizRepository` against embedded PostgreSQL.
//!
//! Covers the transactional writes (quiz with questions, attempt completion
//! with answers) and the favorites table with its cascade on quiz deletion.

use chrono::{DateTime, TimeZone, Utc};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use quiz_backend::domain::ports::{
    QuizPersistenceError, QuizRepository, UserProjectionRepository,
};
use quiz_backend::domain::{
    AnswerSubmission, AttemptCompletion, AttemptStart, AttemptSummary, DisplayName, EmailAddress,
    QuestionDraft, QuestionType, QuizDetail, QuizDraft, QuizId, UserId, UserProjection,
};
use quiz_backend::outbound::persistence::{
    DbPool, DieselQuizRepository, DieselUserProjectionRepository, PoolConfig,
};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{handle_cluster_setup_failure, migrated_database};

const AUTHOR: &str = "user_author";
const PLAYER: &str = "user_player";

struct TestContext {
    runtime: Runtime,
    quizzes: DieselQuizRepository,
    _database: TemporaryDatabase,
}

impl TestContext {
    fn create(&self, title: &str) -> QuizDetail {
        self.runtime
            .block_on(self.quizzes.create_quiz(&draft(title), at(1_700_000_100)))
            .expect("quiz is created")
    }

    fn start(&self, detail: &QuizDetail) -> AttemptSummary {
        let start = AttemptStart {
            quiz_id: detail.quiz.id,
            user_id: user(PLAYER),
        };
        self.runtime
            .block_on(self.quizzes.start_attempt(&start, at(1_700_000_200)))
            .expect("attempt starts")
            .expect("quiz exists")
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .expect("valid timestamp")
}

fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid id")
}

fn question(text: &str) -> QuestionDraft {
    QuestionDraft {
        question_type: QuestionType::TrueFalse,
        question: text.to_owned(),
        explanation: None,
        points: 1,
        options: None,
        correct_answer: "true".to_owned(),
    }
}

fn draft(title: &str) -> QuizDraft {
    QuizDraft::new(
        user(AUTHOR),
        title,
        vec![
            question("A value has exactly one owner"),
            question("Borrows never outlive their owner"),
        ],
    )
}

fn completion(attempt: &AttemptSummary, answered: &QuizDetail) -> AttemptCompletion {
    AttemptCompletion {
        attempt_id: attempt.id,
        score: 100,
        correct_answers: 2,
        time_spent: Some(42),
        answers: answered
            .questions
            .iter()
            .map(|question| AnswerSubmission {
                question_id: question.id,
                answer: "true".to_owned(),
                is_correct: Some(true),
                time_spent: Some(21),
            })
            .collect(),
    }
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = migrated_database()?;
    let config = PoolConfig::new(database.url().to_string())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    let users = DieselUserProjectionRepository::new(pool.clone());
    for (id, email) in [(AUTHOR, "author@example.com"), (PLAYER, "player@example.com")] {
        let projection = UserProjection {
            id: user(id),
            email: EmailAddress::new(email).map_err(|err| err.to_string())?,
            name: DisplayName::new(id).map_err(|err| err.to_string())?,
            avatar: None,
            created_at: at(1_700_000_000),
            updated_at: at(1_700_000_000),
        };
        runtime
            .block_on(users.upsert_if_newer(&projection))
            .map_err(|err| err.to_string())?;
    }

    Ok(TestContext {
        runtime,
        quizzes: DieselQuizRepository::new(pool),
        _database: database,
    })
}

#[fixture]
fn diesel_world() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn created_quiz_reads_back_with_ordered_questions(diesel_world: Option<TestContext>) {
    let Some(world) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: created_quiz_reads_back_with_ordered_questions skipped");
        return;
    };
    let created = world.create("Ownership");

    let found = world
        .runtime
        .block_on(world.quizzes.find_quiz(&created.quiz.id))
        .expect("lookup succeeds")
        .expect("quiz exists");

    let orders: Vec<i32> = found.questions.iter().map(|q| q.order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(found, created);
}

#[rstest]
fn answers_from_another_quiz_roll_back_the_completion(diesel_world: Option<TestContext>) {
    let Some(world) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: answers_from_another_quiz_roll_back_the_completion skipped");
        return;
    };
    let target = world.create("Ownership");
    let other = world.create("Lifetimes");
    let attempt = world.start(&target);

    let err = world
        .runtime
        .block_on(
            world
                .quizzes
                .complete_attempt(&completion(&attempt, &other), at(1_700_000_300)),
        )
        .expect_err("foreign questions are rejected");

    assert!(matches!(err, QuizPersistenceError::Rejected { .. }));
    let closed = world
        .runtime
        .block_on(
            world
                .quizzes
                .complete_attempt(&completion(&attempt, &target), at(1_700_000_400)),
        )
        .expect("own questions are accepted")
        .expect("attempt is still open");
    assert_eq!(closed.completed_at, Some(at(1_700_000_400)));
}

#[rstest]
fn quizzes_with_attempts_cannot_be_deleted(diesel_world: Option<TestContext>) {
    let Some(world) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: quizzes_with_attempts_cannot_be_deleted skipped");
        return;
    };
    let detail = world.create("Ownership");
    world.start(&detail);

    let err = world
        .runtime
        .block_on(world.quizzes.delete_quiz(&detail.quiz.id))
        .expect_err("attempts block deletion");

    assert!(matches!(err, QuizPersistenceError::Conflict { .. }));
}

#[rstest]
fn favorites_are_idempotent_and_follow_quiz_deletion(diesel_world: Option<TestContext>) {
    let Some(world) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: favorites_are_idempotent_and_follow_quiz_deletion skipped");
        return;
    };
    let detail = world.create("Ownership");
    let player = user(PLAYER);
    let quiz_id = detail.quiz.id;

    let (first, second, listed) = world.runtime.block_on(async {
        let first = world.quizzes.add_favorite(&player, &quiz_id, at(1_700_000_500)).await;
        let second = world.quizzes.add_favorite(&player, &quiz_id, at(1_700_000_600)).await;
        let listed = world.quizzes.list_favorites(&player).await;
        (first, second, listed)
    });

    assert!(first.expect("first bookmark"));
    assert!(!second.expect("duplicate bookmark"));
    let listed = listed.expect("favorites listed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, quiz_id);

    let (removed, remaining, unfavorited) = world.runtime.block_on(async {
        let removed = world.quizzes.delete_quiz(&quiz_id).await;
        let remaining = world.quizzes.list_favorites(&player).await;
        let unfavorited = world.quizzes.remove_favorite(&player, &quiz_id).await;
        (removed, remaining, unfavorited)
    });

    assert!(removed.expect("delete succeeds").is_some());
    assert!(remaining.expect("favorites listed").is_empty());
    assert!(!unfavorited.expect("remove runs"));
}

#[rstest]
fn favoriting_a_missing_quiz_is_rejected(diesel_world: Option<TestContext>) {
    let Some(world) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: favoriting_a_missing_quiz_is_rejected skipped");
        return;
    };

    let err = world
        .runtime
        .block_on(world.quizzes.add_favorite(
            &user(PLAYER),
            &QuizId::random(),
            at(1_700_000_500),
        ))
        .expect_err("quiz does not exist");

    assert!(matches!(err, QuizPersistenceError::Rejected { .. }));
}
