//! Diesel table definitions.
//!
//! Hand-maintained to match the SQL migrations under `backend/migrations`.
//! Enum-like columns are stored as constrained `TEXT`.

diesel::table! {
    /// Projection of identity-provider users.
    ///
    /// `id` is the provider's user identifier. `email` is unique; soft-deleted
    /// users hold a per-user sentinel address.
    users (id) {
        id -> Text,
        email -> Text,
        name -> Text,
        avatar -> Nullable<Text>,
        created_at -> Timestamptz,
        /// Provider-side modification time; drives last-write-wins upserts.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    quizzes (id) {
        id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        creator_id -> Text,
        status -> Text,
        source -> Text,
        is_public -> Bool,
        time_limit -> Nullable<Int4>,
        passing_score -> Nullable<Int4>,
        allow_retake -> Bool,
        show_correct_answers -> Bool,
        randomize_questions -> Bool,
        tags -> Array<Text>,
        metadata -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    questions (id) {
        id -> Uuid,
        quiz_id -> Uuid,
        #[sql_name = "type"]
        question_type -> Text,
        question -> Text,
        explanation -> Nullable<Text>,
        points -> Int4,
        #[sql_name = "order"]
        position -> Int4,
        options -> Nullable<Jsonb>,
        correct_answer -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    quiz_attempts (id) {
        id -> Uuid,
        quiz_id -> Uuid,
        user_id -> Text,
        score -> Nullable<Int4>,
        total_questions -> Int4,
        correct_answers -> Nullable<Int4>,
        /// Seconds.
        time_spent -> Nullable<Int4>,
        completed -> Bool,
        started_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    user_answers (id) {
        id -> Uuid,
        attempt_id -> Uuid,
        question_id -> Uuid,
        answer -> Text,
        is_correct -> Nullable<Bool>,
        time_spent -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    quiz_favorites (id) {
        id -> Uuid,
        user_id -> Text,
        quiz_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(quizzes -> users (creator_id));
diesel::joinable!(questions -> quizzes (quiz_id));
diesel::joinable!(quiz_attempts -> quizzes (quiz_id));
diesel::joinable!(quiz_attempts -> users (user_id));
diesel::joinable!(user_answers -> quiz_attempts (attempt_id));
diesel::joinable!(user_answers -> questions (question_id));
diesel::joinable!(quiz_favorites -> users (user_id));
diesel::joinable!(quiz_favorites -> quizzes (quiz_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    quizzes,
    questions,
    quiz_attempts,
    user_answers,
    quiz_favorites,
);
