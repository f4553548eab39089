use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    ChangeEvent, ChangeFeed, ChangeOp, Provider, ProviderError, Table,
    rows::{
        CommentRow, DiscussionRow, ExamChanges, ExamRow, NewCommentRow, NewDiscussionRow,
        NewExamRow, NewProfileRow, NewQuestionRow, ProfileChanges, ProfileRow, QuestionChanges,
        QuestionRow,
    },
};

const EXAM_COLUMNS: &str = r#"
    e.id, e.title, e.type, e.year, e.subject, e.status, e.created_by,
    (SELECT COUNT(*) FROM exam_attempts a WHERE a.exam_id = e.id) AS attempts,
    e.created_at, e.updated_at
"#;

const QUESTION_COLUMNS: &str =
    "id, exam_id, text, options, correct_answer, explanation, created_at, updated_at";

const DISCUSSION_COLUMNS: &str = "id, author_id, title, content, likes, created_at, updated_at";

const COMMENT_COLUMNS: &str =
    "id, discussion_id, author_id, content, likes, created_at, updated_at";

const PROFILE_COLUMNS: &str =
    "id, email, password_hash, full_name, last_name, role, settings, created_at, updated_at";

/// Provider backed by a Postgres pool.
///
/// Change notifications are published by this process after each successful
/// write, so subscribers only see writes made through this instance.
#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            feed: ChangeFeed::default(),
        }
    }
}

#[async_trait]
impl Provider for PgProvider {
    async fn select_exams(&self) -> Result<Vec<ExamRow>, ProviderError> {
        let sql = format!("SELECT {} FROM exams e ORDER BY e.id", EXAM_COLUMNS);
        let rows = sqlx::query_as::<_, ExamRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn select_exam(&self, id: i64) -> Result<Option<ExamRow>, ProviderError> {
        let sql = format!("SELECT {} FROM exams e WHERE e.id = $1", EXAM_COLUMNS);
        let row = sqlx::query_as::<_, ExamRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_exam(&self, row: NewExamRow) -> Result<ExamRow, ProviderError> {
        let inserted = sqlx::query_as::<_, ExamRow>(
            r#"
            INSERT INTO exams (title, type, year, subject, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, type, year, subject, status, created_by,
                      0::BIGINT AS attempts, created_at, updated_at
            "#,
        )
        .bind(row.title)
        .bind(row.exam_type)
        .bind(row.year)
        .bind(row.subject)
        .bind(row.status)
        .bind(row.created_by)
        .fetch_one(&self.pool)
        .await?;

        self.feed.publish(Table::Exams, ChangeOp::Insert, inserted.id);
        Ok(inserted)
    }

    async fn update_exam(
        &self,
        id: i64,
        changes: ExamChanges,
    ) -> Result<Option<ExamRow>, ProviderError> {
        if changes.is_empty() {
            return self.select_exam(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exams SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(exam_type) = changes.exam_type {
            separated.push("type = ");
            separated.push_bind_unseparated(exam_type);
        }

        if let Some(year) = changes.year {
            separated.push("year = ");
            separated.push_bind_unseparated(year);
        }

        if let Some(subject) = changes.subject {
            separated.push("subject = ");
            separated.push_bind_unseparated(subject);
        }

        if let Some(status) = changes.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status);
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id");

        let updated: Option<(i64,)> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await?;

        if updated.is_none() {
            return Ok(None);
        }

        self.feed.publish(Table::Exams, ChangeOp::Update, id);
        self.select_exam(id).await
    }

    async fn select_questions(
        &self,
        exam_id: Option<i64>,
    ) -> Result<Vec<QuestionRow>, ProviderError> {
        let sql = format!(
            "SELECT {} FROM questions WHERE ($1::BIGINT IS NULL OR exam_id = $1) ORDER BY id",
            QUESTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(exam_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn select_question(&self, id: i64) -> Result<Option<QuestionRow>, ProviderError> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        let row = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_question(&self, row: NewQuestionRow) -> Result<QuestionRow, ProviderError> {
        let sql = format!(
            r#"
            INSERT INTO questions (exam_id, text, options, correct_answer, explanation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(row.exam_id)
            .bind(row.text)
            .bind(Json(row.options))
            .bind(row.correct_answer)
            .bind(row.explanation)
            .fetch_one(&self.pool)
            .await?;

        self.feed.publish(Table::Questions, ChangeOp::Insert, inserted.id);
        Ok(inserted)
    }

    async fn insert_question_within(
        &self,
        row: NewQuestionRow,
        cap: i64,
    ) -> Result<Option<QuestionRow>, ProviderError> {
        let mut tx = self.pool.begin().await?;

        // Locks the exam row so concurrent adds to one exam count in turn
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
            .bind(row.exam_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ProviderError::Unavailable(format!(
                "foreign key violation: exam {} does not exist",
                row.exam_id
            )));
        }

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
            .bind(row.exam_id)
            .fetch_one(&mut *tx)
            .await?;
        if count >= cap {
            return Ok(None);
        }

        let sql = format!(
            r#"
            INSERT INTO questions (exam_id, text, options, correct_answer, explanation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(row.exam_id)
            .bind(row.text)
            .bind(Json(row.options))
            .bind(row.correct_answer)
            .bind(row.explanation)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        self.feed.publish(Table::Questions, ChangeOp::Insert, inserted.id);
        Ok(Some(inserted))
    }

    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> Result<Option<QuestionRow>, ProviderError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        if let Some(text) = changes.text {
            separated.push("text = ");
            separated.push_bind_unseparated(text);
        }

        if let Some(options) = changes.options {
            separated.push("options = ");
            separated.push_bind_unseparated(Json(options));
        }

        if let Some(correct_answer) = changes.correct_answer {
            separated.push("correct_answer = ");
            separated.push_bind_unseparated(correct_answer);
        }

        if let Some(explanation) = changes.explanation {
            separated.push("explanation = ");
            separated.push_bind_unseparated(explanation);
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(QUESTION_COLUMNS);

        let updated = builder
            .build_query_as::<QuestionRow>()
            .fetch_optional(&self.pool)
            .await?;

        if updated.is_some() {
            self.feed.publish(Table::Questions, ChangeOp::Update, id);
        }
        Ok(updated)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, ProviderError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            self.feed.publish(Table::Questions, ChangeOp::Delete, id);
        }
        Ok(deleted)
    }

    async fn select_discussions(&self) -> Result<Vec<DiscussionRow>, ProviderError> {
        let sql = format!(
            "SELECT {} FROM discussions ORDER BY created_at DESC, id DESC",
            DISCUSSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, DiscussionRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn select_discussion(&self, id: i64) -> Result<Option<DiscussionRow>, ProviderError> {
        let sql = format!("SELECT {} FROM discussions WHERE id = $1", DISCUSSION_COLUMNS);
        let row = sqlx::query_as::<_, DiscussionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_discussion(
        &self,
        row: NewDiscussionRow,
    ) -> Result<DiscussionRow, ProviderError> {
        let sql = format!(
            r#"
            INSERT INTO discussions (author_id, title, content)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            DISCUSSION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, DiscussionRow>(&sql)
            .bind(row.author_id)
            .bind(row.title)
            .bind(row.content)
            .fetch_one(&self.pool)
            .await?;

        self.feed.publish(Table::Discussions, ChangeOp::Insert, inserted.id);
        Ok(inserted)
    }

    async fn select_comments(&self, discussion_id: i64) -> Result<Vec<CommentRow>, ProviderError> {
        let sql = format!(
            r#"
            SELECT {} FROM discussion_comments
            WHERE discussion_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
            COMMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(discussion_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_comment(&self, row: NewCommentRow) -> Result<CommentRow, ProviderError> {
        let sql = format!(
            r#"
            INSERT INTO discussion_comments (discussion_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        );
        let inserted = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(row.discussion_id)
            .bind(row.author_id)
            .bind(row.content)
            .fetch_one(&self.pool)
            .await?;

        self.feed
            .publish(Table::DiscussionComments, ChangeOp::Insert, inserted.id);
        Ok(inserted)
    }

    async fn increment_discussion_likes(&self, id: i64) -> Result<Option<i32>, ProviderError> {
        let likes = sqlx::query_scalar::<_, i32>(
            "UPDATE discussions SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if likes.is_some() {
            self.feed.publish(Table::Discussions, ChangeOp::Update, id);
        }
        Ok(likes)
    }

    async fn increment_comment_likes(&self, id: i64) -> Result<Option<i32>, ProviderError> {
        let likes = sqlx::query_scalar::<_, i32>(
            "UPDATE discussion_comments SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if likes.is_some() {
            self.feed
                .publish(Table::DiscussionComments, ChangeOp::Update, id);
        }
        Ok(likes)
    }

    async fn insert_profile(&self, row: NewProfileRow) -> Result<ProfileRow, ProviderError> {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let inserted = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(row.email)
            .bind(row.password_hash)
            .bind(row.full_name)
            .bind(row.role)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn select_profile(&self, id: Uuid) -> Result<Option<ProfileRow>, ProviderError> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn select_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let sql = format!(
            "SELECT {} FROM profiles WHERE LOWER(email) = LOWER($1)",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE profiles SET ");
        let mut separated = builder.separated(", ");

        if let Some(full_name) = changes.full_name {
            separated.push("full_name = ");
            separated.push_bind_unseparated(full_name);
        }

        if let Some(last_name) = changes.last_name {
            separated.push("last_name = ");
            separated.push_bind_unseparated(last_name);
        }

        if let Some(settings) = changes.settings {
            separated.push("settings = ");
            separated.push_bind_unseparated(Json(settings));
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(PROFILE_COLUMNS);

        let updated = builder
            .build_query_as::<ProfileRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
