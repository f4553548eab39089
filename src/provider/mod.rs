//! Persistence/auth provider boundary.
//!
//! The application never talks to storage directly: every read and write goes
//! through [`Provider`], a table-shaped request/response API. Two backends are
//! available, Postgres for deployments and an in-process store for local runs
//! and tests.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod rows;

pub use memory::MemoryProvider;
pub use postgres::PgProvider;

use rows::{
    CommentRow, DiscussionRow, ExamChanges, ExamRow, NewCommentRow, NewDiscussionRow, NewExamRow,
    NewProfileRow, NewQuestionRow, ProfileChanges, ProfileRow, QuestionChanges, QuestionRow,
};

/// Failure reported by the provider. Calls are made once; nothing is retried.
#[derive(Debug)]
pub enum ProviderError {
    /// A uniqueness constraint rejected the write.
    Duplicate(String),
    /// A stored row could not be mapped into a domain entity.
    Malformed(String),
    /// Communication with the backing store failed.
    Unavailable(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Duplicate(msg) => write!(f, "duplicate: {}", msg),
            ProviderError::Malformed(msg) => write!(f, "malformed row: {}", msg),
            ProviderError::Unavailable(msg) => write!(f, "provider unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return ProviderError::Duplicate(db_err.message().to_string());
            }
        }
        ProviderError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Exams,
    Questions,
    Discussions,
    DiscussionComments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A change notification pushed after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    pub id: i64,
}

/// Fan-out of change notifications to every subscriber.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, table: Table, op: ChangeOp, id: i64) {
        // No subscribers is not an error.
        let _ = self.tx.send(ChangeEvent { table, op, id });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    // exams
    async fn select_exams(&self) -> Result<Vec<ExamRow>, ProviderError>;
    async fn select_exam(&self, id: i64) -> Result<Option<ExamRow>, ProviderError>;
    async fn insert_exam(&self, row: NewExamRow) -> Result<ExamRow, ProviderError>;
    async fn update_exam(
        &self,
        id: i64,
        changes: ExamChanges,
    ) -> Result<Option<ExamRow>, ProviderError>;

    // questions
    /// Questions ordered by id, optionally restricted to one exam.
    async fn select_questions(&self, exam_id: Option<i64>)
    -> Result<Vec<QuestionRow>, ProviderError>;
    async fn select_question(&self, id: i64) -> Result<Option<QuestionRow>, ProviderError>;
    async fn insert_question(&self, row: NewQuestionRow) -> Result<QuestionRow, ProviderError>;
    /// Inserts only while the exam holds fewer than `cap` questions; `None`
    /// when it is full. The count and the insert are atomic per exam.
    async fn insert_question_within(
        &self,
        row: NewQuestionRow,
        cap: i64,
    ) -> Result<Option<QuestionRow>, ProviderError>;
    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> Result<Option<QuestionRow>, ProviderError>;
    async fn delete_question(&self, id: i64) -> Result<bool, ProviderError>;

    // discussions
    /// Newest first.
    async fn select_discussions(&self) -> Result<Vec<DiscussionRow>, ProviderError>;
    async fn select_discussion(&self, id: i64) -> Result<Option<DiscussionRow>, ProviderError>;
    async fn insert_discussion(&self, row: NewDiscussionRow)
    -> Result<DiscussionRow, ProviderError>;
    /// Oldest first.
    async fn select_comments(&self, discussion_id: i64) -> Result<Vec<CommentRow>, ProviderError>;
    async fn insert_comment(&self, row: NewCommentRow) -> Result<CommentRow, ProviderError>;
    /// Atomically adds one like; returns the new count, `None` if the row is missing.
    async fn increment_discussion_likes(&self, id: i64) -> Result<Option<i32>, ProviderError>;
    async fn increment_comment_likes(&self, id: i64) -> Result<Option<i32>, ProviderError>;

    // profiles
    async fn insert_profile(&self, row: NewProfileRow) -> Result<ProfileRow, ProviderError>;
    async fn select_profile(&self, id: Uuid) -> Result<Option<ProfileRow>, ProviderError>;
    async fn select_profile_by_email(&self, email: &str)
    -> Result<Option<ProfileRow>, ProviderError>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<ProfileRow>, ProviderError>;

    /// Subscribes to change notifications for every table.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
