//! Row shapes as stored by the provider.
//!
//! These mirror the database tables column for column (snake_case, nullable
//! columns as `Option`). Only the repository layer reads them; everything above
//! works with the entities in `crate::models`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

/// Represents the 'exams' table, plus the attempt count aggregated from
/// 'exam_attempts'.
#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub title: String,
    /// Mapped from the column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub exam_type: String,
    pub year: Option<String>,
    pub subject: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExamRow {
    pub title: String,
    pub exam_type: String,
    pub year: Option<String>,
    pub subject: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
}

/// Column changes for an exam. `None` leaves the column untouched; the nested
/// `Option` on `year`/`subject` allows writing NULL.
#[derive(Debug, Clone, Default)]
pub struct ExamChanges {
    pub title: Option<String>,
    pub exam_type: Option<String>,
    pub year: Option<Option<String>>,
    pub subject: Option<Option<String>>,
    pub status: Option<String>,
}

impl ExamChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.exam_type.is_none()
            && self.year.is_none()
            && self.subject.is_none()
            && self.status.is_none()
    }
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub exam_id: Option<i64>,
    pub text: String,
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,
    /// Zero-based index into `options`.
    pub correct_answer: i32,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuestionRow {
    pub exam_id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionChanges {
    pub text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<i32>,
    pub explanation: Option<Option<String>>,
}

/// Represents the 'discussions' table.
#[derive(Debug, Clone, FromRow)]
pub struct DiscussionRow {
    pub id: i64,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDiscussionRow {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

/// Represents the 'discussion_comments' table.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub discussion_id: Option<i64>,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCommentRow {
    pub discussion_id: i64,
    pub author_id: Uuid,
    pub content: String,
}

/// Represents the 'profiles' table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    /// Argon2 password hash.
    pub password_hash: String,
    pub full_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub settings: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProfileRow {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub last_name: Option<String>,
    pub settings: Option<serde_json::Value>,
}
