use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_not_blank;

/// A discussion thread opener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: i64,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub discussion_id: i64,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discussion together with its comments, oldest comment first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionThread {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub comments: Vec<Comment>,
}

/// DTO for creating a new discussion.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiscussionRequest {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,

    #[validate(
        length(max = 10000, message = "Content must be at most 10000 characters"),
        custom(function = validate_not_blank)
    )]
    pub content: String,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(
        length(max = 2000, message = "Comment must be at most 2000 characters"),
        custom(function = validate_not_blank)
    )]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub id: i64,
    pub likes: i32,
}
