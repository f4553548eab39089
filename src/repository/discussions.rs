// src/repository/discussions.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::discussion::{Comment, Discussion, DiscussionThread},
    provider::{
        Provider, ProviderError,
        rows::{CommentRow, DiscussionRow, NewCommentRow, NewDiscussionRow},
    },
    utils::html::clean_html,
};

fn discussion_from_row(row: DiscussionRow) -> Discussion {
    Discussion {
        id: row.id,
        author_id: row.author_id,
        title: row.title,
        content: row.content,
        likes: row.likes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn comment_from_row(row: CommentRow) -> Result<Comment, ProviderError> {
    let discussion_id = row.discussion_id.ok_or_else(|| {
        ProviderError::Malformed(format!("comment {} has no discussion", row.id))
    })?;
    Ok(Comment {
        id: row.id,
        discussion_id,
        author_id: row.author_id,
        content: row.content,
        likes: row.likes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Sanitizes user-supplied markup and refuses what is left empty.
fn sanitized(content: &str) -> Result<String, AppError> {
    let cleaned = clean_html(content.trim());
    if cleaned.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(cleaned)
}

#[derive(Clone)]
pub struct DiscussionRepository {
    provider: Arc<dyn Provider>,
}

impl DiscussionRepository {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Discussions newest first, each with its comments oldest first.
    pub async fn list(&self) -> Result<Vec<DiscussionThread>, AppError> {
        let rows = self.provider.select_discussions().await?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in rows {
            let comments = self
                .provider
                .select_comments(row.id)
                .await?
                .into_iter()
                .map(comment_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            threads.push(DiscussionThread {
                discussion: discussion_from_row(row),
                comments,
            });
        }

        Ok(threads)
    }

    pub async fn create_discussion(
        &self,
        title: &str,
        content: &str,
        author: Uuid,
    ) -> Result<Discussion, AppError> {
        let row = self
            .provider
            .insert_discussion(NewDiscussionRow {
                author_id: author,
                title: title.trim().to_string(),
                content: sanitized(content)?,
            })
            .await?;

        tracing::info!("Discussion {} created by {}", row.id, author);
        Ok(discussion_from_row(row))
    }

    pub async fn add_comment(
        &self,
        discussion_id: i64,
        content: &str,
        author: Uuid,
    ) -> Result<Comment, AppError> {
        if self.provider.select_discussion(discussion_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Discussion {} not found",
                discussion_id
            )));
        }

        let row = self
            .provider
            .insert_comment(NewCommentRow {
                discussion_id,
                author_id: author,
                content: sanitized(content)?,
            })
            .await?;

        Ok(comment_from_row(row)?)
    }

    /// Adds one like and returns the new count.
    pub async fn like(&self, discussion_id: i64) -> Result<i32, AppError> {
        self.provider
            .increment_discussion_likes(discussion_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Discussion {} not found", discussion_id)))
    }

    pub async fn like_comment(&self, comment_id: i64) -> Result<i32, AppError> {
        self.provider
            .increment_comment_likes(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;

    fn repo() -> DiscussionRepository {
        DiscussionRepository::new(Arc::new(MemoryProvider::new()))
    }

    #[tokio::test]
    async fn test_list_orders_threads_and_comments() {
        let repo = repo();
        let author = Uuid::new_v4();

        let first = repo
            .create_discussion("Tort basics", "What is negligence?", author)
            .await
            .unwrap();
        let second = repo
            .create_discussion("Contracts", "Offer and acceptance", author)
            .await
            .unwrap();
        let c1 = repo.add_comment(first.id, "Duty of care", author).await.unwrap();
        let c2 = repo.add_comment(first.id, "Breach", author).await.unwrap();

        let threads = repo.list().await.unwrap();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].discussion.id, second.id);
        assert_eq!(threads[1].discussion.id, first.id);
        let ids: Vec<i64> = threads[1].comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c1.id, c2.id]);
        assert!(threads[0].comments.is_empty());
    }

    #[tokio::test]
    async fn test_likes_increment_by_one() {
        let repo = repo();
        let author = Uuid::new_v4();
        let d = repo
            .create_discussion("Evidence", "Hearsay rule", author)
            .await
            .unwrap();
        let c = repo.add_comment(d.id, "Exceptions apply", author).await.unwrap();

        assert_eq!(repo.like(d.id).await.unwrap(), 1);
        assert_eq!(repo.like(d.id).await.unwrap(), 2);
        assert_eq!(repo.like_comment(c.id).await.unwrap(), 1);

        let threads = repo.list().await.unwrap();
        assert_eq!(threads[0].discussion.likes, 2);
        assert_eq!(threads[0].comments[0].likes, 1);
    }

    #[tokio::test]
    async fn test_comment_on_missing_discussion() {
        let repo = repo();
        let err = repo
            .add_comment(999, "Hello", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = repo.like(999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_content_is_sanitized() {
        let repo = repo();
        let d = repo
            .create_discussion("XSS", "<b>bold</b><script>alert(1)</script>", Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(d.content, "<b>bold</b>");

        let err = repo
            .create_discussion("Empty", "<script>alert(1)</script>", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
