use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use super::{
    ChangeEvent, ChangeFeed, ChangeOp, Provider, ProviderError, Table,
    rows::{
        CommentRow, DiscussionRow, ExamChanges, ExamRow, NewCommentRow, NewDiscussionRow,
        NewExamRow, NewProfileRow, NewQuestionRow, ProfileChanges, ProfileRow, QuestionChanges,
        QuestionRow,
    },
};

#[derive(Default)]
struct Tables {
    exams: BTreeMap<i64, ExamRow>,
    questions: BTreeMap<i64, QuestionRow>,
    discussions: BTreeMap<i64, DiscussionRow>,
    comments: BTreeMap<i64, CommentRow>,
    profiles: BTreeMap<Uuid, ProfileRow>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_question(&mut self, row: NewQuestionRow) -> Result<QuestionRow, ProviderError> {
        if !self.exams.contains_key(&row.exam_id) {
            return Err(ProviderError::Unavailable(format!(
                "foreign key violation: exam {} does not exist",
                row.exam_id
            )));
        }
        let id = self.next_id();
        let now = Utc::now();
        let inserted = QuestionRow {
            id,
            exam_id: Some(row.exam_id),
            text: row.text,
            options: Json(row.options),
            correct_answer: row.correct_answer,
            explanation: row.explanation,
            created_at: now,
            updated_at: now,
        };
        self.questions.insert(id, inserted.clone());
        Ok(inserted)
    }
}

/// In-process provider. Used when no database is configured and by the test
/// suites. Data lives as long as the process.
#[derive(Default)]
pub struct MemoryProvider {
    tables: Mutex<Tables>,
    feed: ChangeFeed,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn select_exams(&self) -> Result<Vec<ExamRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables.exams.values().cloned().collect())
    }

    async fn select_exam(&self, id: i64) -> Result<Option<ExamRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables.exams.get(&id).cloned())
    }

    async fn insert_exam(&self, row: NewExamRow) -> Result<ExamRow, ProviderError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let now = Utc::now();
        let inserted = ExamRow {
            id,
            title: row.title,
            exam_type: row.exam_type,
            year: row.year,
            subject: row.subject,
            status: row.status,
            created_by: row.created_by,
            attempts: 0,
            created_at: now,
            updated_at: now,
        };
        tables.exams.insert(id, inserted.clone());
        drop(tables);

        self.feed.publish(Table::Exams, ChangeOp::Insert, id);
        Ok(inserted)
    }

    async fn update_exam(
        &self,
        id: i64,
        changes: ExamChanges,
    ) -> Result<Option<ExamRow>, ProviderError> {
        let mut tables = self.tables.lock().await;
        let Some(exam) = tables.exams.get_mut(&id) else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(exam.clone()));
        }

        if let Some(title) = changes.title {
            exam.title = title;
        }
        if let Some(exam_type) = changes.exam_type {
            exam.exam_type = exam_type;
        }
        if let Some(year) = changes.year {
            exam.year = year;
        }
        if let Some(subject) = changes.subject {
            exam.subject = subject;
        }
        if let Some(status) = changes.status {
            exam.status = status;
        }
        exam.updated_at = Utc::now();
        let updated = exam.clone();
        drop(tables);

        self.feed.publish(Table::Exams, ChangeOp::Update, id);
        Ok(Some(updated))
    }

    async fn select_questions(
        &self,
        exam_id: Option<i64>,
    ) -> Result<Vec<QuestionRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| exam_id.is_none() || q.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn select_question(&self, id: i64) -> Result<Option<QuestionRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.get(&id).cloned())
    }

    async fn insert_question(&self, row: NewQuestionRow) -> Result<QuestionRow, ProviderError> {
        let mut tables = self.tables.lock().await;
        let inserted = tables.push_question(row)?;
        drop(tables);

        self.feed.publish(Table::Questions, ChangeOp::Insert, inserted.id);
        Ok(inserted)
    }

    async fn insert_question_within(
        &self,
        row: NewQuestionRow,
        cap: i64,
    ) -> Result<Option<QuestionRow>, ProviderError> {
        let mut tables = self.tables.lock().await;
        let count = tables
            .questions
            .values()
            .filter(|q| q.exam_id == Some(row.exam_id))
            .count();
        if count as i64 >= cap {
            return Ok(None);
        }
        let inserted = tables.push_question(row)?;
        drop(tables);

        self.feed.publish(Table::Questions, ChangeOp::Insert, inserted.id);
        Ok(Some(inserted))
    }

    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> Result<Option<QuestionRow>, ProviderError> {
        let mut tables = self.tables.lock().await;
        let Some(question) = tables.questions.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(text) = changes.text {
            question.text = text;
        }
        if let Some(options) = changes.options {
            question.options = Json(options);
        }
        if let Some(correct_answer) = changes.correct_answer {
            question.correct_answer = correct_answer;
        }
        if let Some(explanation) = changes.explanation {
            question.explanation = explanation;
        }
        question.updated_at = Utc::now();
        let updated = question.clone();
        drop(tables);

        self.feed.publish(Table::Questions, ChangeOp::Update, id);
        Ok(Some(updated))
    }

    async fn delete_question(&self, id: i64) -> Result<bool, ProviderError> {
        let mut tables = self.tables.lock().await;
        let deleted = tables.questions.remove(&id).is_some();
        drop(tables);

        if deleted {
            self.feed.publish(Table::Questions, ChangeOp::Delete, id);
        }
        Ok(deleted)
    }

    async fn select_discussions(&self) -> Result<Vec<DiscussionRow>, ProviderError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<DiscussionRow> = tables.discussions.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn select_discussion(&self, id: i64) -> Result<Option<DiscussionRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables.discussions.get(&id).cloned())
    }

    async fn insert_discussion(
        &self,
        row: NewDiscussionRow,
    ) -> Result<DiscussionRow, ProviderError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let now = Utc::now();
        let inserted = DiscussionRow {
            id,
            author_id: Some(row.author_id),
            title: row.title,
            content: row.content,
            likes: 0,
            created_at: now,
            updated_at: now,
        };
        tables.discussions.insert(id, inserted.clone());
        drop(tables);

        self.feed.publish(Table::Discussions, ChangeOp::Insert, id);
        Ok(inserted)
    }

    async fn select_comments(&self, discussion_id: i64) -> Result<Vec<CommentRow>, ProviderError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<CommentRow> = tables
            .comments
            .values()
            .filter(|c| c.discussion_id == Some(discussion_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn insert_comment(&self, row: NewCommentRow) -> Result<CommentRow, ProviderError> {
        let mut tables = self.tables.lock().await;
        if !tables.discussions.contains_key(&row.discussion_id) {
            return Err(ProviderError::Unavailable(format!(
                "foreign key violation: discussion {} does not exist",
                row.discussion_id
            )));
        }
        let id = tables.next_id();
        let now = Utc::now();
        let inserted = CommentRow {
            id,
            discussion_id: Some(row.discussion_id),
            author_id: Some(row.author_id),
            content: row.content,
            likes: 0,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(id, inserted.clone());
        drop(tables);

        self.feed
            .publish(Table::DiscussionComments, ChangeOp::Insert, id);
        Ok(inserted)
    }

    async fn increment_discussion_likes(&self, id: i64) -> Result<Option<i32>, ProviderError> {
        let mut tables = self.tables.lock().await;
        let likes = tables.discussions.get_mut(&id).map(|d| {
            d.likes += 1;
            d.likes
        });
        drop(tables);

        if likes.is_some() {
            self.feed.publish(Table::Discussions, ChangeOp::Update, id);
        }
        Ok(likes)
    }

    async fn increment_comment_likes(&self, id: i64) -> Result<Option<i32>, ProviderError> {
        let mut tables = self.tables.lock().await;
        let likes = tables.comments.get_mut(&id).map(|c| {
            c.likes += 1;
            c.likes
        });
        drop(tables);

        if likes.is_some() {
            self.feed
                .publish(Table::DiscussionComments, ChangeOp::Update, id);
        }
        Ok(likes)
    }

    async fn insert_profile(&self, row: NewProfileRow) -> Result<ProfileRow, ProviderError> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .profiles
            .values()
            .any(|p| p.email.eq_ignore_ascii_case(&row.email));
        if taken {
            return Err(ProviderError::Duplicate(
                "duplicate key value violates unique constraint \"profiles_email_key\"".to_string(),
            ));
        }

        let now = Utc::now();
        let inserted = ProfileRow {
            id: Uuid::new_v4(),
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            last_name: None,
            role: Some(row.role),
            settings: None,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn select_profile(&self, id: Uuid) -> Result<Option<ProfileRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables.profiles.get(&id).cloned())
    }

    async fn select_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .profiles
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        let mut tables = self.tables.lock().await;
        let Some(profile) = tables.profiles.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(full_name) = changes.full_name {
            profile.full_name = Some(full_name);
        }
        if let Some(last_name) = changes.last_name {
            profile.last_name = Some(last_name);
        }
        if let Some(settings) = changes.settings {
            profile.settings = Some(Json(settings));
        }
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
