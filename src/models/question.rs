// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,

    /// The text content of the question.
    pub text: String,

    /// Answer options in display order.
    pub options: Vec<String>,

    /// Zero-based index into `options`.
    pub correct_answer: usize,

    /// Explanation of the correct answer.
    pub explanation: String,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer
    }
}

/// DTO for sending a question to a student (excludes answer and explanation).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

/// A validated question ready to be stored. `correct_answer` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

impl QuestionDraft {
    pub fn answer_in_range(&self) -> bool {
        self.correct_answer < self.options.len()
    }
}
