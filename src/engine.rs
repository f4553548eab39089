//! Exam-taking engine.
//!
//! A [`QuizRun`] walks a fixed, preloaded list of questions in order. Every
//! submission is final: there is no skipping and no going back. Runs are kept
//! in memory only and are dropped when abandoned.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::question::{PublicQuestion, Question};

/// Active runs, one per signed-in user.
pub type QuizRuns = Arc<Mutex<HashMap<Uuid, QuizRun>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    NoQuestions,
    Finished,
    OptionOutOfRange { selected: usize, options: usize },
}

impl std::fmt::Display for QuizError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizError::NoQuestions => write!(f, "This exam has no questions yet"),
            QuizError::Finished => write!(f, "The exam is already finished"),
            QuizError::OptionOutOfRange { selected, options } => write!(
                f,
                "Answer {} is out of range; choose 0 to {}",
                selected,
                options.saturating_sub(1)
            ),
        }
    }
}

impl std::error::Error for QuizError {}

/// Result of a single submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: usize,
    pub explanation: String,
    pub score: usize,
    pub finished: bool,
}

/// What the student sees of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub exam_id: i64,
    pub title: String,
    /// Zero-based position of the current question (equals `total` once finished).
    pub position: usize,
    pub total: usize,
    pub score: usize,
    pub finished: bool,
    pub question: Option<PublicQuestion>,
}

#[derive(Debug, Clone)]
pub struct QuizRun {
    exam_id: i64,
    title: String,
    questions: Vec<Question>,
    position: usize,
    score: usize,
}

impl QuizRun {
    pub fn new(exam_id: i64, title: String, questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(Self {
            exam_id,
            title,
            questions,
            position: 0,
            score: 0,
        })
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.position)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.questions.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// Records the answer to the current question and moves on.
    pub fn submit(&mut self, selected: usize) -> Result<AnswerFeedback, QuizError> {
        let question = self.current().ok_or(QuizError::Finished)?;
        if selected >= question.options.len() {
            return Err(QuizError::OptionOutOfRange {
                selected,
                options: question.options.len(),
            });
        }

        let correct = question.is_correct(selected);
        let correct_answer = question.correct_answer;
        let explanation = question.explanation.clone();

        if correct {
            self.score += 1;
        }
        self.position += 1;

        Ok(AnswerFeedback {
            correct,
            correct_answer,
            explanation,
            score: self.score,
            finished: self.is_finished(),
        })
    }

    pub fn restart(&mut self) {
        self.position = 0;
        self.score = 0;
    }

    pub fn view(&self) -> QuizView {
        QuizView {
            exam_id: self.exam_id,
            title: self.title.clone(),
            position: self.position,
            total: self.total(),
            score: self.score,
            finished: self.is_finished(),
            question: self.current().map(PublicQuestion::from),
        }
    }
}
