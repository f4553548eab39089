// src/repository/exams.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    config::COPY_TITLE_PREFIX,
    error::AppError,
    models::{
        exam::{
            CopyOptions, Exam, ExamDraft, ExamKind, ExamPatch, ExamStats, ExamStatus, ExamType,
            YearCount,
        },
        question::{Question, QuestionDraft},
    },
    provider::{
        ChangeEvent, Provider, ProviderError,
        rows::{ExamChanges, ExamRow, NewExamRow, NewQuestionRow, QuestionChanges, QuestionRow},
    },
    utils::validation::validate_year,
};

fn question_from_row(row: QuestionRow) -> Result<Question, ProviderError> {
    let exam_id = row
        .exam_id
        .ok_or_else(|| ProviderError::Malformed(format!("question {} has no exam", row.id)))?;
    let correct_answer = usize::try_from(row.correct_answer).map_err(|_| {
        ProviderError::Malformed(format!(
            "question {} has a negative correct_answer",
            row.id
        ))
    })?;

    Ok(Question {
        id: row.id,
        exam_id,
        text: row.text,
        options: row.options.0,
        correct_answer,
        explanation: row.explanation.unwrap_or_default(),
        created_at: Some(row.created_at),
        updated_at: Some(row.updated_at),
    })
}

fn exam_from_row(row: ExamRow, questions: Vec<Question>) -> Result<Exam, ProviderError> {
    let exam_type: ExamType = row
        .exam_type
        .parse()
        .map_err(|e| ProviderError::Malformed(format!("exam {}: {}", row.id, e)))?;
    let kind = ExamKind::new(exam_type, row.year.as_deref(), row.subject.as_deref())
        .map_err(|e| ProviderError::Malformed(format!("exam {}: {}", row.id, e)))?;
    let status: ExamStatus = row
        .status
        .parse()
        .map_err(|e| ProviderError::Malformed(format!("exam {}: {}", row.id, e)))?;

    Ok(Exam {
        id: row.id,
        title: row.title,
        kind,
        attempts: row.attempts,
        status,
        questions,
        created_by: row.created_by,
        created_at: Some(row.created_at),
        updated_at: Some(row.updated_at),
    })
}

fn new_question_row(exam_id: i64, draft: QuestionDraft) -> Result<NewQuestionRow, AppError> {
    if !draft.answer_in_range() {
        return Err(AppError::BadRequest(
            "Correct answer must point at one of the options".to_string(),
        ));
    }
    Ok(NewQuestionRow {
        exam_id,
        text: draft.text,
        options: draft.options,
        correct_answer: draft.correct_answer as i32,
        explanation: Some(draft.explanation),
    })
}

/// Exams and their questions.
#[derive(Clone)]
pub struct ExamRepository {
    provider: Arc<dyn Provider>,
}

impl ExamRepository {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Change notifications for every table; callers pick what they need.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.provider.subscribe()
    }

    /// Every exam (ordered by id) with its questions nested, also ordered by id.
    pub async fn list(&self) -> Result<Vec<Exam>, AppError> {
        let exam_rows = self.provider.select_exams().await?;
        let question_rows = self.provider.select_questions(None).await?;

        let mut by_exam: HashMap<i64, Vec<Question>> = HashMap::new();
        for row in question_rows {
            if row.exam_id.is_none() {
                tracing::warn!("Skipping orphan question {}", row.id);
                continue;
            }
            let question = question_from_row(row)?;
            by_exam.entry(question.exam_id).or_default().push(question);
        }

        let mut exams = exam_rows
            .into_iter()
            .map(|row| {
                let mut questions = by_exam.remove(&row.id).unwrap_or_default();
                questions.sort_by_key(|q| q.id);
                exam_from_row(row, questions)
            })
            .collect::<Result<Vec<_>, _>>()?;
        exams.sort_by_key(|e| e.id);

        Ok(exams)
    }

    pub async fn get(&self, id: i64) -> Result<Exam, AppError> {
        let row = self
            .provider
            .select_exam(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", id)))?;

        let mut questions = self
            .provider
            .select_questions(Some(id))
            .await?
            .into_iter()
            .map(question_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        questions.sort_by_key(|q| q.id);

        Ok(exam_from_row(row, questions)?)
    }

    /// Inserts a new, active exam with no questions and no attempts.
    pub async fn create(
        &self,
        draft: ExamDraft,
        created_by: Option<Uuid>,
    ) -> Result<Exam, AppError> {
        let row = self
            .provider
            .insert_exam(NewExamRow {
                title: draft.title,
                exam_type: draft.kind.exam_type().as_str().to_string(),
                year: draft.kind.year().map(str::to_string),
                subject: draft.kind.subject().map(str::to_string),
                status: ExamStatus::Active.as_str().to_string(),
                created_by,
            })
            .await?;

        tracing::info!("Exam {} created ({})", row.id, row.exam_type);
        Ok(exam_from_row(row, Vec::new())?)
    }

    /// Merges `patch` into the stored exam. The discriminant is re-derived
    /// from the resulting type, so switching type clears the other field.
    pub async fn update(&self, id: i64, patch: ExamPatch) -> Result<Exam, AppError> {
        let current = self.get(id).await?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(AppError::BadRequest("Title cannot be empty".to_string()));
            }
        }

        let exam_type = patch.exam_type.unwrap_or(current.exam_type());
        let year = patch.year.as_deref().or(current.kind.year());
        let subject = patch.subject.as_deref().or(current.kind.subject());
        let kind = ExamKind::new(exam_type, year, subject).map_err(AppError::BadRequest)?;
        if let Some(year) = kind.year() {
            validate_year(year).map_err(|_| {
                AppError::BadRequest("Year must be four digits".to_string())
            })?;
        }

        let changes = ExamChanges {
            title: patch.title.map(|t| t.trim().to_string()),
            exam_type: Some(kind.exam_type().as_str().to_string()),
            year: Some(kind.year().map(str::to_string)),
            subject: Some(kind.subject().map(str::to_string)),
            status: patch.status.map(|s| s.as_str().to_string()),
        };

        self.provider
            .update_exam(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", id)))?;

        tracing::info!("Exam {} updated", id);
        self.get(id).await
    }

    /// Duplicates an exam as a fresh, active exam titled "copy of ...".
    /// Questions are only carried over when asked for.
    pub async fn copy(
        &self,
        id: i64,
        options: CopyOptions,
        created_by: Option<Uuid>,
    ) -> Result<Exam, AppError> {
        let source = self.get(id).await?;

        let copy = self
            .create(
                ExamDraft {
                    title: format!("{}{}", COPY_TITLE_PREFIX, source.title),
                    kind: source.kind.clone(),
                },
                created_by,
            )
            .await?;

        if options.include_questions {
            for question in source.questions {
                self.provider
                    .insert_question(NewQuestionRow {
                        exam_id: copy.id,
                        text: question.text,
                        options: question.options,
                        correct_answer: question.correct_answer as i32,
                        explanation: Some(question.explanation),
                    })
                    .await?;
            }
        }

        tracing::info!("Exam {} copied to {}", id, copy.id);
        self.get(copy.id).await
    }

    /// Adds a question unless the exam already holds as many as its type allows.
    pub async fn add_question(
        &self,
        exam_id: i64,
        draft: QuestionDraft,
    ) -> Result<Question, AppError> {
        let exam = self
            .provider
            .select_exam(exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", exam_id)))?;
        let exam_type: ExamType = exam
            .exam_type
            .parse()
            .map_err(|e: String| AppError::from(ProviderError::Malformed(e)))?;

        let cap = exam_type.question_cap();
        let row = self
            .provider
            .insert_question_within(new_question_row(exam_id, draft)?, cap as i64)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "This exam already has the maximum of {} questions",
                    cap
                ))
            })?;

        tracing::info!("Question {} added to exam {}", row.id, exam_id);
        Ok(question_from_row(row)?)
    }

    /// Rewrites a question in place. The exam's cap is not consulted.
    pub async fn edit_question(
        &self,
        question_id: i64,
        draft: QuestionDraft,
    ) -> Result<Question, AppError> {
        if !draft.answer_in_range() {
            return Err(AppError::BadRequest(
                "Correct answer must point at one of the options".to_string(),
            ));
        }

        let changes = QuestionChanges {
            text: Some(draft.text),
            options: Some(draft.options),
            correct_answer: Some(draft.correct_answer as i32),
            explanation: Some(Some(draft.explanation)),
        };

        let row = self
            .provider
            .update_question(question_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

        tracing::info!("Question {} updated", question_id);
        Ok(question_from_row(row)?)
    }

    /// Edits `editing` when given, otherwise adds a new question to `exam_id`.
    pub async fn save_question(
        &self,
        exam_id: i64,
        draft: QuestionDraft,
        editing: Option<i64>,
    ) -> Result<Question, AppError> {
        match editing {
            Some(question_id) => {
                let existing = self
                    .provider
                    .select_question(question_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Question {} not found", question_id))
                    })?;
                if existing.exam_id != Some(exam_id) {
                    return Err(AppError::NotFound(format!(
                        "Question {} does not belong to exam {}",
                        question_id, exam_id
                    )));
                }
                self.edit_question(question_id, draft).await
            }
            None => self.add_question(exam_id, draft).await,
        }
    }

    pub async fn delete_question(&self, question_id: i64) -> Result<(), AppError> {
        if !self.provider.delete_question(question_id).await? {
            return Err(AppError::NotFound(format!(
                "Question {} not found",
                question_id
            )));
        }
        tracing::info!("Question {} deleted", question_id);
        Ok(())
    }

    pub async fn stats(&self, id: i64) -> Result<ExamStats, AppError> {
        let exam = self.get(id).await?;
        let cap = exam.exam_type().question_cap();
        let total = exam.questions.len();

        Ok(ExamStats {
            exam_id: exam.id,
            total_questions: total,
            attempts: exam.attempts,
            question_cap: cap,
            remaining_capacity: cap.saturating_sub(total),
        })
    }

    /// Distinct years of historical exams, newest first, with how many exams
    /// each year has.
    pub async fn years(&self) -> Result<Vec<YearCount>, AppError> {
        let rows = self.provider.select_exams().await?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            if row.exam_type != ExamType::Historical.as_str() {
                continue;
            }
            if let Some(year) = row.year {
                *counts.entry(year).or_default() += 1;
            }
        }

        Ok(counts
            .into_iter()
            .rev()
            .map(|(year, count)| YearCount { year, count })
            .collect())
    }
}
