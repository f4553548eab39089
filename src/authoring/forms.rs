//! Admin-facing forms for exams and questions.
//!
//! Forms are validated in full before anything reaches the repository. The
//! correct-answer field is entered 1-based (as shown to the admin) and stored
//! zero-based.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    models::{
        exam::{ExamDraft, ExamKind, ExamType},
        question::{Question, QuestionDraft},
    },
    utils::validation::{validate_not_blank, validate_year},
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_exam_discriminant, skip_on_field_errors = false))]
pub struct ExamForm {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = validate_not_blank)
    )]
    pub title: String,

    #[serde(rename = "type")]
    pub exam_type: ExamType,

    pub year: Option<String>,

    #[validate(length(max = 100, message = "Subject must be at most 100 characters"))]
    pub subject: Option<String>,
}

fn validate_exam_discriminant(form: &ExamForm) -> Result<(), ValidationError> {
    let kind =
        ExamKind::new(form.exam_type, form.year.as_deref(), form.subject.as_deref()).map_err(
            |msg| {
                let mut err = ValidationError::new("missing_discriminant");
                err.message = Some(msg.into());
                err
            },
        )?;
    if let Some(year) = kind.year() {
        validate_year(year)?;
    }
    Ok(())
}

impl ExamForm {
    /// Validates the form and turns it into a draft. The field that does not
    /// belong to the chosen type is dropped.
    pub fn into_draft(self) -> Result<ExamDraft, ValidationErrors> {
        // A year typed into a subject exam is irrelevant; do not let its
        // format block the submission.
        let form = match self.exam_type {
            ExamType::Subject => ExamForm { year: None, ..self },
            ExamType::Historical => ExamForm {
                subject: None,
                ..self
            },
        };
        form.validate()?;

        let kind = ExamKind::new(form.exam_type, form.year.as_deref(), form.subject.as_deref())
            .map_err(|msg| {
                let mut errors = ValidationErrors::new();
                let mut err = ValidationError::new("missing_discriminant");
                err.message = Some(msg.into());
                errors.add("__all__", err);
                errors
            })?;

        Ok(ExamDraft {
            title: form.title.trim().to_string(),
            kind,
        })
    }
}

/// The correct-answer selector arrives either as the text of a number input
/// ("2") or as a JSON number.
fn answer_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_answer_range, skip_on_field_errors = false))]
pub struct QuestionForm {
    #[validate(length(
        min = 10,
        max = 2000,
        message = "Question text must be at least 10 characters"
    ))]
    pub question_text: String,

    #[validate(
        length(min = 3, max = 4, message = "A question needs 3 or 4 options"),
        custom(function = validate_options)
    )]
    pub options: Vec<String>,

    /// 1-based position of the correct option.
    #[serde(deserialize_with = "answer_number")]
    pub correct_answer: String,

    #[validate(length(
        min = 10,
        max = 4000,
        message = "Explanation must be at least 10 characters"
    ))]
    pub explanation: String,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            let mut err = ValidationError::new("option_blank");
            err.message = Some("Every option must be filled in".into());
            return Err(err);
        }
        if opt.chars().count() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_range(form: &QuestionForm) -> Result<(), ValidationError> {
    match form.answer_position() {
        Some(pos) if pos >= 1 && pos <= form.options.len() => Ok(()),
        _ => {
            let mut err = ValidationError::new("answer_out_of_range");
            err.message = Some(
                format!(
                    "Correct answer must be a number between 1 and {}",
                    form.options.len()
                )
                .into(),
            );
            Err(err)
        }
    }
}

impl QuestionForm {
    /// Prefills the form from a stored question for editing.
    pub fn from_question(question: &Question) -> Self {
        Self {
            question_text: question.text.clone(),
            options: question.options.clone(),
            correct_answer: (question.correct_answer + 1).to_string(),
            explanation: question.explanation.clone(),
        }
    }

    fn answer_position(&self) -> Option<usize> {
        self.correct_answer.trim().parse::<usize>().ok()
    }

    fn trimmed(self) -> Self {
        Self {
            question_text: self.question_text.trim().to_string(),
            options: self.options.iter().map(|o| o.trim().to_string()).collect(),
            correct_answer: self.correct_answer.trim().to_string(),
            explanation: self.explanation.trim().to_string(),
        }
    }

    /// Trims and validates the form, then converts the answer to a
    /// zero-based index. Lengths are checked on the text that gets stored.
    pub fn into_draft(self) -> Result<QuestionDraft, ValidationErrors> {
        let form = self.trimmed();
        form.validate()?;

        // validate() guarantees a position in 1..=options.len()
        let position = form.answer_position().unwrap_or(1);

        Ok(QuestionDraft {
            text: form.question_text,
            options: form.options,
            correct_answer: position - 1,
            explanation: form.explanation,
        })
    }
}
