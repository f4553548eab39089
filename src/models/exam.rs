// src/models/exam.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{HISTORICAL_QUESTION_CAP, SUBJECT_QUESTION_CAP},
    models::question::Question,
};

/// Exam type: past-year paper or subject exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Historical,
    Subject,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Historical => "historical",
            ExamType::Subject => "subject",
        }
    }

    /// Maximum number of questions an exam of this type may hold.
    pub fn question_cap(&self) -> usize {
        match self {
            ExamType::Historical => HISTORICAL_QUESTION_CAP,
            ExamType::Subject => SUBJECT_QUESTION_CAP,
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "historical" => Ok(ExamType::Historical),
            "subject" => Ok(ExamType::Subject),
            other => Err(format!("unknown exam type '{}'", other)),
        }
    }
}

/// The discriminated part of an exam: a historical exam carries a year, a
/// subject exam carries a subject, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExamKind {
    Historical { year: String },
    Subject { subject: String },
}

impl ExamKind {
    /// Builds the kind from its loose parts, keeping only the field that
    /// matches `exam_type`.
    pub fn new(
        exam_type: ExamType,
        year: Option<&str>,
        subject: Option<&str>,
    ) -> Result<Self, String> {
        fn non_blank(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        match exam_type {
            ExamType::Historical => non_blank(year)
                .map(|year| ExamKind::Historical {
                    year: year.to_string(),
                })
                .ok_or_else(|| "A historical exam requires a year".to_string()),
            ExamType::Subject => non_blank(subject)
                .map(|subject| ExamKind::Subject {
                    subject: subject.to_string(),
                })
                .ok_or_else(|| "A subject exam requires a subject".to_string()),
        }
    }

    pub fn exam_type(&self) -> ExamType {
        match self {
            ExamKind::Historical { .. } => ExamType::Historical,
            ExamKind::Subject { .. } => ExamType::Subject,
        }
    }

    pub fn year(&self) -> Option<&str> {
        match self {
            ExamKind::Historical { year } => Some(year),
            ExamKind::Subject { .. } => None,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            ExamKind::Historical { .. } => None,
            ExamKind::Subject { subject } => Some(subject),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    #[default]
    Active,
    Inactive,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Active => "active",
            ExamStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ExamStatus::Active),
            "inactive" => Ok(ExamStatus::Inactive),
            other => Err(format!("unknown exam status '{}'", other)),
        }
    }
}

/// An exam with its questions, as handed to the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub title: String,
    #[serde(flatten)]
    pub kind: ExamKind,
    pub attempts: i64,
    pub status: ExamStatus,
    pub questions: Vec<Question>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Exam {
    pub fn exam_type(&self) -> ExamType {
        self.kind.exam_type()
    }

    pub fn is_active(&self) -> bool {
        self.status == ExamStatus::Active
    }
}

/// Public listing entry (no questions, no answers).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: i64,
    pub title: String,
    #[serde(flatten)]
    pub kind: ExamKind,
    pub status: ExamStatus,
    pub question_count: usize,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title.clone(),
            kind: exam.kind.clone(),
            status: exam.status,
            question_count: exam.questions.len(),
        }
    }
}

/// A validated new exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDraft {
    pub title: String,
    pub kind: ExamKind,
}

/// Partial exam update. The discriminant is re-checked against the resulting
/// type when applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPatch {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub exam_type: Option<ExamType>,
    pub year: Option<String>,
    pub subject: Option<String>,
    pub status: Option<ExamStatus>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOptions {
    /// Duplicate the questions as well. Off by default.
    #[serde(default)]
    pub include_questions: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamStats {
    pub exam_id: i64,
    pub total_questions: usize,
    pub attempts: i64,
    pub question_cap: usize,
    pub remaining_capacity: usize,
}

/// A historical year and how many exams cover it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keeps_only_matching_field() {
        let kind = ExamKind::new(ExamType::Subject, Some("2020"), Some("Civil Law")).unwrap();
        assert_eq!(kind.subject(), Some("Civil Law"));
        assert_eq!(kind.year(), None);

        let kind = ExamKind::new(ExamType::Historical, Some("2020"), Some("Civil Law")).unwrap();
        assert_eq!(kind.year(), Some("2020"));
        assert_eq!(kind.subject(), None);
    }

    #[test]
    fn test_kind_requires_discriminant() {
        assert!(ExamKind::new(ExamType::Historical, None, Some("Civil Law")).is_err());
        assert!(ExamKind::new(ExamType::Subject, Some("2020"), Some("   ")).is_err());
    }

    #[test]
    fn test_kind_trims_discriminant() {
        let kind = ExamKind::new(ExamType::Subject, None, Some("  Civil Law ")).unwrap();
        assert_eq!(kind.subject(), Some("Civil Law"));
    }

    #[test]
    fn test_caps_per_type() {
        assert_eq!(ExamType::Historical.question_cap(), 50);
        assert_eq!(ExamType::Subject.question_cap(), 100);
    }

    #[test]
    fn test_exam_serializes_flat_discriminant() {
        let exam = Exam {
            id: 1,
            title: "Test".to_string(),
            kind: ExamKind::Subject {
                subject: "Civil Law".to_string(),
            },
            attempts: 0,
            status: ExamStatus::Active,
            questions: vec![],
            created_by: None,
            created_at: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&exam).unwrap();
        assert_eq!(json["type"], "subject");
        assert_eq!(json["subject"], "Civil Law");
        assert!(json.get("year").is_none());
        assert_eq!(json["status"], "active");
        assert_eq!(json["attempts"], 0);
    }
}
