//! Per-admin authoring workspace.
//!
//! The workspace moves between a handful of states on explicit actions only:
//!
//! ```text
//! Idle -> AddingExam -> Idle
//! Idle -> SelectingExam -> AddingQuestion | EditingQuestion | ViewingStats -> SelectingExam
//! ```
//!
//! An action that does not apply to the current state is rejected and nothing
//! changes. A submission that fails validation or storage keeps the state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::forms::{ExamForm, QuestionForm};
use crate::{
    error::AppError,
    models::{
        exam::{CopyOptions, Exam, ExamStats},
        question::Question,
    },
    repository::ExamRepository,
};

/// Authoring sessions keyed by admin profile id.
pub type Workspaces = Arc<Mutex<HashMap<Uuid, AuthoringSession>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AuthoringState {
    #[default]
    Idle,
    AddingExam,
    SelectingExam {
        exam_id: i64,
    },
    AddingQuestion {
        exam_id: i64,
    },
    EditingQuestion {
        exam_id: i64,
        question_id: i64,
    },
    ViewingStats {
        exam_id: i64,
    },
}

impl AuthoringState {
    fn exam_id(&self) -> Option<i64> {
        match *self {
            AuthoringState::Idle | AuthoringState::AddingExam => None,
            AuthoringState::SelectingExam { exam_id }
            | AuthoringState::AddingQuestion { exam_id }
            | AuthoringState::EditingQuestion { exam_id, .. }
            | AuthoringState::ViewingStats { exam_id } => Some(exam_id),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AuthoringState::Idle => "idle",
            AuthoringState::AddingExam => "adding_exam",
            AuthoringState::SelectingExam { .. } => "selecting_exam",
            AuthoringState::AddingQuestion { .. } => "adding_question",
            AuthoringState::EditingQuestion { .. } => "editing_question",
            AuthoringState::ViewingStats { .. } => "viewing_stats",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AuthoringAction {
    AddExam,
    SubmitExam {
        form: ExamForm,
    },
    SelectExam {
        exam_id: i64,
    },
    AddQuestion,
    EditQuestion {
        question_id: i64,
    },
    SubmitQuestion {
        form: QuestionForm,
    },
    DeleteQuestion {
        question_id: i64,
    },
    CopyExam {
        #[serde(default)]
        include_questions: bool,
    },
    ShowStats,
    Cancel,
    Close,
}

impl AuthoringAction {
    fn name(&self) -> &'static str {
        match self {
            AuthoringAction::AddExam => "add_exam",
            AuthoringAction::SubmitExam { .. } => "submit_exam",
            AuthoringAction::SelectExam { .. } => "select_exam",
            AuthoringAction::AddQuestion => "add_question",
            AuthoringAction::EditQuestion { .. } => "edit_question",
            AuthoringAction::SubmitQuestion { .. } => "submit_question",
            AuthoringAction::DeleteQuestion { .. } => "delete_question",
            AuthoringAction::CopyExam { .. } => "copy_exam",
            AuthoringAction::ShowStats => "show_stats",
            AuthoringAction::Cancel => "cancel",
            AuthoringAction::Close => "close",
        }
    }
}

/// Side effect of the last accepted action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthoringOutcome {
    ExamCreated { exam: Exam },
    ExamCopied { exam: Exam },
    QuestionSaved { question: Question },
    QuestionDeleted { id: i64 },
}

/// Everything the workspace screen needs after an action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceView {
    #[serde(flatten)]
    pub state: AuthoringState,
    pub exam: Option<Exam>,
    /// Prefilled form when editing a question.
    pub question_form: Option<QuestionForm>,
    pub stats: Option<ExamStats>,
    pub outcome: Option<AuthoringOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct AuthoringSession {
    state: AuthoringState,
}

impl AuthoringSession {
    pub fn state(&self) -> AuthoringState {
        self.state
    }

    /// Applies `action` and returns the resulting view. On error the state is
    /// left as it was.
    pub async fn apply(
        &mut self,
        action: AuthoringAction,
        repo: &ExamRepository,
        admin_id: Uuid,
    ) -> Result<WorkspaceView, AppError> {
        use AuthoringAction as A;
        use AuthoringState as S;

        let current = self.state;
        let (next, outcome) = match (current, action) {
            (S::Idle, A::AddExam) => (S::AddingExam, None),
            (S::AddingExam, A::SubmitExam { form }) => {
                let draft = form.into_draft()?;
                let exam = repo.create(draft, Some(admin_id)).await?;
                (S::Idle, Some(AuthoringOutcome::ExamCreated { exam }))
            }
            (S::AddingExam, A::Cancel) => (S::Idle, None),

            (S::Idle | S::SelectingExam { .. }, A::SelectExam { exam_id }) => {
                repo.get(exam_id).await?;
                (S::SelectingExam { exam_id }, None)
            }
            (S::SelectingExam { exam_id }, A::AddQuestion) => (S::AddingQuestion { exam_id }, None),
            (S::SelectingExam { exam_id }, A::EditQuestion { question_id }) => {
                let exam = repo.get(exam_id).await?;
                if !exam.questions.iter().any(|q| q.id == question_id) {
                    return Err(AppError::NotFound(format!(
                        "Question {} not found in exam {}",
                        question_id, exam_id
                    )));
                }
                (
                    S::EditingQuestion {
                        exam_id,
                        question_id,
                    },
                    None,
                )
            }
            (S::SelectingExam { exam_id }, A::DeleteQuestion { question_id }) => {
                let exam = repo.get(exam_id).await?;
                if !exam.questions.iter().any(|q| q.id == question_id) {
                    return Err(AppError::NotFound(format!(
                        "Question {} not found in exam {}",
                        question_id, exam_id
                    )));
                }
                repo.delete_question(question_id).await?;
                (
                    S::SelectingExam { exam_id },
                    Some(AuthoringOutcome::QuestionDeleted { id: question_id }),
                )
            }
            (S::SelectingExam { exam_id }, A::CopyExam { include_questions }) => {
                let exam = repo
                    .copy(exam_id, CopyOptions { include_questions }, Some(admin_id))
                    .await?;
                (
                    S::SelectingExam { exam_id },
                    Some(AuthoringOutcome::ExamCopied { exam }),
                )
            }
            (S::SelectingExam { exam_id }, A::ShowStats) => (S::ViewingStats { exam_id }, None),
            (S::SelectingExam { .. }, A::Close) => (S::Idle, None),

            (S::AddingQuestion { exam_id }, A::SubmitQuestion { form }) => {
                let draft = form.into_draft()?;
                let question = repo.save_question(exam_id, draft, None).await?;
                (
                    S::SelectingExam { exam_id },
                    Some(AuthoringOutcome::QuestionSaved { question }),
                )
            }
            (
                S::EditingQuestion {
                    exam_id,
                    question_id,
                },
                A::SubmitQuestion { form },
            ) => {
                let draft = form.into_draft()?;
                let question = repo.save_question(exam_id, draft, Some(question_id)).await?;
                (
                    S::SelectingExam { exam_id },
                    Some(AuthoringOutcome::QuestionSaved { question }),
                )
            }
            (
                S::AddingQuestion { exam_id }
                | S::EditingQuestion { exam_id, .. }
                | S::ViewingStats { exam_id },
                A::Cancel | A::Close,
            ) => (S::SelectingExam { exam_id }, None),

            (state, action) => {
                return Err(AppError::Conflict(format!(
                    "Action '{}' is not available while {}",
                    action.name(),
                    state.name()
                )));
            }
        };

        tracing::debug!(
            "Authoring session of {}: {} -> {}",
            admin_id,
            current.name(),
            next.name()
        );
        let mut view = Self::render(next, repo).await?;
        self.state = next;

        view.outcome = outcome;
        Ok(view)
    }

    /// Renders the current state.
    pub async fn view(&self, repo: &ExamRepository) -> Result<WorkspaceView, AppError> {
        Self::render(self.state, repo).await
    }

    async fn render(state: AuthoringState, repo: &ExamRepository) -> Result<WorkspaceView, AppError> {
        let exam = match state.exam_id() {
            Some(id) => Some(repo.get(id).await?),
            None => None,
        };

        let question_form = match (state, &exam) {
            (AuthoringState::EditingQuestion { question_id, .. }, Some(exam)) => exam
                .questions
                .iter()
                .find(|q| q.id == question_id)
                .map(QuestionForm::from_question),
            _ => None,
        };

        let stats = match state {
            AuthoringState::ViewingStats { exam_id } => Some(repo.stats(exam_id).await?),
            _ => None,
        };

        Ok(WorkspaceView {
            state,
            exam,
            question_form,
            stats,
            outcome: None,
        })
    }
}
