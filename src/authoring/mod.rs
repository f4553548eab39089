//! Admin authoring: validated forms and the per-admin workspace.

pub mod forms;
pub mod session;

pub use forms::{ExamForm, QuestionForm};
pub use session::{AuthoringAction, AuthoringSession, AuthoringState, WorkspaceView, Workspaces};
