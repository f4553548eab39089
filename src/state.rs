// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    authoring::Workspaces,
    config::Config,
    engine::QuizRuns,
    provider::Provider,
    repository::{DiscussionRepository, ExamRepository, ProfileRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub config: Config,
    pub quiz_runs: QuizRuns,
    pub workspaces: Workspaces,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, config: Config) -> Self {
        Self {
            provider,
            config,
            quiz_runs: QuizRuns::default(),
            workspaces: Workspaces::default(),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ExamRepository {
    fn from_ref(state: &AppState) -> Self {
        ExamRepository::new(state.provider.clone())
    }
}

impl FromRef<AppState> for DiscussionRepository {
    fn from_ref(state: &AppState) -> Self {
        DiscussionRepository::new(state.provider.clone())
    }
}

impl FromRef<AppState> for ProfileRepository {
    fn from_ref(state: &AppState) -> Self {
        ProfileRepository::new(state.provider.clone())
    }
}

impl FromRef<AppState> for QuizRuns {
    fn from_ref(state: &AppState) -> Self {
        state.quiz_runs.clone()
    }
}

impl FromRef<AppState> for Workspaces {
    fn from_ref(state: &AppState) -> Self {
        state.workspaces.clone()
    }
}
