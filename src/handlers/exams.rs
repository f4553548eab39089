// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{error::AppError, models::exam::ExamSummary, repository::ExamRepository};

#[derive(Debug, Default, Deserialize)]
pub struct ExamFilter {
    pub year: Option<String>,
    pub subject: Option<String>,
}

/// Active exams, optionally narrowed to one year or one subject.
/// Questions are not included.
pub async fn list_exams(
    State(repo): State<ExamRepository>,
    Query(filter): Query<ExamFilter>,
) -> Result<impl IntoResponse, AppError> {
    let exams = repo.list().await?;

    let summaries: Vec<ExamSummary> = exams
        .iter()
        .filter(|e| e.is_active())
        .filter(|e| match &filter.year {
            Some(year) => e.kind.year() == Some(year.trim()),
            None => true,
        })
        .filter(|e| match &filter.subject {
            Some(subject) => e.kind.subject() == Some(subject.trim()),
            None => true,
        })
        .map(ExamSummary::from)
        .collect();

    Ok(Json(summaries))
}

/// Historical years with the number of exams in each.
pub async fn list_years(State(repo): State<ExamRepository>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.years().await?))
}
