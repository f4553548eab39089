// src/handlers/admin.rs

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use crate::{
    authoring::{AuthoringAction, ExamForm, QuestionForm, Workspaces},
    error::AppError,
    models::exam::{CopyOptions, Exam, ExamPatch},
    provider::Table,
    repository::ExamRepository,
    utils::jwt::Session,
};

/// Every exam with its questions and answers. Admin only.
pub async fn list_exams(State(repo): State<ExamRepository>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list().await?))
}

pub async fn create_exam(
    State(repo): State<ExamRepository>,
    session: Session,
    Json(form): Json<ExamForm>,
) -> Result<impl IntoResponse, AppError> {
    let draft = form.into_draft()?;
    let exam = repo.create(draft, Some(session.user_id)).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Partial update; the year/subject rule is checked against the resulting type.
pub async fn update_exam(
    State(repo): State<ExamRepository>,
    Path(id): Path<i64>,
    Json(patch): Json<ExamPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.update(id, patch).await?))
}

/// `?includeQuestions=true` also duplicates the questions.
pub async fn copy_exam(
    State(repo): State<ExamRepository>,
    session: Session,
    Path(id): Path<i64>,
    Query(options): Query<CopyOptions>,
) -> Result<impl IntoResponse, AppError> {
    let exam = repo.copy(id, options, Some(session.user_id)).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn exam_stats(
    State(repo): State<ExamRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.stats(id).await?))
}

/// Adds a question, refused with 409 once the exam is full.
pub async fn add_question(
    State(repo): State<ExamRepository>,
    Path(exam_id): Path<i64>,
    Json(form): Json<QuestionForm>,
) -> Result<impl IntoResponse, AppError> {
    let draft = form.into_draft()?;
    let question = repo.add_question(exam_id, draft).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(repo): State<ExamRepository>,
    Path(id): Path<i64>,
    Json(form): Json<QuestionForm>,
) -> Result<impl IntoResponse, AppError> {
    let draft = form.into_draft()?;
    Ok(Json(repo.edit_question(id, draft).await?))
}

pub async fn delete_question(
    State(repo): State<ExamRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn exams_event(exams: &[Exam]) -> Option<Result<Event, Infallible>> {
    match Event::default().event("exams").json_data(exams) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            tracing::error!("Failed to encode exam list: {:?}", e);
            None
        }
    }
}

/// Server-sent events carrying the full exam list: once on connect, then
/// again after every change to exams or questions.
pub async fn exam_changes(
    State(repo): State<ExamRepository>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = repo.subscribe();
    let initial = repo.list().await?;

    let updates = BroadcastStream::new(receiver)
        .filter(|change| match change {
            Ok(event) => matches!(event.table, Table::Exams | Table::Questions),
            // Missed some events; a refetch covers them.
            Err(_) => true,
        })
        .then(move |_| {
            let repo = repo.clone();
            async move { repo.list().await }
        })
        .filter_map(|result| match result {
            Ok(exams) => exams_event(&exams),
            Err(e) => {
                tracing::error!("Failed to refetch exams: {}", e);
                None
            }
        });

    let stream = tokio_stream::iter(exams_event(&initial)).chain(updates);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Current state of the caller's authoring workspace.
pub async fn workspace_view(
    State(repo): State<ExamRepository>,
    State(workspaces): State<Workspaces>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let workspace = workspaces
        .lock()
        .await
        .get(&session.user_id)
        .cloned()
        .unwrap_or_default();
    Ok(Json(workspace.view(&repo).await?))
}

/// Applies one authoring action. Rejected actions leave the workspace as it was.
///
/// The map lock is only held to read and store the caller's session, so one
/// admin's repository calls never wait on another's.
pub async fn workspace_action(
    State(repo): State<ExamRepository>,
    State(workspaces): State<Workspaces>,
    session: Session,
    Json(action): Json<AuthoringAction>,
) -> Result<impl IntoResponse, AppError> {
    let mut workspace = workspaces
        .lock()
        .await
        .get(&session.user_id)
        .cloned()
        .unwrap_or_default();

    let view = workspace.apply(action, &repo, session.user_id).await?;

    workspaces.lock().await.insert(session.user_id, workspace);
    Ok(Json(view))
}
