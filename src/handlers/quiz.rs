// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    engine::{QuizRun, QuizRuns},
    error::AppError,
    models::exam::Exam,
    repository::ExamRepository,
    utils::jwt::Session,
};

/// Picks the exam to take: by id, or the first active exam for a year or a
/// subject.
#[derive(Debug, Default, Deserialize)]
pub struct StartQuery {
    pub exam_id: Option<i64>,
    pub year: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Zero-based index of the chosen option.
    pub answer: usize,
}

fn pick_exam(exams: Vec<Exam>, query: &StartQuery) -> Result<Exam, AppError> {
    let mut active = exams.into_iter().filter(|e| e.is_active());

    let found = if let Some(id) = query.exam_id {
        active.find(|e| e.id == id)
    } else if let Some(year) = &query.year {
        active.find(|e| e.kind.year() == Some(year.trim()))
    } else if let Some(subject) = &query.subject {
        active.find(|e| e.kind.subject() == Some(subject.trim()))
    } else {
        return Err(AppError::BadRequest(
            "Choose an exam by exam_id, year or subject".to_string(),
        ));
    };

    found.ok_or_else(|| AppError::NotFound("No active exam matches the selection".to_string()))
}

/// Starts (or replaces) the caller's run over the exam's questions as they
/// are right now.
pub async fn start_quiz(
    State(repo): State<ExamRepository>,
    State(runs): State<QuizRuns>,
    session: Session,
    Query(query): Query<StartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let exam = pick_exam(repo.list().await?, &query)?;
    let exam_id = exam.id;
    let run = QuizRun::new(exam.id, exam.title, exam.questions)?;
    let view = run.view();

    runs.lock().await.insert(session.user_id, run);

    tracing::info!("Profile {} started exam {}", session.user_id, exam_id);
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn current_quiz(
    State(runs): State<QuizRuns>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let runs = runs.lock().await;
    let run = runs
        .get(&session.user_id)
        .ok_or_else(|| AppError::NotFound("No exam in progress".to_string()))?;
    Ok(Json(run.view()))
}

pub async fn submit_answer(
    State(runs): State<QuizRuns>,
    session: Session,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut runs = runs.lock().await;
    let run = runs
        .get_mut(&session.user_id)
        .ok_or_else(|| AppError::NotFound("No exam in progress".to_string()))?;

    let feedback = run.submit(payload.answer)?;
    if feedback.finished {
        tracing::info!(
            "Profile {} finished with {}/{}",
            session.user_id,
            feedback.score,
            run.total()
        );
    }
    Ok(Json(feedback))
}

pub async fn restart_quiz(
    State(runs): State<QuizRuns>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let mut runs = runs.lock().await;
    let run = runs
        .get_mut(&session.user_id)
        .ok_or_else(|| AppError::NotFound("No exam in progress".to_string()))?;
    run.restart();
    Ok(Json(run.view()))
}

/// Drops the run; nothing is kept.
pub async fn abandon_quiz(
    State(runs): State<QuizRuns>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    runs.lock()
        .await
        .remove(&session.user_id)
        .ok_or_else(|| AppError::NotFound("No exam in progress".to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
