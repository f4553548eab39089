// src/handlers/discussions.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::discussion::{CreateCommentRequest, CreateDiscussionRequest, LikeResponse},
    repository::DiscussionRepository,
    utils::jwt::Session,
};

/// All discussions, newest first, with their comments.
pub async fn list_discussions(
    State(repo): State<DiscussionRepository>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list().await?))
}

pub async fn create_discussion(
    State(repo): State<DiscussionRepository>,
    session: Session,
    Json(payload): Json<CreateDiscussionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let discussion = repo
        .create_discussion(&payload.title, &payload.content, session.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(discussion)))
}

pub async fn add_comment(
    State(repo): State<DiscussionRepository>,
    session: Session,
    Path(discussion_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = repo
        .add_comment(discussion_id, &payload.content, session.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn like_discussion(
    State(repo): State<DiscussionRepository>,
    _session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let likes = repo.like(id).await?;
    Ok(Json(LikeResponse { id, likes }))
}

pub async fn like_comment(
    State(repo): State<DiscussionRepository>,
    _session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let likes = repo.like_comment(id).await?;
    Ok(Json(LikeResponse { id, likes }))
}
