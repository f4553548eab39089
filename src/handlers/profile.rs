use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError, models::user::UpdateProfileRequest, repository::ProfileRepository,
    utils::jwt::Session,
};

/// Current user's profile.
pub async fn get_me(
    State(profiles): State<ProfileRepository>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(profiles.get(session.user_id).await?))
}

/// Updates name and contact settings of the current user.
pub async fn update_me(
    State(profiles): State<ProfileRepository>,
    session: Session,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(profiles.update(session.user_id, payload).await?))
}
