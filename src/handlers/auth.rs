// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, Profile, RegisterRequest, Role},
    repository::ProfileRepository,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Session, sign_jwt},
    },
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub profile: Profile,
}

/// Creates a student account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the profile (never the hash).
pub async fn register(
    State(profiles): State<ProfileRepository>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let profile = profiles
        .create(
            &payload.email,
            hashed_password,
            payload.full_name,
            Role::Student,
        )
        .await?;

    tracing::info!("Registered profile {}", profile.id);
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Checks the credentials and returns a signed JWT.
pub async fn login(
    State(profiles): State<ProfileRepository>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Same answer for unknown email and wrong password.
    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let (profile, password_hash) = profiles
        .credentials(&payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &password_hash)? {
        return Err(invalid());
    }

    let token = sign_jwt(
        profile.id,
        profile.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        profile,
    }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(session: Session) -> StatusCode {
    tracing::info!("Profile {} signed out", session.user_id);
    StatusCode::NO_CONTENT
}

/// Makes sure the configured admin account exists.
pub async fn ensure_admin(
    profiles: &ProfileRepository,
    email: &str,
    password: &str,
) -> Result<Profile, AppError> {
    if let Some((profile, _)) = profiles.credentials(email).await? {
        if profile.role != Role::Admin {
            tracing::warn!("Profile {} exists but is not an admin", email);
        }
        return Ok(profile);
    }

    tracing::info!("Seeding admin profile: {}", email);
    let hashed_password = hash_password(password)?;
    profiles
        .create(email, hashed_password, Some("Administrator".to_string()), Role::Admin)
        .await
}
