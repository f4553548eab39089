// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, discussions, exams, profile, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Public routes: auth, exam listing, discussion listing.
/// * Signed-in routes take a `Session` extractor, which answers 401 on its own.
/// * Admin routes sit behind auth + admin middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams))
        .route("/years", get(exams::list_years));

    let profile_routes = Router::new().route("/me", get(profile::get_me).put(profile::update_me));

    let quiz_routes = Router::new()
        .route("/", get(quiz::current_quiz).delete(quiz::abandon_quiz))
        .route("/start", post(quiz::start_quiz))
        .route("/answer", post(quiz::submit_answer))
        .route("/restart", post(quiz::restart_quiz));

    let discussion_routes = Router::new()
        .route(
            "/",
            get(discussions::list_discussions).post(discussions::create_discussion),
        )
        .route("/{id}/comments", post(discussions::add_comment))
        .route("/{id}/like", post(discussions::like_discussion));

    let comment_routes = Router::new().route("/{id}/like", post(discussions::like_comment));

    let admin_routes = Router::new()
        .route("/exams", get(admin::list_exams).post(admin::create_exam))
        .route("/exams/changes", get(admin::exam_changes))
        .route("/exams/{id}", put(admin::update_exam))
        .route("/exams/{id}/copy", post(admin::copy_exam))
        .route("/exams/{id}/stats", get(admin::exam_stats))
        .route("/exams/{id}/questions", post(admin::add_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/workspace",
            get(admin::workspace_view).post(admin::workspace_action),
        )
        // Auth first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/discussions", discussion_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/admin", admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
