// tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use qanun::{
    config::Config,
    handlers::auth::ensure_admin,
    provider::MemoryProvider,
    repository::ProfileRepository,
    routes,
    state::AppState,
};
use serde_json::{Value, json};

pub const ADMIN_EMAIL: &str = "admin@qanun.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origins: vec!["http://localhost:5173".to_string()],
        log_dir: "logs".to_string(),
    }
}

/// Builds the app state over a fresh in-memory provider with the admin seeded.
pub async fn test_state() -> AppState {
    let provider = Arc::new(MemoryProvider::new());
    ensure_admin(
        &ProfileRepository::new(provider.clone()),
        ADMIN_EMAIL,
        ADMIN_PASSWORD,
    )
    .await
    .expect("Failed to seed admin");
    AppState::new(provider, test_config())
}

/// Spawns the app on a random port. Every call gets its own empty store.
pub async fn spawn_app() -> TestApp {
    let app = routes::create_router(test_state().await);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a fresh student and returns its token.
    pub async fn student_token(&self) -> String {
        let email = format!("s_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": "password123", "fullName": "Student" }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(response.status().as_u16(), 201);
        self.login(&email, "password123").await
    }

    /// Creates a subject exam through the admin API and returns its JSON.
    pub async fn create_subject_exam(&self, token: &str, title: &str, subject: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/admin/exams"))
            .bearer_auth(token)
            .json(&json!({ "title": title, "type": "subject", "subject": subject }))
            .send()
            .await
            .expect("Create exam failed");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn add_question(&self, token: &str, exam_id: i64, correct: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/admin/exams/{}/questions", exam_id)))
            .bearer_auth(token)
            .json(&json!({
                "questionText": "Which court hears appeals?",
                "options": ["A", "B", "C"],
                "correctAnswer": correct,
                "explanation": "The court of appeal does."
            }))
            .send()
            .await
            .expect("Add question failed")
    }
}
