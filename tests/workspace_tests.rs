// tests/workspace_tests.rs

mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{spawn_app, test_state};
use qanun::routes;
use serde_json::{Value, json};
use tower::ServiceExt;

#[tokio::test]
async fn session_is_required_without_middleware() {
    // Arrange
    let app = routes::create_router(test_state().await);

    // Act
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/profile/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = routes::create_router(test_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/quiz")
                .header("Authorization", "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn workspace_walks_through_authoring() {
    // Arrange
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let act = |body: Value| {
        app.client
            .post(app.url("/api/admin/workspace"))
            .bearer_auth(&admin)
            .json(&body)
            .send()
    };

    // Fresh workspace is idle
    let view: Value = app
        .client
        .get(app.url("/api/admin/workspace"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "idle");

    // Invalid in idle
    let response = act(json!({ "action": "show_stats" })).await.unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Idle -> AddingExam -> Idle
    act(json!({ "action": "add_exam" })).await.unwrap();
    let view: Value = act(json!({
        "action": "submit_exam",
        "form": { "title": "Test", "type": "subject", "subject": "Civil Law" }
    }))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(view["state"], "idle");
    assert_eq!(view["outcome"]["kind"], "exam_created");
    let exam_id = view["outcome"]["exam"]["id"].as_i64().unwrap();

    // Idle -> SelectingExam -> AddingQuestion -> SelectingExam
    let view: Value = act(json!({ "action": "select_exam", "examId": exam_id }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "selecting_exam");
    assert_eq!(view["examId"], exam_id);

    act(json!({ "action": "add_question" })).await.unwrap();

    // A bad form keeps the state
    let response = act(json!({
        "action": "submit_question",
        "form": {
            "questionText": "Too short",
            "options": ["A", "B"],
            "correctAnswer": "1",
            "explanation": "short"
        }
    }))
    .await
    .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let view: Value = act(json!({
        "action": "submit_question",
        "form": {
            "questionText": "What is the age of majority?",
            "options": ["16", "18", "21"],
            "correctAnswer": "2",
            "explanation": "Eighteen under the civil code."
        }
    }))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(view["state"], "selecting_exam");
    assert_eq!(view["outcome"]["question"]["correctAnswer"], 1);
    assert_eq!(view["exam"]["questions"].as_array().unwrap().len(), 1);

    // Stats
    let view: Value = act(json!({ "action": "show_stats" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "viewing_stats");
    assert_eq!(view["stats"]["totalQuestions"], 1);
    assert_eq!(view["stats"]["remainingCapacity"], 99);
}

#[tokio::test]
async fn workspace_is_kept_between_concurrent_requests() {
    // Arrange
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let exam = app.create_subject_exam(&admin, "Concurrent", "Civil Law").await;
    let exam_id = exam["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url("/api/admin/workspace"))
        .bearer_auth(&admin)
        .json(&json!({ "action": "select_exam", "examId": exam_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Act: views and a rejected action in flight together
    let view = || {
        app.client
            .get(app.url("/api/admin/workspace"))
            .bearer_auth(&admin)
            .send()
    };
    let rejected = app
        .client
        .post(app.url("/api/admin/workspace"))
        .bearer_auth(&admin)
        .json(&json!({ "action": "submit_exam", "form": { "title": "X", "type": "subject", "subject": "Y" } }))
        .send();
    let (a, b, c, rejected) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(view(), view(), view(), rejected) },
    )
    .await
    .expect("workspace requests stalled");

    // Assert
    assert_eq!(rejected.unwrap().status().as_u16(), 409);
    for response in [a, b, c] {
        let body: Value = response.unwrap().json().await.unwrap();
        assert_eq!(body["state"], "selecting_exam");
    }
    let body: Value = view().await.unwrap().json().await.unwrap();
    assert_eq!(body["state"], "selecting_exam");
    assert_eq!(body["examId"], exam_id);
}

#[tokio::test]
async fn change_feed_pushes_exam_list() {
    // Arrange
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let mut feed = app
        .client
        .get(app.url("/api/admin/exams/changes"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(feed.status().as_u16(), 200);

    // Reads until `needle` shows up in the stream
    async fn read_until(feed: &mut reqwest::Response, needle: &str) -> String {
        let mut seen = String::new();
        while !seen.contains(needle) {
            let chunk = feed.chunk().await.unwrap().expect("stream ended");
            seen.push_str(&String::from_utf8_lossy(&chunk));
        }
        seen
    }

    // Act + Assert: initial snapshot, then a refetch after the write
    let first = tokio::time::timeout(Duration::from_secs(5), read_until(&mut feed, "[]"))
        .await
        .expect("no initial snapshot");
    assert!(first.contains("exams"));

    app.create_subject_exam(&admin, "Live exam", "Civil Law").await;

    let pushed = tokio::time::timeout(Duration::from_secs(5), read_until(&mut feed, "Live exam"))
        .await
        .expect("no update pushed");
    assert!(pushed.contains("Civil Law"));
}
