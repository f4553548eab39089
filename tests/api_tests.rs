// tests/api_tests.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_login_logout_works() {
    // Arrange
    let app = spawn_app().await;
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);

    // Act: register
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "email": email, "password": "password123", "fullName": "Layla" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["role"], "student");
    assert_eq!(profile["fullName"], "Layla");
    assert!(profile.get("passwordHash").is_none());

    // Act: login + logout
    let token = app.login(&email, "password123").await;
    let response = app
        .client
        .post(app.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let app = spawn_app().await;

    // Act: bad email and a too-short password
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "email": "not-an-email", "password": "123" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password"].is_array());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = spawn_app().await;
    let payload = json!({ "email": "dup@example.com", "password": "password123" });

    let first = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    let second = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(first.status().as_u16(), 201);
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": common::ADMIN_EMAIL, "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_are_gated() {
    // Arrange
    let app = spawn_app().await;
    let student = app.student_token().await;

    // Act
    let anonymous = app.client.get(app.url("/api/admin/exams")).send().await.unwrap();
    let as_student = app
        .client
        .get(app.url("/api/admin/exams"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(anonymous.status().as_u16(), 401);
    assert_eq!(as_student.status().as_u16(), 403);
}

#[tokio::test]
async fn exam_authoring_and_taking_flow() {
    // Arrange
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let student = app.student_token().await;

    // 1. Create the exam
    let exam = app.create_subject_exam(&admin, "Test", "Civil Law").await;
    let exam_id = exam["id"].as_i64().expect("Exam id missing");
    assert_eq!(exam["attempts"], 0);
    assert_eq!(exam["questions"], json!([]));
    assert_eq!(exam["status"], "active");
    assert_eq!(exam["type"], "subject");
    assert!(exam.get("year").is_none());

    // 2. Add a question; "2" is the second option, stored as index 1
    let response = app.add_question(&admin, exam_id, "2").await;
    assert_eq!(response.status().as_u16(), 201);
    let question: Value = response.json().await.unwrap();
    assert_eq!(question["correctAnswer"], 1);

    // 3. The public listing shows the exam without questions
    let listing: Vec<Value> = app
        .client
        .get(app.url("/api/exams?subject=Civil%20Law"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["questionCount"], 1);
    assert!(listing[0].get("questions").is_none());

    // 4. Take it
    let response = app
        .client
        .post(app.url(&format!("/api/quiz/start?exam_id={}", exam_id)))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["total"], 1);
    assert!(view["question"].get("correctAnswer").is_none());

    let feedback: Value = app
        .client
        .post(app.url("/api/quiz/answer"))
        .bearer_auth(&student)
        .json(&json!({ "answer": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["correct"], true);
    assert_eq!(feedback["score"], 1);
    assert_eq!(feedback["finished"], true);

    // 5. Finished runs accept no more answers
    let response = app
        .client
        .post(app.url("/api/quiz/answer"))
        .bearer_auth(&student)
        .json(&json!({ "answer": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // 6. Restart, then answer wrong
    let view: Value = app
        .client
        .post(app.url("/api/quiz/restart"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["score"], 0);
    assert_eq!(view["position"], 0);

    let feedback: Value = app
        .client
        .post(app.url("/api/quiz/answer"))
        .bearer_auth(&student)
        .json(&json!({ "answer": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["correct"], false);
    assert_eq!(feedback["score"], 0);

    // 7. Abandon
    let response = app
        .client
        .delete(app.url("/api/quiz"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = app
        .client
        .get(app.url("/api/quiz"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_requires_questions() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let student = app.student_token().await;
    let exam = app.create_subject_exam(&admin, "Empty", "Penal Law").await;

    let response = app
        .client
        .post(app.url(&format!("/api/quiz/start?exam_id={}", exam["id"])))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn invalid_question_is_rejected_with_field_errors() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let exam = app.create_subject_exam(&admin, "Test", "Civil Law").await;

    let response = app
        .client
        .post(app.url(&format!("/api/admin/exams/{}/questions", exam["id"])))
        .bearer_auth(&admin)
        .json(&json!({
            "questionText": "short",
            "options": ["A", "B", "C"],
            "correctAnswer": "4",
            "explanation": "short"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["explanation"].is_array());
    assert!(body["fields"]["__all__"].is_array());

    // Nothing was stored
    let stats: Value = app
        .client
        .get(app.url(&format!("/api/admin/exams/{}/stats", exam["id"])))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalQuestions"], 0);
}

#[tokio::test]
async fn historical_exam_caps_at_fifty_questions() {
    // Arrange
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let exam: Value = app
        .client
        .post(app.url("/api/admin/exams"))
        .bearer_auth(&admin)
        .json(&json!({ "title": "2019 finals", "type": "historical", "year": "2019" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().unwrap();

    // Act
    let mut last_id = 0;
    for _ in 0..50 {
        let response = app.add_question(&admin, exam_id, "1").await;
        assert_eq!(response.status().as_u16(), 201);
        let question: Value = response.json().await.unwrap();
        last_id = question["id"].as_i64().unwrap();
    }
    let over = app.add_question(&admin, exam_id, "1").await;

    // Assert
    assert_eq!(over.status().as_u16(), 409);

    // Editing is still allowed at the cap
    let edited = app
        .client
        .put(app.url(&format!("/api/admin/questions/{}", last_id)))
        .bearer_auth(&admin)
        .json(&json!({
            "questionText": "Which court hears appeals?",
            "options": ["A", "B", "C", "D"],
            "correctAnswer": 4,
            "explanation": "The court of appeal does."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(edited.status().as_u16(), 200);
    let edited: Value = edited.json().await.unwrap();
    assert_eq!(edited["correctAnswer"], 3);

    let years: Vec<Value> = app
        .client
        .get(app.url("/api/exams/years"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(years, vec![json!({ "year": "2019", "count": 1 })]);
}

#[tokio::test]
async fn exam_update_copy_and_delete_question() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let exam = app.create_subject_exam(&admin, "Contracts", "Civil Law").await;
    let exam_id = exam["id"].as_i64().unwrap();
    let question: Value = app
        .add_question(&admin, exam_id, "1")
        .await
        .json()
        .await
        .unwrap();

    // Switching to historical without a year is refused
    let response = app
        .client
        .put(app.url(&format!("/api/admin/exams/{}", exam_id)))
        .bearer_auth(&admin)
        .json(&json!({ "type": "historical" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Deactivate; it disappears from the public listing
    let updated: Value = app
        .client
        .put(app.url(&format!("/api/admin/exams/{}", exam_id)))
        .bearer_auth(&admin)
        .json(&json!({ "status": "inactive" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["status"], "inactive");
    let listing: Vec<Value> = app
        .client
        .get(app.url("/api/exams"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listing.is_empty());

    // Copy: new id, fresh status, no questions
    let response = app
        .client
        .post(app.url(&format!("/api/admin/exams/{}/copy", exam_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let copy: Value = response.json().await.unwrap();
    assert_ne!(copy["id"], exam["id"]);
    assert_eq!(copy["title"], "copy of Contracts");
    assert_eq!(copy["status"], "active");
    assert_eq!(copy["questions"], json!([]));

    // Delete the question, twice
    let url = app.url(&format!("/api/admin/questions/{}", question["id"]));
    let first = app.client.delete(&url).bearer_auth(&admin).send().await.unwrap();
    let second = app.client.delete(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(first.status().as_u16(), 204);
    assert_eq!(second.status().as_u16(), 404);
}

#[tokio::test]
async fn profile_can_be_updated() {
    let app = spawn_app().await;
    let token = app.student_token().await;

    let response = app
        .client
        .put(app.url("/api/profile/me"))
        .bearer_auth(&token)
        .json(&json!({
            "lastName": "Khoury",
            "settings": { "phone": "+961 3 000 000", "notificationEmail": "n@example.com" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me: Value = app
        .client
        .get(app.url("/api/profile/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["fullName"], "Student");
    assert_eq!(me["lastName"], "Khoury");
    assert_eq!(me["settings"]["notificationEmail"], "n@example.com");
}
