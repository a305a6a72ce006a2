mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use interview_core::{GradingEvent, InterviewStatus};
use serde_json::json;
use std::time::Duration;

async fn answer(app: &TestApp, cookie: &str, id: &str, content: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = app
        .post(
            &format!("/api/interview/{}/message", id),
            Some(cookie),
            json!({ "content": content }),
        )
        .await;
    (status, body)
}

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<GradingEvent>) -> GradingEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("grading finished in time")
        .expect("event channel open")
}

#[tokio::test]
async fn two_question_interview_runs_to_completion() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;

    let (status, _, created) = app
        .post(
            "/api/interview/create",
            Some(&cookie),
            json!({
                "jobTitle": "Backend Engineer",
                "company": "Acme",
                "location": "Remote",
                "description": "Rust services",
                "maxQuestions": 2,
                "mode": "text",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        created["firstQuestion"]["text"],
        "Question 1 of 2 for Backend Engineer"
    );
    assert!(created["firstQuestion"].get("audioBase64").is_none());
    let id = created["interviewId"].as_str().unwrap();

    let (status, body) = answer(&app, &cookie, id, "A1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nextQuestion"]["text"], "Question 2 of 2 for Backend Engineer");

    let (_, _, detail) = app.get(&format!("/api/interview/{}", id), Some(&cookie)).await;
    assert_eq!(detail["interview"]["status"], "in_progress");

    let (status, body) = answer(&app, &cookie, id, "A2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "completed": true }));

    let (_, _, detail) = app.get(&format!("/api/interview/{}", id), Some(&cookie)).await;
    assert_eq!(detail["interview"]["status"], "completed");
    assert!(detail["interview"]["completedAt"].is_string());

    let roles: Vec<&str> = detail["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["assistant", "user", "assistant", "user"]);

    // Finished interviews take no further answers.
    let (status, _) = answer(&app, &cookie, id, "A3").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn speech_interviews_carry_audio() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;

    let (status, _, created) = app
        .post(
            "/api/interview/create",
            Some(&cookie),
            json!({
                "jobTitle": "SRE",
                "company": "Initech",
                "location": "Berlin",
                "maxQuestions": 3,
                "mode": "speech",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["firstQuestion"]["audioBase64"], "UklGRg==");
}

#[tokio::test]
async fn invalid_settings_are_rejected_before_anything_is_stored() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let base = json!({
        "jobTitle": "SRE",
        "company": "Initech",
        "location": "Berlin",
        "maxQuestions": 3,
        "mode": "text",
    });

    let cases = [
        ("maxQuestions", json!(6), "maxQuestions must be between 2 and 5"),
        ("maxQuestions", json!(1), "maxQuestions must be between 2 and 5"),
        ("mode", json!("video"), "mode must be either 'speech' or 'text'"),
        ("company", json!(""), "Missing required fields"),
    ];
    for (field, value, expected) in cases {
        let mut body = base.clone();
        body[field] = value;
        let (status, _, err) = app.post("/api/interview/create", Some(&cookie), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} = {}", field, expected);
        assert_eq!(err["error"], expected);
    }

    let (_, _, list) = app.get("/api/interview", Some(&cookie)).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn malformed_ids_and_empty_answers_are_bad_requests() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let id = app.create_interview(&cookie, 2).await;

    let (status, body) = answer(&app, &cookie, "12345", "hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid interview ID");

    let (status, body) = answer(&app, &cookie, &id, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content is required");
}

#[tokio::test]
async fn other_users_get_not_found_everywhere() {
    let app = TestApp::new();
    let owner = app.login("owner@example.com").await;
    let intruder = app.login("intruder@example.com").await;
    let id = app.create_interview(&owner, 3).await;

    let attempts = [
        (Method::GET, format!("/api/interview/{}", id), None),
        (
            Method::POST,
            format!("/api/interview/{}/message", id),
            Some(json!({ "content": "sneaky" })),
        ),
        (Method::POST, format!("/api/interview/{}/complete", id), None),
        (Method::DELETE, format!("/api/interview/{}/delete", id), None),
    ];
    for (method, uri, body) in attempts {
        let (status, _, err) = app.request(method, &uri, Some(&intruder), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(err["error"], "Interview not found");
    }

    // Same answer as for an id that never existed.
    let (status, _, err) = app
        .get(
            "/api/interview/00000000-0000-0000-0000-000000000000",
            Some(&intruder),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "Interview not found");

    let (_, _, detail) = app.get(&format!("/api/interview/{}", id), Some(&owner)).await;
    assert_eq!(detail["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn completing_early_grades_in_the_background() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let id = app.create_interview(&cookie, 3).await;
    answer(&app, &cookie, &id, "A1").await;

    let mut events = app.grading_events();
    let (status, _, body) = app
        .request(
            Method::POST,
            &format!("/api/interview/{}/complete", id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "success": true }));

    match next_event(&mut events).await {
        GradingEvent::Graded { status, grade, .. } => {
            assert_eq!(status, InterviewStatus::EndedEarly);
            assert_eq!(grade, 81);
        }
        other => panic!("unexpected grading outcome: {:?}", other),
    }

    let (_, _, detail) = app.get(&format!("/api/interview/{}", id), Some(&cookie)).await;
    assert_eq!(detail["interview"]["status"], "ended_early");
    assert_eq!(detail["interview"]["grade"], 81);
    assert_eq!(detail["interview"]["feedback"], "Reviewed 3 turns.");
}

#[tokio::test]
async fn stats_cover_graded_full_interviews_only() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let mut events = app.grading_events();

    let full = app.create_interview(&cookie, 2).await;
    answer(&app, &cookie, &full, "A1").await;
    answer(&app, &cookie, &full, "A2").await;
    let early = app.create_interview(&cookie, 4).await;

    for id in [&full, &early] {
        app.request(
            Method::POST,
            &format!("/api/interview/{}/complete", id),
            Some(&cookie),
            None,
        )
        .await;
        next_event(&mut events).await;
    }

    let (_, _, stats) = app.get("/api/profile/stats", Some(&cookie)).await;
    assert_eq!(stats["totalInterviews"], 1);
    assert_eq!(stats["averageGrade"], 81.0);
    assert_eq!(stats["highestGrade"], 81);
    assert_eq!(stats["lowestGrade"], 81);
}

#[tokio::test]
async fn history_lists_newest_first_and_respects_limit() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(app.create_interview(&cookie, 2).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, _, list) = app.get("/api/interview", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, [ids[2].as_str(), ids[1].as_str(), ids[0].as_str()]);

    let (_, _, limited) = app.get("/api/interview?limit=2", Some(&cookie)).await;
    assert_eq!(limited.as_array().unwrap().len(), 2);

    let other = app.login("other@example.com").await;
    let (_, _, empty) = app.get("/api/interview", Some(&other)).await;
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn delete_removes_the_interview() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let id = app.create_interview(&cookie, 2).await;

    let (status, _, body) = app
        .request(
            Method::DELETE,
            &format!("/api/interview/{}/delete", id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, _, _) = app.get(&format!("/api/interview/{}", id), Some(&cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wrongly_typed_input_is_a_json_bad_request() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let id = app.create_interview(&cookie, 2).await;

    let (status, _, body) = app
        .post(
            &format!("/api/interview/{}/message", id),
            Some(&cookie),
            json!({ "content": 123 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, body) = app
        .send_raw(
            Method::PATCH,
            "/api/profile",
            Some(&cookie),
            Some("text/plain"),
            "name=Ada".to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, body) = app.get("/api/interview?limit=abc", Some(&cookie)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // The rejected answer was not recorded.
    let (_, _, detail) = app.get(&format!("/api/interview/{}", id), Some(&cookie)).await;
    assert_eq!(detail["messages"].as_array().unwrap().len(), 1);
}
