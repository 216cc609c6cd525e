//! Integration tests for the sitting moderation workflow
//!
//! Queueing via entity PUT/DELETE, backlog listing and caching, and the
//! approve/cancel state machine over the router.

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use serde_json::json;
use std::time::Duration;

async fn sitting_list(app: &axum::Router) -> serde_json::Value {
    let (status, body) = send(app, get("/api/sitting")).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn resolve(
    app: &axum::Router,
    action_id: &str,
    decision: &str,
) -> (StatusCode, serde_json::Value) {
    send(
        app,
        json_request(
            "POST",
            &format!("/api/sitting/{}/action", action_id),
            &json!({ "action": decision }),
        ),
    )
    .await
}

// =============================================================================
// Queueing
// =============================================================================

#[tokio::test]
async fn backlog_starts_empty() {
    let (app, _pool) = setup_app().await;
    assert_eq!(sitting_list(&app).await, json!([]));
}

#[tokio::test]
async fn faculty_update_queues_instead_of_applying() {
    let (app, _pool) = setup_app().await;
    let faculty_id = create_faculty(&app, "Engineering").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty_id),
            &json!({ "name": "School of Engineering" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Update request is pending approval.");

    // The store is untouched until approval.
    let (_, faculty) = send(&app, get(&format!("/api/faculties/{}", faculty_id))).await;
    assert_eq!(faculty["name"], "Engineering");

    let backlog = sitting_list(&app).await;
    let action = &backlog.as_array().unwrap()[0];
    assert_eq!(action["targetType"], "faculty");
    assert_eq!(action["targetRef"], json!(faculty_id));
    assert_eq!(action["mutationKind"], "update");
    assert_eq!(action["displayName"], "Engineering");
    assert_eq!(action["status"], "pending");
    assert_eq!(action["payload"]["name"], "School of Engineering");
}

#[tokio::test]
async fn delete_requests_queue_for_each_entity() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;
    let semester = create_semester(&app, &faculty, "First Semester").await;
    let student = create_student(&app, "1001", "Jane Doe", &faculty, &semester).await;

    for uri in [
        format!("/api/faculties/{}", faculty),
        format!("/api/semesters/{}", semester),
        format!("/api/students/{}", student),
    ] {
        let request = axum::http::Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Delete request is pending approval.");
    }

    let backlog = sitting_list(&app).await;
    assert_eq!(backlog.as_array().unwrap().len(), 3);
    assert!(backlog
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["mutationKind"] == "delete" && a["status"] == "pending"));
}

#[tokio::test]
async fn queueing_against_missing_target_is_not_found() {
    let (app, _pool) = setup_app().await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", missing),
            &json!({ "name": "Renamed" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Not found");
}

#[tokio::test]
async fn backlog_is_newest_first_and_permits_stacked_actions() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;

    // Two simultaneous proposals against the same target are permitted.
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty),
            &json!({ "name": "First Rename" }),
        ),
    )
    .await;
    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/api/faculties/{}", faculty))
        .body(axum::body::Body::empty())
        .unwrap();
    send(&app, request).await;

    let backlog = sitting_list(&app).await;
    let actions = backlog.as_array().unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["mutationKind"], "delete");
    assert_eq!(actions[1]["mutationKind"], "update");
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn approving_update_applies_it() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty),
            &json!({ "name": "School of Engineering" }),
        ),
    )
    .await;

    let backlog = sitting_list(&app).await;
    let action_id = backlog[0]["id"].as_str().unwrap().to_string();

    let (status, body) = resolve(&app, &action_id, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (_, renamed) = send(&app, get(&format!("/api/faculties/{}", faculty))).await;
    assert_eq!(renamed["name"], "School of Engineering");
}

#[tokio::test]
async fn cancelling_leaves_target_untouched() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;
    let semester = create_semester(&app, &faculty, "First Semester").await;

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/semesters/{}", semester),
            &json!({ "name": "Renamed" }),
        ),
    )
    .await;

    let backlog = sitting_list(&app).await;
    let action_id = backlog[0]["id"].as_str().unwrap().to_string();

    let (status, body) = resolve(&app, &action_id, "cancelled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (_, unchanged) = send(&app, get(&format!("/api/semesters/{}", semester))).await;
    assert_eq!(unchanged["name"], "First Semester");
}

#[tokio::test]
async fn resolved_actions_reject_further_decisions() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty),
            &json!({ "name": "Renamed" }),
        ),
    )
    .await;
    let action_id = sitting_list(&app).await[0]["id"].as_str().unwrap().to_string();

    resolve(&app, &action_id, "approved").await;

    for decision in ["approved", "cancelled"] {
        let (status, body) = resolve(&app, &action_id, decision).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Not found or already processed");
    }
}

#[tokio::test]
async fn unknown_decision_is_rejected() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty),
            &json!({ "name": "Renamed" }),
        ),
    )
    .await;
    let action_id = sitting_list(&app).await[0]["id"].as_str().unwrap().to_string();

    let (status, body) = resolve(&app, &action_id, "maybe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "Action must be 'approved' or 'cancelled'"
    );

    // Still pending afterwards.
    assert_eq!(sitting_list(&app).await[0]["status"], "pending");
}

#[tokio::test]
async fn approving_delete_twice_is_idempotent() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;
    let semester = create_semester(&app, &faculty, "First Semester").await;
    let student = create_student(&app, "1001", "Jane Doe", &faculty, &semester).await;

    // Queue two delete requests for the same student.
    for _ in 0..2 {
        let request = axum::http::Request::builder()
            .method("DELETE")
            .uri(format!("/api/students/{}", student))
            .body(axum::body::Body::empty())
            .unwrap();
        send(&app, request).await;
    }

    let backlog = sitting_list(&app).await;
    let ids: Vec<String> = backlog
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect();

    let (status, body) = resolve(&app, &ids[0], "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    // The target is already gone; approving the second delete still
    // succeeds as a no-op.
    let (status, body) = resolve(&app, &ids[1], "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = send(&app, get(&format!("/api/students/{}", student))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approving_update_of_deleted_target_fails_without_approving() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;
    let semester = create_semester(&app, &faculty, "First Semester").await;
    let student = create_student(&app, "1001", "Jane Doe", &faculty, &semester).await;

    // Queue an update, then a delete; approve the delete first.
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/students/{}", student),
            &json!({ "name": "Janet Doe" }),
        ),
    )
    .await;
    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/api/students/{}", student))
        .body(axum::body::Body::empty())
        .unwrap();
    send(&app, request).await;

    let backlog = sitting_list(&app).await;
    let actions = backlog.as_array().unwrap();
    let delete_id = actions
        .iter()
        .find(|a| a["mutationKind"] == "delete")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let update_id = actions
        .iter()
        .find(|a| a["mutationKind"] == "update")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    resolve(&app, &delete_id, "approved").await;

    let (status, body) = resolve(&app, &update_id, "approved").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Student no longer exists");

    // The update action never became approved.
    let backlog = sitting_list(&app).await;
    let update_action = backlog
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"] == json!(update_id))
        .unwrap()
        .clone();
    assert_eq!(update_action["status"], "pending");
}

#[tokio::test]
async fn approved_student_update_recomputes_name_key() {
    let (app, _pool) = setup_app().await;
    let faculty = create_faculty(&app, "Engineering").await;
    let semester = create_semester(&app, &faculty, "First Semester").await;
    let student = create_student(&app, "1001", "Jane Doe", &faculty, &semester).await;

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/students/{}", student),
            &json!({
                "name": "  Janet   DOE ",
                "subjects": [
                    { "name": "Math", "total": 80.0 },
                    { "name": "MATH", "total": 10.0 },
                    { "name": "Physics" },
                ],
            }),
        ),
    )
    .await;

    let action_id = sitting_list(&app).await[0]["id"].as_str().unwrap().to_string();
    let (status, _) = resolve(&app, &action_id, "approved").await;
    assert_eq!(status, StatusCode::OK);

    let (_, updated) = send(&app, get(&format!("/api/students/{}", student))).await;
    assert_eq!(updated["name"], "  Janet   DOE ");
    assert_eq!(updated["normalizedName"], "janet doe");
    // Untouched fields survive; subjects were replaced and deduplicated.
    assert_eq!(updated["studentId"], "1001");
    let subjects = updated["subjects"].as_array().unwrap();
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0]["name"], "Math");
    assert_eq!(subjects[0]["total"], 80.0);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn backlog_reads_are_cached_until_resolution() {
    let (app, pool) = setup_app_with_ttl(Duration::from_secs(60)).await;
    let faculty = create_faculty(&app, "Engineering").await;

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty),
            &json!({ "name": "First Rename" }),
        ),
    )
    .await;

    // Prime the cache with a one-action backlog.
    let first = sitting_list(&app).await;
    assert_eq!(first.as_array().unwrap().len(), 1);

    // Queueing does not invalidate: the stale single-action list is
    // served even though a second action exists in the store.
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/faculties/{}", faculty),
            &json!({ "name": "Second Rename" }),
        ),
    )
    .await;
    let stale = sitting_list(&app).await;
    assert_eq!(stale.as_array().unwrap().len(), 1);

    let stored = examreg_api::db::sitting::list(&pool).await.unwrap();
    assert_eq!(stored.len(), 2);

    // Resolution invalidates; the next read sees both actions.
    let action_id = stored[0].guid.to_string();
    let (status, _) = resolve(&app, &action_id, "cancelled").await;
    assert_eq!(status, StatusCode::OK);

    let fresh = sitting_list(&app).await;
    assert_eq!(fresh.as_array().unwrap().len(), 2);
}
