mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{assert_error, data, read_json, spawn_app};
use parley_api::models::NotificationKind;

#[tokio::test]
async fn notifications_list_newest_first_with_derived_links() {
    let app = spawn_app();
    let (user, token) = app.signed_in("ada");
    let task_id = Uuid::new_v4();
    let chat_id = Uuid::new_v4();
    app.platform.seed_notification(user.id, NotificationKind::TaskAssigned, task_id);
    app.platform.seed_notification(user.id, NotificationKind::ChatMention, chat_id);

    let body = read_json(app.get("/notifications", &token).await).await;
    let listed = data(&body).as_array().unwrap();
    assert_eq!(listed.len(), 2);
    // newest first: the chat mention was seeded last
    assert_eq!(listed[0]["type"], "chat-mention");
    assert_eq!(listed[0]["link"], format!("/chats/{chat_id}"));
    assert_eq!(listed[1]["type"], "task-assigned");
    assert_eq!(listed[1]["link"], format!("/tasks/{task_id}"));
}

#[tokio::test]
async fn unread_filter_and_count_track_the_read_state() {
    let app = spawn_app();
    let (user, token) = app.signed_in("ada");
    let first = app.platform.seed_notification(user.id, NotificationKind::System, Uuid::new_v4());
    app.platform.seed_notification(user.id, NotificationKind::System, Uuid::new_v4());

    let body = read_json(app.get("/notifications/unread/count", &token).await).await;
    assert_eq!(data(&body)["count"], 2);

    let response =
        app.put(&format!("/notifications/{}/read", first.id), &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["is_read"], true);
    assert!(!data(&body)["read_at"].is_null());

    let body = read_json(app.get("/notifications/unread/count", &token).await).await;
    assert_eq!(data(&body)["count"], 1);

    let body = read_json(app.get("/notifications?unread_only=true", &token).await).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 1);
    let body = read_json(app.get("/notifications", &token).await).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn reads_are_monotonic() {
    let app = spawn_app();
    let (user, token) = app.signed_in("ada");
    let n = app.platform.seed_notification(user.id, NotificationKind::System, Uuid::new_v4());

    let response = app.put(&format!("/notifications/{}/read", n.id), &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.put(&format!("/notifications/{}/read", n.id), &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_error(&read_json(response).await, "ALREADY_READ");
}

#[tokio::test]
async fn mark_all_read_reports_how_many_changed() {
    let app = spawn_app();
    let (user, token) = app.signed_in("ada");
    for _ in 0..3 {
        app.platform.seed_notification(user.id, NotificationKind::System, Uuid::new_v4());
    }

    let response = app.put("/notifications/mark-all-read", &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["marked_count"], 3);

    // nothing left to mark
    let response = app.put("/notifications/mark-all-read", &token, json!({})).await;
    let body = read_json(response).await;
    assert_eq!(data(&body)["marked_count"], 0);
}

#[tokio::test]
async fn notifications_are_private_to_their_user() {
    let app = spawn_app();
    let (ada, ada_token) = app.signed_in("ada");
    let (_, eve_token) = app.signed_in("eve");
    let n = app.platform.seed_notification(ada.id, NotificationKind::System, Uuid::new_v4());

    let body = read_json(app.get("/notifications", &eve_token).await).await;
    assert!(data(&body).as_array().unwrap().is_empty());

    let response =
        app.put(&format!("/notifications/{}/read", n.id), &eve_token, json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error(&read_json(response).await, "ACCESS_DENIED");

    let response = app.delete(&format!("/notifications/{}", n.id), &eve_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // the owner can still delete it
    let response = app.delete(&format!("/notifications/{}", n.id), &ada_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.delete(&format!("/notifications/{}", n.id), &ada_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_error(&read_json(response).await, "NOTIFICATION_NOT_FOUND");
}

#[tokio::test]
async fn paging_clamps_the_limit_and_honors_page_numbers() {
    let app = spawn_app();
    let (user, token) = app.signed_in("ada");
    for _ in 0..5 {
        app.platform.seed_notification(user.id, NotificationKind::System, Uuid::new_v4());
    }

    let body = read_json(app.get("/notifications?limit=2", &token).await).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 2);

    // an oversized limit is clamped, not rejected
    let response = app.get("/notifications?limit=500", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 5);

    let body = read_json(app.get("/notifications?limit=2&page=3", &token).await).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 1);

    // nonsense paging inputs fall back to defaults instead of failing
    let body = read_json(app.get("/notifications?limit=banana&offset=-3", &token).await).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 5);
}
