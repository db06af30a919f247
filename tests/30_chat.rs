mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{assert_error, create_chat, create_workspace, data, read_json, spawn_app};

#[tokio::test]
async fn discussions_need_no_title_but_task_chats_do() {
    let app = spawn_app();
    let (_, token) = app.signed_in("owner");
    let workspace_id = create_workspace(&app, &token, "WS").await;
    let chats_path = format!("/workspaces/{workspace_id}/chats");

    let response =
        app.post(&chats_path, &token, json!({ "type": "discussion", "is_public": true })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(data(&body)["type"], "discussion");
    assert!(data(&body)["status"].is_null());

    let response = app.post(&chats_path, &token, json!({ "type": "task" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "INVALID_NAME");

    let response = app.post(&chats_path, &token, json!({ "type": "channel", "name": "x" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "INVALID_TYPE");
}

#[tokio::test]
async fn task_family_chats_materialize_a_board_task() {
    let app = spawn_app();
    let (_, token) = app.signed_in("owner");
    let workspace_id = create_workspace(&app, &token, "WS").await;
    let chat_id = create_chat(&app, &token, workspace_id, "bug", "Crash on save").await;

    let body = read_json(app.get(&format!("/chats/{chat_id}"), &token).await).await;
    assert_eq!(data(&body)["status"], "todo");
    assert_eq!(data(&body)["title"], "Crash on save");

    let task = app.platform.task_for_chat(chat_id).expect("board task exists");
    assert_eq!(task.title, "Crash on save");
    assert_eq!(task.version, 1);
}

#[tokio::test]
async fn chat_lists_filter_by_type() {
    let app = spawn_app();
    let (_, token) = app.signed_in("owner");
    let workspace_id = create_workspace(&app, &token, "WS").await;
    create_chat(&app, &token, workspace_id, "discussion", "general").await;
    create_chat(&app, &token, workspace_id, "task", "Ship it").await;
    create_chat(&app, &token, workspace_id, "bug", "Fix it").await;

    let body =
        read_json(app.get(&format!("/workspaces/{workspace_id}/chats"), &token).await).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 3);

    let body = read_json(
        app.get(&format!("/workspaces/{workspace_id}/chats?type=bug"), &token).await,
    )
    .await;
    let bugs = data(&body).as_array().unwrap();
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0]["title"], "Fix it");
}

#[tokio::test]
async fn visibility_follows_participation_and_publicness() {
    let app = spawn_app();
    let (_, owner) = app.signed_in("owner");
    let (member, member_token) = app.signed_in("member");
    let (_, outsider_token) = app.signed_in("outsider");
    let workspace_id = create_workspace(&app, &owner, "WS").await;
    app.post(
        &format!("/workspaces/{workspace_id}/members"),
        &owner,
        json!({ "user_id": member.id, "role": "member" }),
    )
    .await;

    // private chat: only participants
    let response = app
        .post(
            &format!("/workspaces/{workspace_id}/chats"),
            &owner,
            json!({ "type": "discussion", "name": "secret", "is_public": false }),
        )
        .await;
    let body = read_json(response).await;
    let private_id = data(&body)["id"].as_str().unwrap().to_string();

    let response = app.get(&format!("/chats/{private_id}"), &member_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error(&read_json(response).await, "ACCESS_DENIED");

    // public chat: any workspace member, but not outsiders
    let public_id = create_chat(&app, &owner, workspace_id, "discussion", "open").await;
    let response = app.get(&format!("/chats/{public_id}"), &member_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.get(&format!("/chats/{public_id}"), &outsider_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn renaming_is_for_task_family_chats_only() {
    let app = spawn_app();
    let (_, token) = app.signed_in("owner");
    let workspace_id = create_workspace(&app, &token, "WS").await;

    let task_chat = create_chat(&app, &token, workspace_id, "task", "Old title").await;
    let response =
        app.put(&format!("/chats/{task_chat}"), &token, json!({ "name": "New title" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["title"], "New title");
    // the rename flows through to the board task and is audited
    let task = app.platform.task_for_chat(task_chat).unwrap();
    assert_eq!(task.title, "New title");
    assert_eq!(task.version, 2);

    let discussion = create_chat(&app, &token, workspace_id, "discussion", "general").await;
    let response =
        app.put(&format!("/chats/{discussion}"), &token, json!({ "name": "renamed" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn discussion_conversion_is_one_way() {
    let app = spawn_app();
    let (_, token) = app.signed_in("owner");
    let workspace_id = create_workspace(&app, &token, "WS").await;
    let chat_id = create_chat(&app, &token, workspace_id, "discussion", "idea").await;

    let response = app
        .put(&format!("/chats/{chat_id}"), &token, json!({ "name": "Build it", "type": "task" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["type"], "task");
    assert_eq!(data(&body)["status"], "todo");
    assert_eq!(data(&body)["title"], "Build it");
    assert!(app.platform.task_for_chat(chat_id).is_some());

    // converting an already converted chat conflicts
    let response = app
        .put(&format!("/chats/{chat_id}"), &token, json!({ "name": "Again", "type": "bug" }))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_error(&read_json(response).await, "CONVERSION_CONFLICT");

    // discussion is not a valid conversion target
    let other = create_chat(&app, &token, workspace_id, "discussion", "x").await;
    let response = app
        .put(&format!("/chats/{other}"), &token, json!({ "name": "y", "type": "discussion" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "INVALID_TYPE");
}

#[tokio::test]
async fn chat_mutations_require_the_chat_admin_role() {
    let app = spawn_app();
    let (_, owner) = app.signed_in("owner");
    let (member, member_token) = app.signed_in("member");
    let workspace_id = create_workspace(&app, &owner, "WS").await;
    app.post(
        &format!("/workspaces/{workspace_id}/members"),
        &owner,
        json!({ "user_id": member.id, "role": "member" }),
    )
    .await;
    let chat_id = create_chat(&app, &owner, workspace_id, "task", "Guarded").await;
    app.post(
        &format!("/chats/{chat_id}/participants"),
        &owner,
        json!({ "user_id": member.id }),
    )
    .await;

    let response =
        app.put(&format!("/chats/{chat_id}"), &member_token, json!({ "name": "nope" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error(&read_json(response).await, "INSUFFICIENT_PRIVILEGE");

    let response = app.delete(&format!("/chats/{chat_id}"), &member_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn participant_roster_rules() {
    let app = spawn_app();
    let (owner, owner_token) = app.signed_in("owner");
    let (member, member_token) = app.signed_in("member");
    let workspace_id = create_workspace(&app, &owner_token, "WS").await;
    let chat_id = create_chat(&app, &owner_token, workspace_id, "discussion", "room").await;
    let participants_path = format!("/chats/{chat_id}/participants");

    let response =
        app.post(&participants_path, &owner_token, json!({ "user_id": member.id })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(data(&body)["participants"].as_array().unwrap().len(), 2);

    // duplicates conflict
    let response =
        app.post(&participants_path, &owner_token, json!({ "user_id": member.id })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // the member may leave on their own
    let response =
        app.delete(&format!("{participants_path}/{}", member.id), &member_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // the creator can never be removed
    let response =
        app.delete(&format!("{participants_path}/{}", owner.id), &owner_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn deleting_a_chat_cascades_to_messages_and_tasks() {
    let app = spawn_app();
    let (_, token) = app.signed_in("owner");
    let workspace_id = create_workspace(&app, &token, "WS").await;
    let chat_id = create_chat(&app, &token, workspace_id, "task", "Short-lived").await;
    app.post(&format!("/chats/{chat_id}/messages"), &token, json!({ "content": "hello" })).await;

    let response = app.delete(&format!("/chats/{chat_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/chats/{chat_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_error(&read_json(response).await, "CHAT_NOT_FOUND");
    assert!(app.platform.task_for_chat(chat_id).is_none());
}
