mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{assert_error, data, read_json, spawn_app};

#[tokio::test]
async fn health_and_root_are_public() {
    let app = spawn_app();

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["status"], "ok");

    let response = app.request(Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(data(&body)["endpoints"].is_object());
}

#[tokio::test]
async fn login_exchanges_a_code_for_tokens() {
    let app = spawn_app();
    let user = app.platform.seed_user("ada", "ada@parley.test", "Ada Lovelace");
    app.platform.register_login_code("good-code", user.id);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "code": "good-code", "redirect_uri": "http://localhost/cb" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let data = data(&body);
    assert!(!data["access_token"].as_str().unwrap().is_empty());
    assert!(!data["refresh_token"].as_str().unwrap().is_empty());
    assert_eq!(data["user"]["username"], "ada");
    assert_eq!(data["user"]["email"], "ada@parley.test");
}

#[tokio::test]
async fn login_validates_its_inputs() {
    let app = spawn_app();

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "redirect_uri": "http://localhost/cb" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "VALIDATION_ERROR");

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "code": "nobody-registered-this", "redirect_uri": "http://x/cb" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_error(&read_json(response).await, "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let app = spawn_app();
    let user = app.platform.seed_user("ada", "ada@parley.test", "Ada");
    app.platform.register_login_code("code", user.id);

    let login = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "code": "code", "redirect_uri": "http://x/cb" })),
        )
        .await;
    let body = read_json(login).await;
    let refresh_token = data(&body)["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(!data(&body)["access_token"].as_str().unwrap().is_empty());
    assert!(!data(&body)["refresh_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_rejects_access_tokens_and_garbage() {
    let app = spawn_app();
    let (_, access_token) = app.signed_in("ada");

    // an access token is not a refresh token
    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": access_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_error(&read_json(response).await, "INVALID_REFRESH_TOKEN");

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": "not.a.jwt" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_error(&read_json(response).await, "INVALID_REFRESH_TOKEN");

    // an empty token never reaches the service
    let response = app
        .request(Method::POST, "/auth/refresh", None, Some(json!({ "refresh_token": "" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_json_still_gets_the_failure_envelope() {
    let app = spawn_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error(&read_json(response).await, "INVALID_REQUEST");
}

#[tokio::test]
async fn me_returns_the_signed_in_profile() {
    let app = spawn_app();
    let (user, token) = app.signed_in("grace");

    let response = app.get("/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["id"], user.id.to_string());
    assert_eq!(data(&body)["username"], "grace");
}

#[tokio::test]
async fn logout_tolerates_an_already_closed_session() {
    let app = spawn_app();
    let (_, token) = app.signed_in("grace");

    let response = app.post("/auth/logout", &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(data(&body)["logged_out"], true);

    // The token is still valid; the session is simply gone. Still 200.
    let response = app.post("/auth/logout", &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_cookie_is_accepted_as_a_credential() {
    let app = spawn_app();
    let (_, token) = app.signed_in("ada");

    let request = Request::builder()
        .method(Method::GET)
        .uri("/auth/me")
        .header(header::COOKIE, format!("theme=dark; session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_browser_gets_are_redirected_to_login() {
    let app = spawn_app();

    let response = app.request(Method::GET, "/workspaces", None, None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("redirect_after_login=/workspaces"));
}

#[tokio::test]
async fn unauthenticated_htmx_calls_get_an_out_of_band_redirect() {
    let app = spawn_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/notifications")
        .header("Hx-Request", "true")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["Hx-Redirect"], "/login");
    assert_error(&read_json(response).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn a_tampered_bearer_token_is_rejected() {
    let app = spawn_app();
    let (_, token) = app.signed_in("ada");
    let mut forged = token.clone();
    forged.pop();

    let response = app.get("/auth/me", &forged).await;
    // the gate treats a bad credential like a missing one
    assert_eq!(response.status(), StatusCode::FOUND);
}
