use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{Claims, TokenKind};
use crate::config;
use crate::error::ApiError;

/// Authenticated caller identity materialized from a verified access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub is_system_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            is_system_admin: claims.is_system_admin,
        }
    }
}

/// Identity extractor for protected handlers. A missing identity is always a
/// 401 envelope, never a 500.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Gate for protected route groups. Verifies the credential, materializes the
/// identity into request extensions and runs the handler; unauthenticated
/// callers are turned away per client kind (HTMX gets a 401 envelope with an
/// out-of-band redirect header, everyone else a 302 to the login page).
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match verify_credential(&state, request.headers()) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => reject_unauthenticated(&request),
    }
}

/// Gate variant for routes that behave differently for signed-in users but
/// never require a session. Invalid or absent credentials simply mean no
/// identity.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = verify_credential(&state, request.headers()) {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

fn verify_credential(state: &AppState, headers: &HeaderMap) -> Option<AuthUser> {
    let token = extract_credential(headers)?;
    match state.token_keys.verify(&token, TokenKind::Access) {
        Ok(claims) => Some(AuthUser::from(claims)),
        Err(e) => {
            tracing::warn!("rejected access credential: {}", e);
            None
        }
    }
}

/// Credential lookup order: `Authorization: Bearer` first (API clients), then
/// the `session_token` cookie (hypermedia client).
fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session_token" && !value.is_empty()).then(|| value.to_string())
    })
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("Hx-Request")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "true")
        .unwrap_or(false)
}

fn reject_unauthenticated(request: &Request) -> Response {
    let login_path = config::config().security.login_path.as_str();

    if is_htmx(request.headers()) {
        // Out-of-band redirect: HTMX swaps the location itself
        let error = ApiError::unauthorized("Authentication required");
        return (
            StatusCode::UNAUTHORIZED,
            [("Hx-Redirect", login_path.to_string())],
            Json(error.to_json()),
        )
            .into_response();
    }

    let mut response =
        (StatusCode::FOUND, [(header::LOCATION, login_path.to_string())]).into_response();

    // Preserve the original destination across the login round trip, GETs only
    if request.method() == Method::GET {
        let original = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        let cookie = format!("redirect_after_login={}; Path=/; Max-Age=300; HttpOnly", original);
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
