// Application state and router assembly.
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenKeys;
use crate::handlers;
use crate::middleware::auth::require_auth;
use crate::render::{FragmentRenderer, HtmlRenderer};
use crate::services::memory::InMemoryPlatform;
use crate::services::{
    ActionService, AuthService, BoardTaskService, ChatBasicInfoService, ChatService,
    MemberService, MessageService, NotificationService, TaskDetailService, TaskEventService,
    UserRepository, WorkspaceService,
};

/// Everything a handler can reach. One `Arc<dyn Trait>` per service seam so
/// tests and the binary can wire different backends behind the same router.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub users: Arc<dyn UserRepository>,
    pub workspaces: Arc<dyn WorkspaceService>,
    pub members: Arc<dyn MemberService>,
    pub chats: Arc<dyn ChatService>,
    pub messages: Arc<dyn MessageService>,
    pub notifications: Arc<dyn NotificationService>,
    pub board_tasks: Arc<dyn BoardTaskService>,
    pub task_detail: Arc<dyn TaskDetailService>,
    pub task_events: Arc<dyn TaskEventService>,
    pub chat_info: Arc<dyn ChatBasicInfoService>,
    pub actions: Arc<dyn ActionService>,
    pub token_keys: TokenKeys,
    pub renderer: Arc<dyn FragmentRenderer>,
}

impl AppState {
    /// Wire every seam to one in-memory platform. The platform handle is
    /// returned alongside so callers can seed users, sessions and fixtures.
    pub fn in_memory(token_keys: TokenKeys) -> (Self, Arc<InMemoryPlatform>) {
        let platform = Arc::new(InMemoryPlatform::new(token_keys.clone()));
        let state = Self {
            auth: platform.clone(),
            users: platform.clone(),
            workspaces: platform.clone(),
            members: platform.clone(),
            chats: platform.clone(),
            messages: platform.clone(),
            notifications: platform.clone(),
            board_tasks: platform.clone(),
            task_detail: platform.clone(),
            task_events: platform.clone(),
            chat_info: platform.clone(),
            actions: platform.clone(),
            token_keys,
            renderer: Arc::new(HtmlRenderer),
        };
        (state, platform)
    }
}

/// Build the full router. Everything outside the public group sits behind the
/// authentication gate.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(workspace_routes())
        .merge(chat_routes())
        .merge(message_routes())
        .merge(notification_routes())
        .merge(partial_routes())
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
}

fn workspace_routes() -> Router<AppState> {
    use handlers::workspace;

    Router::new()
        .route("/workspaces", post(workspace::create_workspace).get(workspace::list_workspaces))
        .route(
            "/workspaces/:id",
            get(workspace::get_workspace)
                .put(workspace::update_workspace)
                .delete(workspace::delete_workspace),
        )
        .route(
            "/workspaces/:id/members",
            get(workspace::list_members).post(workspace::add_member),
        )
        .route("/workspaces/:id/members/:user_id", delete(workspace::remove_member))
        .route("/workspaces/:id/members/:user_id/role", put(workspace::update_member_role))
}

fn chat_routes() -> Router<AppState> {
    use handlers::chat;

    Router::new()
        .route("/workspaces/:id/chats", post(chat::create_chat).get(chat::list_chats))
        .route(
            "/chats/:id",
            get(chat::get_chat).put(chat::update_chat).delete(chat::delete_chat),
        )
        .route("/chats/:id/participants", post(chat::add_participant))
        .route("/chats/:id/participants/:user_id", delete(chat::remove_participant))
}

fn message_routes() -> Router<AppState> {
    use handlers::message;

    Router::new()
        .route("/chats/:id/messages", post(message::send_message).get(message::list_messages))
        .route("/messages/:id", put(message::edit_message).delete(message::delete_message))
}

fn notification_routes() -> Router<AppState> {
    use handlers::notification;

    Router::new()
        .route("/notifications", get(notification::list_notifications))
        .route("/notifications/unread/count", get(notification::unread_count))
        .route("/notifications/mark-all-read", put(notification::mark_all_read))
        .route("/notifications/:id/read", put(notification::mark_read))
        .route("/notifications/:id", delete(notification::delete_notification))
}

/// HTML fragment endpoints for the hypermedia client.
fn partial_routes() -> Router<AppState> {
    use handlers::board;

    Router::new()
        .route("/partials/workspaces/:workspace_id/board", get(board::board_grid))
        .route("/partials/workspaces/:workspace_id/board/:status", get(board::board_column))
        .route("/partials/tasks/:id/card", get(board::task_card))
        .route("/partials/tasks/:id/sidebar", get(board::task_sidebar))
        .route("/partials/tasks/:id/timeline", get(board::task_timeline))
        .route("/partials/tasks/:id/edit/:field", get(board::task_edit_form))
        .route("/partials/tasks/:id/actions/:action", post(board::run_action))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Parley API",
            "version": version,
            "description": "Collaboration platform HTTP API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/auth/login, /auth/refresh (public), /auth/logout, /auth/me (protected)",
                "workspaces": "/workspaces[/:id] (protected)",
                "members": "/workspaces/:id/members[/:user_id[/role]] (protected)",
                "chats": "/workspaces/:id/chats, /chats/:id[/participants] (protected)",
                "messages": "/chats/:id/messages, /messages/:id (protected)",
                "notifications": "/notifications/* (protected)",
                "partials": "/partials/* (protected, text/html)",
            },
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": Utc::now().to_rfc3339(),
        }
    }))
}
