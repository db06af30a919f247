//! In-memory implementation of every service contract.
//!
//! Backs the binary when no upstream is wired and every integration test.
//! All state lives in `HashMap`s behind a single `Mutex`; operations lock,
//! mutate and release synchronously, so per-entity ordering matches what a
//! durable backend would provide. Not durable: state is lost on restart.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{TokenKeys, TokenKind};
use crate::models::{
    Chat, ChatBasicInfo, ChatParticipant, ChatRole, ChatType, EntityType, Message, Notification,
    NotificationKind, Task, TaskDetail, TaskEvent, TaskPriority, TaskStatus, User, Workspace,
    WorkspaceMember, WorkspaceRole,
};

use super::{
    ActionService, AuthService, BoardFilter, BoardTaskService, ChatBasicInfoService, ChatService,
    ChatUpdate, Family, LoginOutcome, MemberService, MessageService, NewChat, NotificationService,
    ServiceError, ServiceResult, TaskDetailService, TaskEventService, TokenPair, UserRepository,
    WorkspaceService,
};

#[derive(Debug, Clone)]
struct WorkspaceRecord {
    id: Uuid,
    name: String,
    description: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct MembershipRecord {
    role: WorkspaceRole,
    joined_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    login_codes: HashMap<String, Uuid>,
    sessions: HashSet<Uuid>,
    system_admins: HashSet<Uuid>,
    workspaces: HashMap<Uuid, WorkspaceRecord>,
    memberships: HashMap<(Uuid, Uuid), MembershipRecord>,
    chats: HashMap<Uuid, Chat>,
    messages: HashMap<Uuid, Message>,
    tasks: HashMap<Uuid, Task>,
    task_events: HashMap<Uuid, Vec<TaskEvent>>,
    notifications: HashMap<Uuid, Notification>,
}

impl State {
    fn member_count(&self, workspace_id: Uuid) -> i64 {
        self.memberships.keys().filter(|(ws, _)| *ws == workspace_id).count() as i64
    }

    fn workspace_dto(&self, record: &WorkspaceRecord) -> Workspace {
        Workspace {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            owner_id: record.owner_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            member_count: self.member_count(record.id),
        }
    }

    fn task_by_chat(&self, chat_id: Uuid) -> Option<&Task> {
        self.tasks.values().find(|t| t.chat_id == chat_id)
    }

    fn record_event(&mut self, task_id: Uuid, actor_id: Uuid, kind: &str, data: serde_json::Value) {
        let event = TaskEvent {
            id: Uuid::new_v4(),
            task_id,
            kind: kind.to_string(),
            actor_id,
            data,
            created_at: Utc::now(),
        };
        self.task_events.entry(task_id).or_default().push(event);
    }

    /// Materialize the board task that backs a task-family chat.
    fn create_task_for(&mut self, chat: &Chat, actor_id: Uuid) {
        let entity_type = match chat.chat_type {
            ChatType::Task => EntityType::Task,
            ChatType::Bug => EntityType::Bug,
            ChatType::Epic => EntityType::Epic,
            ChatType::Discussion => return,
        };
        let task = Task {
            id: Uuid::new_v4(),
            chat_id: chat.id,
            title: chat.title.clone().unwrap_or_default(),
            description: String::new(),
            entity_type,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assignee_id: None,
            due_date: None,
            created_at: Utc::now(),
            version: 1,
        };
        let task_id = task.id;
        self.tasks.insert(task_id, task);
        self.record_event(task_id, actor_id, "created", serde_json::json!({}));
    }

    fn delete_chat_cascade(&mut self, chat_id: Uuid) {
        self.messages.retain(|_, m| m.chat_id != chat_id);
        let task_ids: Vec<Uuid> =
            self.tasks.values().filter(|t| t.chat_id == chat_id).map(|t| t.id).collect();
        for task_id in task_ids {
            self.tasks.remove(&task_id);
            self.task_events.remove(&task_id);
        }
        self.chats.remove(&chat_id);
    }
}

/// The whole platform behind one mutex. `AppState` hands this out as one
/// `Arc` per service trait.
pub struct InMemoryPlatform {
    state: Mutex<State>,
    token_keys: TokenKeys,
}

impl InMemoryPlatform {
    pub fn new(token_keys: TokenKeys) -> Self {
        Self { state: Mutex::new(State::default()), token_keys }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Lock poisoning only happens after a panic in a locked section;
        // recover with the inner state rather than cascading panics.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- seeding helpers used by the binary and the test suite --

    pub fn seed_user(&self, username: &str, email: &str, display_name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            external_id: format!("idp|{username}"),
            username: username.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        };
        self.lock().users.insert(user.id, user.clone());
        user
    }

    pub fn grant_system_admin(&self, user_id: Uuid) {
        self.lock().system_admins.insert(user_id);
    }

    pub fn is_system_admin(&self, user_id: Uuid) -> bool {
        self.lock().system_admins.contains(&user_id)
    }

    /// Register an identity-provider authorization code for `login`.
    pub fn register_login_code(&self, code: &str, user_id: Uuid) {
        self.lock().login_codes.insert(code.to_string(), user_id);
    }

    /// Mint a token pair and open a session without the login round trip.
    pub fn open_session(&self, user: &User) -> TokenPair {
        let is_admin = self.is_system_admin(user.id);
        let pair = self
            .token_keys
            .mint_pair(user, is_admin)
            .expect("in-memory platform has a usable signing key");
        self.lock().sessions.insert(user.id);
        pair
    }

    pub fn seed_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        resource_id: Uuid,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: format!("{kind}"),
            message: "seeded notification".to_string(),
            resource_id,
            is_read: false,
            created_at: Utc::now(),
            read_at: None,
        };
        self.lock().notifications.insert(notification.id, notification.clone());
        notification
    }

    /// Direct task lookup for fixtures that need ids without going through
    /// the board queries.
    pub fn task_for_chat(&self, chat_id: Uuid) -> Option<Task> {
        self.lock().task_by_chat(chat_id).cloned()
    }
}

#[async_trait]
impl AuthService for InMemoryPlatform {
    async fn login(&self, code: &str, _redirect_uri: &str) -> ServiceResult<LoginOutcome> {
        let (user, is_admin) = {
            let state = self.lock();
            let user_id =
                *state.login_codes.get(code).ok_or(ServiceError::InvalidCredentials)?;
            let user =
                state.users.get(&user_id).ok_or(ServiceError::InvalidCredentials)?.clone();
            (user, state.system_admins.contains(&user_id))
        };

        let tokens = self
            .token_keys
            .mint_pair(&user, is_admin)
            .map_err(|e| ServiceError::internal("login", e))?;
        self.lock().sessions.insert(user.id);
        Ok(LoginOutcome { user, tokens })
    }

    async fn logout(&self, user_id: Uuid) -> ServiceResult<()> {
        if self.lock().sessions.remove(&user_id) {
            Ok(())
        } else {
            Err(ServiceError::NotFound(Family::Session))
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let claims = self
            .token_keys
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| ServiceError::InvalidRefreshToken)?;

        let (user, is_admin) = {
            let state = self.lock();
            let user = state
                .users
                .get(&claims.sub)
                .cloned()
                .ok_or(ServiceError::InvalidRefreshToken)?;
            (user, state.system_admins.contains(&claims.sub))
        };

        self.token_keys.mint_pair(&user, is_admin).map_err(|e| ServiceError::internal("refresh", e))
    }
}

#[async_trait]
impl UserRepository for InMemoryPlatform {
    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> ServiceResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.external_id == external_id).cloned())
    }
}

fn page<T>(mut items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = offset.max(0) as usize;
    if offset >= items.len() {
        return Vec::new();
    }
    let mut tail = items.split_off(offset);
    tail.truncate(limit.max(0) as usize);
    tail
}

#[async_trait]
impl WorkspaceService for InMemoryPlatform {
    async fn create(
        &self,
        owner_id: Uuid,
        name: &str,
        description: &str,
    ) -> ServiceResult<Workspace> {
        let mut state = self.lock();
        if !state.users.contains_key(&owner_id) {
            return Err(ServiceError::NotFound(Family::User));
        }
        let now = Utc::now();
        let record = WorkspaceRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            owner_id,
            created_at: now,
            updated_at: now,
        };
        state.memberships.insert(
            (record.id, owner_id),
            MembershipRecord { role: WorkspaceRole::Owner, joined_at: now },
        );
        let dto = state.workspace_dto(&record);
        state.workspaces.insert(record.id, record);
        Ok(dto)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Workspace>> {
        let state = self.lock();
        let mut workspaces: Vec<Workspace> = state
            .workspaces
            .values()
            .filter(|w| state.memberships.contains_key(&(w.id, user_id)))
            .map(|w| state.workspace_dto(w))
            .collect();
        workspaces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(workspaces, limit, offset))
    }

    async fn list_all(&self, limit: i64, offset: i64) -> ServiceResult<Vec<Workspace>> {
        let state = self.lock();
        let mut workspaces: Vec<Workspace> =
            state.workspaces.values().map(|w| state.workspace_dto(w)).collect();
        workspaces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(workspaces, limit, offset))
    }

    async fn get(&self, id: Uuid) -> ServiceResult<Workspace> {
        let state = self.lock();
        state
            .workspaces
            .get(&id)
            .map(|w| state.workspace_dto(w))
            .ok_or(ServiceError::NotFound(Family::Workspace))
    }

    async fn update(&self, id: Uuid, name: &str, description: &str) -> ServiceResult<Workspace> {
        let mut state = self.lock();
        let record =
            state.workspaces.get_mut(&id).ok_or(ServiceError::NotFound(Family::Workspace))?;
        record.name = name.to_string();
        record.description = description.to_string();
        record.updated_at = Utc::now();
        let record = record.clone();
        Ok(state.workspace_dto(&record))
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let mut state = self.lock();
        if state.workspaces.remove(&id).is_none() {
            return Err(ServiceError::NotFound(Family::Workspace));
        }
        state.memberships.retain(|(ws, _), _| *ws != id);
        let chat_ids: Vec<Uuid> =
            state.chats.values().filter(|c| c.workspace_id == id).map(|c| c.id).collect();
        for chat_id in chat_ids {
            state.delete_chat_cascade(chat_id);
        }
        Ok(())
    }
}

#[async_trait]
impl MemberService for InMemoryPlatform {
    async fn list_members(
        &self,
        workspace_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<WorkspaceMember>> {
        let state = self.lock();
        if !state.workspaces.contains_key(&workspace_id) {
            return Err(ServiceError::NotFound(Family::Workspace));
        }
        let mut members: Vec<WorkspaceMember> = state
            .memberships
            .iter()
            .filter(|((ws, _), _)| *ws == workspace_id)
            .filter_map(|((_, user_id), record)| {
                let user = state.users.get(user_id)?;
                Some(WorkspaceMember {
                    user_id: *user_id,
                    username: user.username.clone(),
                    display_name: user.display_name.clone(),
                    role: record.role,
                    joined_at: record.joined_at,
                })
            })
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(page(members, limit, offset))
    }

    async fn add_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> ServiceResult<WorkspaceMember> {
        let mut state = self.lock();
        if !state.workspaces.contains_key(&workspace_id) {
            return Err(ServiceError::NotFound(Family::Workspace));
        }
        let user =
            state.users.get(&user_id).cloned().ok_or(ServiceError::NotFound(Family::User))?;
        if state.memberships.contains_key(&(workspace_id, user_id)) {
            return Err(ServiceError::MemberAlreadyExists);
        }
        if role == WorkspaceRole::Owner {
            return Err(ServiceError::validation("the owner role cannot be assigned"));
        }
        let record = MembershipRecord { role, joined_at: Utc::now() };
        state.memberships.insert((workspace_id, user_id), record.clone());
        Ok(WorkspaceMember {
            user_id,
            username: user.username,
            display_name: user.display_name,
            role: record.role,
            joined_at: record.joined_at,
        })
    }

    async fn remove_member(&self, workspace_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let mut state = self.lock();
        let record = state
            .memberships
            .get(&(workspace_id, user_id))
            .ok_or(ServiceError::NotFound(Family::Member))?;
        if record.role == WorkspaceRole::Owner {
            return Err(ServiceError::validation("the workspace owner cannot be removed"));
        }
        state.memberships.remove(&(workspace_id, user_id));
        Ok(())
    }

    async fn update_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> ServiceResult<WorkspaceMember> {
        let mut state = self.lock();
        if role == WorkspaceRole::Owner {
            return Err(ServiceError::validation("the owner role cannot be assigned"));
        }
        let record = state
            .memberships
            .get_mut(&(workspace_id, user_id))
            .ok_or(ServiceError::NotFound(Family::Member))?;
        if record.role == WorkspaceRole::Owner {
            return Err(ServiceError::validation("the owner role cannot be changed"));
        }
        record.role = role;
        let record = record.clone();
        let user =
            state.users.get(&user_id).cloned().ok_or(ServiceError::NotFound(Family::User))?;
        Ok(WorkspaceMember {
            user_id,
            username: user.username,
            display_name: user.display_name,
            role: record.role,
            joined_at: record.joined_at,
        })
    }

    async fn is_owner(&self, workspace_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .lock()
            .memberships
            .get(&(workspace_id, user_id))
            .map(|r| r.role == WorkspaceRole::Owner)
            .unwrap_or(false))
    }

    async fn get_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Option<WorkspaceRole>> {
        Ok(self.lock().memberships.get(&(workspace_id, user_id)).map(|r| r.role))
    }
}

#[async_trait]
impl ChatService for InMemoryPlatform {
    async fn create(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        new_chat: NewChat,
    ) -> ServiceResult<Chat> {
        let mut state = self.lock();
        if !state.workspaces.contains_key(&workspace_id) {
            return Err(ServiceError::NotFound(Family::Workspace));
        }
        if new_chat.chat_type.is_task_family()
            && new_chat.title.as_deref().map(str::is_empty).unwrap_or(true)
        {
            return Err(ServiceError::InvalidField {
                field: "name",
                message: "task-family chats require a title".to_string(),
            });
        }

        let now = Utc::now();
        let mut participants = vec![ChatParticipant {
            user_id: created_by,
            role: ChatRole::Admin,
            joined_at: now,
        }];
        for user_id in new_chat.participant_ids {
            if user_id != created_by && state.users.contains_key(&user_id) {
                participants.push(ChatParticipant {
                    user_id,
                    role: ChatRole::Member,
                    joined_at: now,
                });
            }
        }

        let chat = Chat {
            id: Uuid::new_v4(),
            workspace_id,
            chat_type: new_chat.chat_type,
            title: new_chat.title,
            is_public: new_chat.is_public,
            created_by,
            created_at: now,
            status: new_chat.chat_type.is_task_family().then_some(TaskStatus::Todo),
            participants,
        };
        state.create_task_for(&chat, created_by);
        state.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn get(&self, id: Uuid, caller_id: Uuid) -> ServiceResult<Chat> {
        let state = self.lock();
        let chat = state.chats.get(&id).ok_or(ServiceError::NotFound(Family::Chat))?;
        let visible = chat.is_participant(caller_id)
            || (chat.is_public && state.memberships.contains_key(&(chat.workspace_id, caller_id)))
            || state.system_admins.contains(&caller_id);
        if !visible {
            return Err(ServiceError::access_denied("not a participant of this chat"));
        }
        Ok(chat.clone())
    }

    async fn list(
        &self,
        workspace_id: Uuid,
        chat_type: Option<ChatType>,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Chat>> {
        let state = self.lock();
        if !state.workspaces.contains_key(&workspace_id) {
            return Err(ServiceError::NotFound(Family::Workspace));
        }
        let mut chats: Vec<Chat> = state
            .chats
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .filter(|c| chat_type.map(|t| c.chat_type == t).unwrap_or(true))
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(chats, limit, offset))
    }

    async fn update(&self, id: Uuid, update: ChatUpdate) -> ServiceResult<Chat> {
        let mut state = self.lock();
        let chat = state.chats.get(&id).cloned().ok_or(ServiceError::NotFound(Family::Chat))?;

        if let Some(target) = update.convert_to {
            // one-way discussion to task-family conversion
            if chat.chat_type.is_task_family() {
                return Err(ServiceError::Conflict {
                    state: "conversion",
                    message: "task-family chats cannot be converted".to_string(),
                });
            }
            if !target.is_task_family() {
                return Err(ServiceError::InvalidField {
                    field: "type",
                    message: "conversion target must be task, bug or epic".to_string(),
                });
            }
            let mut converted = chat;
            converted.chat_type = target;
            converted.title = Some(update.title.clone());
            converted.status = Some(TaskStatus::Todo);
            state.create_task_for(&converted, converted.created_by);
            state.chats.insert(id, converted.clone());
            return Ok(converted);
        }

        if !chat.chat_type.is_task_family() {
            return Err(ServiceError::validation("only task-family chats can be renamed"));
        }
        let mut renamed = chat;
        renamed.title = Some(update.title.clone());
        if let Some(task_id) = state.task_by_chat(id).map(|t| t.id) {
            let actor = renamed.created_by;
            if let Some(task) = state.tasks.get_mut(&task_id) {
                let from = std::mem::replace(&mut task.title, update.title.clone());
                task.version += 1;
                state.record_event(
                    task_id,
                    actor,
                    "renamed",
                    serde_json::json!({ "from": from, "to": update.title }),
                );
            }
        }
        state.chats.insert(id, renamed.clone());
        Ok(renamed)
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let mut state = self.lock();
        if !state.chats.contains_key(&id) {
            return Err(ServiceError::NotFound(Family::Chat));
        }
        state.delete_chat_cascade(id);
        Ok(())
    }

    async fn add_participant(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> ServiceResult<Chat> {
        let mut state = self.lock();
        if !state.users.contains_key(&user_id) {
            return Err(ServiceError::NotFound(Family::User));
        }
        let chat = state.chats.get_mut(&chat_id).ok_or(ServiceError::NotFound(Family::Chat))?;
        if chat.is_participant(user_id) {
            return Err(ServiceError::Conflict {
                state: "participant",
                message: "user is already a participant".to_string(),
            });
        }
        chat.participants.push(ChatParticipant { user_id, role, joined_at: Utc::now() });
        Ok(chat.clone())
    }

    async fn remove_participant(&self, chat_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let mut state = self.lock();
        let chat = state.chats.get_mut(&chat_id).ok_or(ServiceError::NotFound(Family::Chat))?;
        if !chat.is_participant(user_id) {
            return Err(ServiceError::NotFound(Family::Participant));
        }
        if chat.created_by == user_id {
            return Err(ServiceError::validation("the chat creator cannot be removed"));
        }
        chat.participants.retain(|p| p.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl MessageService for InMemoryPlatform {
    async fn send(
        &self,
        chat_id: Uuid,
        author_id: Uuid,
        content: &str,
        reply_to: Option<Uuid>,
    ) -> ServiceResult<Message> {
        let mut state = self.lock();
        let chat = state.chats.get(&chat_id).ok_or(ServiceError::NotFound(Family::Chat))?;
        if !chat.is_participant(author_id) {
            return Err(ServiceError::access_denied("not a participant of this chat"));
        }
        if let Some(reply_id) = reply_to {
            let target = state.messages.get(&reply_id);
            if !target.map(|m| m.chat_id == chat_id).unwrap_or(false) {
                return Err(ServiceError::InvalidField {
                    field: "reply_to_id",
                    message: "reply target must exist in the same chat".to_string(),
                });
            }
        }
        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            author_id,
            content: content.to_string(),
            reply_to_id: reply_to,
            created_at: Utc::now(),
            edited_at: None,
            is_deleted: false,
        };
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn list(&self, chat_id: Uuid, limit: i64, offset: i64) -> ServiceResult<Vec<Message>> {
        let state = self.lock();
        if !state.chats.contains_key(&chat_id) {
            return Err(ServiceError::NotFound(Family::Chat));
        }
        let mut messages: Vec<Message> =
            state.messages.values().filter(|m| m.chat_id == chat_id).cloned().collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(messages, limit, offset))
    }

    async fn edit(&self, id: Uuid, author_id: Uuid, content: &str) -> ServiceResult<Message> {
        let mut state = self.lock();
        let message =
            state.messages.get_mut(&id).ok_or(ServiceError::NotFound(Family::Message))?;
        if message.author_id != author_id {
            return Err(ServiceError::access_denied("only the author can edit a message"));
        }
        if message.is_deleted {
            return Err(ServiceError::Conflict {
                state: "deleted",
                message: "deleted messages cannot be edited".to_string(),
            });
        }
        message.content = content.to_string();
        message.edited_at = Some(Utc::now());
        Ok(message.clone())
    }

    async fn delete(&self, id: Uuid, author_id: Uuid) -> ServiceResult<()> {
        let mut state = self.lock();
        let message =
            state.messages.get_mut(&id).ok_or(ServiceError::NotFound(Family::Message))?;
        if message.author_id != author_id {
            return Err(ServiceError::access_denied("only the author can delete a message"));
        }
        // tombstone; repeat deletes are no-ops
        message.content.clear();
        message.is_deleted = true;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> ServiceResult<Message> {
        self.lock().messages.get(&id).cloned().ok_or(ServiceError::NotFound(Family::Message))
    }
}

#[async_trait]
impl NotificationService for InMemoryPlatform {
    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Notification>> {
        let state = self.lock();
        let mut notifications: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !unread_only || !n.is_read)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(notifications, limit, offset))
    }

    async fn count_unread(&self, user_id: Uuid) -> ServiceResult<u64> {
        Ok(self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_as_read(&self, id: Uuid, user_id: Uuid) -> ServiceResult<Notification> {
        let mut state = self.lock();
        let notification =
            state.notifications.get_mut(&id).ok_or(ServiceError::NotFound(Family::Notification))?;
        if notification.user_id != user_id {
            return Err(ServiceError::access_denied("notification belongs to another user"));
        }
        if notification.is_read {
            return Err(ServiceError::AlreadyRead);
        }
        notification.is_read = true;
        notification.read_at = Some(Utc::now());
        Ok(notification.clone())
    }

    async fn mark_all_as_read(&self, user_id: Uuid) -> ServiceResult<u64> {
        let mut state = self.lock();
        let now = Utc::now();
        let mut marked = 0;
        for notification in state.notifications.values_mut() {
            if notification.user_id == user_id && !notification.is_read {
                notification.is_read = true;
                notification.read_at = Some(now);
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let mut state = self.lock();
        let notification =
            state.notifications.get(&id).ok_or(ServiceError::NotFound(Family::Notification))?;
        if notification.user_id != user_id {
            return Err(ServiceError::access_denied("notification belongs to another user"));
        }
        state.notifications.remove(&id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> ServiceResult<Notification> {
        self.lock()
            .notifications
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound(Family::Notification))
    }
}

fn matches_filter(task: &Task, filter: &BoardFilter, now: DateTime<Utc>) -> bool {
    if filter.unassigned && task.assignee_id.is_some() {
        return false;
    }
    if let Some(assignee) = filter.assignee_id {
        if task.assignee_id != Some(assignee) {
            return false;
        }
    }
    if filter.overdue_only && !task.is_overdue(now) {
        return false;
    }
    if let Some(priority) = filter.priority {
        if task.priority != priority {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !task.title.to_lowercase().contains(&needle)
            && !task.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

#[async_trait]
impl BoardTaskService for InMemoryPlatform {
    async fn list_column(
        &self,
        workspace_id: Uuid,
        status: TaskStatus,
        filter: &BoardFilter,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Task>> {
        let now = Utc::now();
        let state = self.lock();
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.status == status)
            .filter(|t| {
                state
                    .chats
                    .get(&t.chat_id)
                    .map(|c| c.workspace_id == workspace_id)
                    .unwrap_or(false)
            })
            .filter(|t| matches_filter(t, filter, now))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(tasks, limit, offset))
    }

    async fn count_column(
        &self,
        workspace_id: Uuid,
        status: TaskStatus,
        filter: &BoardFilter,
    ) -> ServiceResult<u64> {
        let now = Utc::now();
        let state = self.lock();
        Ok(state
            .tasks
            .values()
            .filter(|t| t.status == status)
            .filter(|t| {
                state
                    .chats
                    .get(&t.chat_id)
                    .map(|c| c.workspace_id == workspace_id)
                    .unwrap_or(false)
            })
            .filter(|t| matches_filter(t, filter, now))
            .count() as u64)
    }
}

#[async_trait]
impl TaskDetailService for InMemoryPlatform {
    async fn get_detail(&self, task_id: Uuid) -> ServiceResult<TaskDetail> {
        let state = self.lock();
        let task = state.tasks.get(&task_id).cloned().ok_or(ServiceError::NotFound(Family::Task))?;
        let workspace_id = state
            .chats
            .get(&task.chat_id)
            .map(|c| c.workspace_id)
            .ok_or(ServiceError::NotFound(Family::Chat))?;
        let assignee = task.assignee_id.and_then(|id| state.users.get(&id).cloned());
        Ok(TaskDetail { task, workspace_id, assignee })
    }
}

#[async_trait]
impl TaskEventService for InMemoryPlatform {
    async fn list_recent(&self, task_id: Uuid, limit: i64) -> ServiceResult<Vec<TaskEvent>> {
        let state = self.lock();
        if !state.tasks.contains_key(&task_id) {
            return Err(ServiceError::NotFound(Family::Task));
        }
        let mut events = state.task_events.get(&task_id).cloned().unwrap_or_default();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }
}

#[async_trait]
impl ChatBasicInfoService for InMemoryPlatform {
    async fn get_basic_info(&self, chat_id: Uuid) -> ServiceResult<ChatBasicInfo> {
        let state = self.lock();
        let chat = state.chats.get(&chat_id).ok_or(ServiceError::NotFound(Family::Chat))?;
        Ok(ChatBasicInfo {
            id: chat.id,
            workspace_id: chat.workspace_id,
            chat_type: chat.chat_type,
            title: chat.title.clone(),
            status: chat.status,
        })
    }
}

impl InMemoryPlatform {
    /// Apply one board mutation: version bump plus event record.
    fn mutate_task<F>(&self, task_id: Uuid, actor_id: Uuid, kind: &str, apply: F) -> ServiceResult<Task>
    where
        F: FnOnce(&mut Task) -> serde_json::Value,
    {
        let mut state = self.lock();
        let task = state.tasks.get_mut(&task_id).ok_or(ServiceError::NotFound(Family::Task))?;
        let data = apply(task);
        task.version += 1;
        let updated = task.clone();
        // Keep the chat header in sync for rename and status moves
        if let Some(chat) = state.chats.get_mut(&updated.chat_id) {
            chat.title = Some(updated.title.clone());
            chat.status = Some(updated.status);
        }
        state.record_event(task_id, actor_id, kind, data);
        Ok(updated)
    }
}

#[async_trait]
impl ActionService for InMemoryPlatform {
    async fn change_status(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        status: TaskStatus,
    ) -> ServiceResult<Task> {
        self.mutate_task(task_id, actor_id, "status-changed", |task| {
            let from = std::mem::replace(&mut task.status, status);
            serde_json::json!({ "from": from, "to": status })
        })
    }

    async fn set_priority(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        priority: TaskPriority,
    ) -> ServiceResult<Task> {
        self.mutate_task(task_id, actor_id, "priority-changed", |task| {
            let from = std::mem::replace(&mut task.priority, priority);
            serde_json::json!({ "from": from, "to": priority })
        })
    }

    async fn assign_user(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        assignee: Option<Uuid>,
    ) -> ServiceResult<Task> {
        if let Some(user_id) = assignee {
            if !self.lock().users.contains_key(&user_id) {
                return Err(ServiceError::NotFound(Family::User));
            }
        }
        self.mutate_task(task_id, actor_id, "assignee-changed", |task| {
            let from = std::mem::replace(&mut task.assignee_id, assignee);
            serde_json::json!({ "from": from, "to": assignee })
        })
    }

    async fn set_due_date(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        due: Option<DateTime<Utc>>,
    ) -> ServiceResult<Task> {
        self.mutate_task(task_id, actor_id, "due-date-changed", |task| {
            let from = std::mem::replace(&mut task.due_date, due);
            serde_json::json!({ "from": from, "to": due })
        })
    }

    async fn close(&self, task_id: Uuid, actor_id: Uuid) -> ServiceResult<Task> {
        self.mutate_task(task_id, actor_id, "closed", |task| {
            let from = std::mem::replace(&mut task.status, TaskStatus::Done);
            serde_json::json!({ "from": from })
        })
    }

    async fn reopen(&self, task_id: Uuid, actor_id: Uuid) -> ServiceResult<Task> {
        self.mutate_task(task_id, actor_id, "reopened", |task| {
            let from = std::mem::replace(&mut task.status, TaskStatus::Todo);
            serde_json::json!({ "from": from })
        })
    }

    async fn rename(&self, task_id: Uuid, actor_id: Uuid, title: &str) -> ServiceResult<Task> {
        let title = title.to_string();
        self.mutate_task(task_id, actor_id, "renamed", move |task| {
            let from = std::mem::replace(&mut task.title, title.clone());
            serde_json::json!({ "from": from, "to": title })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> InMemoryPlatform {
        InMemoryPlatform::new(TokenKeys::from_secret("memory-test-secret").unwrap())
    }

    #[tokio::test]
    async fn login_and_logout_round_trip() {
        let platform = platform();
        let user = platform.seed_user("ada", "ada@example.com", "Ada");
        platform.register_login_code("valid", user.id);

        let outcome = platform.login("valid", "http://x/cb").await.unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert!(!outcome.tokens.access_token.is_empty());

        platform.logout(user.id).await.unwrap();
        assert!(matches!(
            platform.logout(user.id).await,
            Err(ServiceError::NotFound(Family::Session))
        ));
    }

    #[tokio::test]
    async fn owner_membership_is_created_with_the_workspace() {
        let platform = platform();
        let owner = platform.seed_user("o", "o@x", "O");
        let workspace = WorkspaceService::create(&platform, owner.id, "Test", "").await.unwrap();
        assert_eq!(workspace.member_count, 1);
        assert!(platform.is_owner(workspace.id, owner.id).await.unwrap());
        assert!(matches!(
            platform.remove_member(workspace.id, owner.id).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn task_chat_creation_materializes_a_board_task() {
        let platform = platform();
        let owner = platform.seed_user("o", "o@x", "O");
        let workspace = WorkspaceService::create(&platform, owner.id, "WS", "").await.unwrap();
        let chat = ChatService::create(
            &platform,
            workspace.id,
            owner.id,
            NewChat {
                chat_type: ChatType::Bug,
                title: Some("Crash on save".into()),
                is_public: true,
                participant_ids: vec![],
            },
        )
        .await
        .unwrap();

        let task = platform.task_for_chat(chat.id).expect("task exists");
        assert_eq!(task.title, "Crash on save");
        assert_eq!(task.status, TaskStatus::Todo);
        let events = platform.list_recent(task.id, 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "created");
    }

    #[tokio::test]
    async fn conversion_is_one_way() {
        let platform = platform();
        let owner = platform.seed_user("o", "o@x", "O");
        let workspace = WorkspaceService::create(&platform, owner.id, "WS", "").await.unwrap();
        let chat = ChatService::create(
            &platform,
            workspace.id,
            owner.id,
            NewChat {
                chat_type: ChatType::Discussion,
                title: None,
                is_public: true,
                participant_ids: vec![],
            },
        )
        .await
        .unwrap();

        let converted = ChatService::update(
            &platform,
            chat.id,
            ChatUpdate { title: "Now a task".into(), convert_to: Some(ChatType::Task) },
        )
        .await
        .unwrap();
        assert_eq!(converted.chat_type, ChatType::Task);
        assert_eq!(converted.status, Some(TaskStatus::Todo));

        let again = ChatService::update(
            &platform,
            chat.id,
            ChatUpdate { title: "Back".into(), convert_to: Some(ChatType::Epic) },
        )
        .await;
        assert!(matches!(again, Err(ServiceError::Conflict { state: "conversion", .. })));
    }

    #[tokio::test]
    async fn message_delete_is_a_tombstone() {
        let platform = platform();
        let owner = platform.seed_user("o", "o@x", "O");
        let workspace = WorkspaceService::create(&platform, owner.id, "WS", "").await.unwrap();
        let chat = ChatService::create(
            &platform,
            workspace.id,
            owner.id,
            NewChat {
                chat_type: ChatType::Discussion,
                title: None,
                is_public: true,
                participant_ids: vec![],
            },
        )
        .await
        .unwrap();

        let message = platform.send(chat.id, owner.id, "hello", None).await.unwrap();
        MessageService::delete(&platform, message.id, owner.id).await.unwrap();

        let listed = MessageService::list(&platform, chat.id, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_deleted);
        assert!(listed[0].content.is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_is_monotonic() {
        let platform = platform();
        let user = platform.seed_user("u", "u@x", "U");
        let n = platform.seed_notification(user.id, NotificationKind::System, Uuid::new_v4());

        platform.mark_as_read(n.id, user.id).await.unwrap();
        assert!(matches!(
            platform.mark_as_read(n.id, user.id).await,
            Err(ServiceError::AlreadyRead)
        ));
    }

    #[tokio::test]
    async fn board_actions_bump_version_and_record_events() {
        let platform = platform();
        let owner = platform.seed_user("o", "o@x", "O");
        let workspace = WorkspaceService::create(&platform, owner.id, "WS", "").await.unwrap();
        let chat = ChatService::create(
            &platform,
            workspace.id,
            owner.id,
            NewChat {
                chat_type: ChatType::Task,
                title: Some("Ship it".into()),
                is_public: true,
                participant_ids: vec![],
            },
        )
        .await
        .unwrap();
        let task = platform.task_for_chat(chat.id).unwrap();

        let moved =
            platform.change_status(task.id, owner.id, TaskStatus::InProgress).await.unwrap();
        assert_eq!(moved.version, task.version + 1);

        let closed = platform.close(task.id, owner.id).await.unwrap();
        assert_eq!(closed.status, TaskStatus::Done);

        let events = platform.list_recent(task.id, 10).await.unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["closed", "status-changed", "created"]);
    }
}
