#![allow(dead_code)]

use async_trait::async_trait;
use chatsphere::api::ChatBackend;
use chatsphere::api::events::OutboundMessage;
use chatsphere::api::models::{
    AuthResponse, Contact, HistoryEntry, LoginRequest, RegisterRequest, SendMessageRequest, SetAvatarResponse, User,
};
use chatsphere::api::socket::MessageChannel;
use chatsphere::session::SessionStore;
use chatsphere::storage::LocalStorage;
use chatsphere::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login(String),
    Register(String),
    SetAvatar { user_id: String, image: String },
    Contacts(String),
    History { from: String, to: String },
    Send(SendMessageRequest),
    Logout(String),
}

/// Scripted backend that records every call it receives.
#[derive(Default)]
pub struct MockBackend {
    pub calls: Mutex<Vec<Call>>,
    pub histories: Mutex<HashMap<(String, String), Vec<HistoryEntry>>>,
    pub auth_response: Mutex<Option<AuthResponse>>,
    pub avatar_response: Mutex<Option<SetAvatarResponse>>,
    pub fail_history: Mutex<bool>,
    pub fail_send: Mutex<bool>,
    pub fail_logout: Mutex<bool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, from: &str, to: &str, entries: Vec<HistoryEntry>) -> Self {
        self.histories.lock().unwrap().insert((from.to_string(), to.to_string()), entries);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn auth(&self) -> Result<AuthResponse> {
        self.auth_response.lock().unwrap().clone().ok_or(Error::Http(500))
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        self.record(Call::Login(req.username.clone()));
        self.auth()
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        self.record(Call::Register(req.username.clone()));
        self.auth()
    }

    async fn set_avatar(&self, user_id: &str, image: &str) -> Result<SetAvatarResponse> {
        self.record(Call::SetAvatar { user_id: user_id.to_string(), image: image.to_string() });
        self.avatar_response.lock().unwrap().clone().ok_or(Error::Http(500))
    }

    async fn contacts(&self, user_id: &str) -> Result<Vec<Contact>> {
        self.record(Call::Contacts(user_id.to_string()));
        Ok(Vec::new())
    }

    async fn history(&self, from: &str, to: &str) -> Result<Vec<HistoryEntry>> {
        self.record(Call::History { from: from.to_string(), to: to.to_string() });
        if *self.fail_history.lock().unwrap() {
            return Err(Error::Http(502));
        }
        let key = (from.to_string(), to.to_string());
        Ok(self.histories.lock().unwrap().get(&key).cloned().unwrap_or_default())
    }

    async fn send_message(&self, req: &SendMessageRequest) -> Result<()> {
        self.record(Call::Send(req.clone()));
        if *self.fail_send.lock().unwrap() {
            return Err(Error::Http(500));
        }
        Ok(())
    }

    async fn logout(&self, user_id: &str) -> Result<()> {
        self.record(Call::Logout(user_id.to_string()));
        if *self.fail_logout.lock().unwrap() {
            return Err(Error::Http(503));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub closed: Mutex<bool>,
}

impl RecordingChannel {
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl MessageChannel for RecordingChannel {
    fn emit_send(&self, msg: &OutboundMessage) -> Result<()> {
        if *self.closed.lock().unwrap() {
            return Err(Error::ChannelClosed);
        }
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        username: name.to_string(),
        email: Some(format!("{name}@example.org")),
        avatar_image: String::new(),
        is_avatar_image_set: false,
    }
}

pub fn contact(id: &str, name: &str) -> Contact {
    Contact { id: id.to_string(), username: name.to_string(), avatar_image: String::new() }
}

pub fn history(entries: &[(bool, &str)]) -> Vec<HistoryEntry> {
    entries.iter().map(|(from_self, msg)| HistoryEntry { from_self: *from_self, message: msg.to_string() }).collect()
}

pub fn session_store(dir: &tempfile::TempDir) -> SessionStore {
    let storage = LocalStorage::open(dir.path().join("local.sqlite")).unwrap();
    SessionStore::new(storage, "chat-app-user")
}
