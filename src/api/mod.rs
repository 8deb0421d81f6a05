pub mod client;
pub mod events;
pub mod models;
pub mod socket;

use crate::error::Result;
use async_trait::async_trait;
use models::{AuthResponse, Contact, HistoryEntry, LoginRequest, RegisterRequest, SendMessageRequest, SetAvatarResponse};

/// REST surface of the chat backend. `client::ApiClient` is the HTTP implementation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse>;
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse>;
    async fn set_avatar(&self, user_id: &str, image: &str) -> Result<SetAvatarResponse>;
    async fn contacts(&self, user_id: &str) -> Result<Vec<Contact>>;
    async fn history(&self, from: &str, to: &str) -> Result<Vec<HistoryEntry>>;
    async fn send_message(&self, req: &SendMessageRequest) -> Result<()>;
    async fn logout(&self, user_id: &str) -> Result<()>;
}
