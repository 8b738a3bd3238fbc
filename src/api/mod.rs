pub mod client;
pub mod events;
pub mod models;

use async_trait::async_trait;

use crate::error::Result;
use models::{ConversationPatch, ConversationSummary, Meeting, Message, ProjectSummary, SharedDocument, UserSummary};

/// The REST backend the inbox talks to.
///
/// `ApiClient` is the HTTP implementation; tests swap in an in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET conversations?userId=`
    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>>;

    async fn user(&self, user_id: &str) -> Result<UserSummary>;

    async fn project(&self, project_id: &str) -> Result<ProjectSummary>;

    /// Append a message. Returns the server-confirmed copy, which keeps the client id.
    async fn post_message(&self, conversation_id: &str, message: &Message) -> Result<Message>;

    async fn mark_read(&self, conversation_id: &str, user_id: &str) -> Result<()>;

    async fn patch_conversation(&self, conversation_id: &str, patch: &ConversationPatch) -> Result<()>;

    async fn post_meeting(&self, conversation_id: &str, meeting: &Meeting) -> Result<()>;

    async fn post_document(&self, conversation_id: &str, document: &SharedDocument) -> Result<()>;
}
