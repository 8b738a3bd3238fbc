use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SYSTEM_SENDER: &str = "system";

/// Who wrote a message: a platform user, or the platform itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sender {
    User(String),
    System,
}

impl Sender {
    pub fn is_user(&self, user_id: &str) -> bool {
        matches!(self, Sender::User(id) if id == user_id)
    }
}

impl From<String> for Sender {
    fn from(value: String) -> Self {
        if value == SYSTEM_SENDER { Sender::System } else { Sender::User(value) }
    }
}

impl From<Sender> for String {
    fn from(value: Sender) -> Self {
        match value {
            Sender::User(id) => id,
            Sender::System => SYSTEM_SENDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending,
    #[default]
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Investor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserSummary {
    /// Stand-in used when the user lookup fails.
    pub fn placeholder(id: &str) -> Self {
        Self { id: id.to_string(), name: "Unknown user".into(), role: None, avatar_url: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
}

impl ProjectSummary {
    pub fn placeholder(id: &str) -> Self {
        Self { id: id.to_string(), title: "Untitled project".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub conversation_id: String,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub agenda: String,
    pub link: String,
    #[serde(default)]
    pub status: MeetingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Shared,
    Viewed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDocument {
    pub id: String,
    pub conversation_id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
    pub uploaded_by: String,
    #[serde(default)]
    pub status: DocumentStatus,
    /// False when the document was shared before the NDA was signed.
    #[serde(default)]
    pub nda_protected: bool,
}

/// Structured payload carried by a system message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Embed {
    Meeting(Meeting),
    Document(SharedDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: DeliveryStatus,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl Message {
    pub fn system(id: String, content: String, embed: Option<Embed>) -> Self {
        Self {
            id,
            sender: Sender::System,
            content,
            attachments: Vec::new(),
            timestamp: Utc::now(),
            status: DeliveryStatus::Sent,
            read: true,
            embed,
        }
    }
}

/// Conversation as returned by `GET conversations`, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub participant_id: String,
    pub project_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub nda_signed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub documents: Vec<SharedDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participant: UserSummary,
    pub project: ProjectSummary,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub nda_signed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub documents: Vec<SharedDocument>,
    #[serde(default)]
    pub unread_count: usize,
}

impl Conversation {
    pub fn from_summary(summary: ConversationSummary, participant: UserSummary, project: ProjectSummary) -> Self {
        Self {
            id: summary.id,
            participant,
            project,
            messages: summary.messages,
            nda_signed: summary.nda_signed,
            created_at: summary.created_at,
            last_message_at: summary.last_message_at,
            meetings: summary.meetings,
            documents: summary.documents,
            unread_count: 0,
        }
    }

    /// Sort key for the conversation list.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

/// Partial update of a conversation. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nda_signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl ConversationPatch {
    pub fn apply(&self, conversation: &mut Conversation) {
        // Signing is one-way; a patch can never clear the flag.
        if self.nda_signed == Some(true) {
            conversation.nda_signed = true;
        }
        if let Some(at) = self.last_message_at {
            conversation.last_message_at = Some(at);
        }
    }
}
