//! In-memory backend and fixtures for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::Backend;
use crate::api::models::{
    Conversation, ConversationPatch, ConversationSummary, DeliveryStatus, Meeting, Message, ProjectSummary, Sender,
    SharedDocument, UserSummary,
};
use crate::error::{Error, Result};
use crate::inbox::CurrentUser;

pub const ME: &str = "me";
pub const OTHER: &str = "investor-1";

#[derive(Default)]
pub struct FakeState {
    pub summaries: Vec<ConversationSummary>,
    pub users: HashMap<String, UserSummary>,
    pub projects: HashMap<String, ProjectSummary>,
    pub posted: Vec<(String, Message)>,
    pub reads: Vec<(String, String)>,
    pub patches: Vec<(String, ConversationPatch)>,
    pub meetings: Vec<(String, Meeting)>,
    pub documents: Vec<(String, SharedDocument)>,
    pub user_lookups: usize,
    pub fail_list: bool,
    pub fail_lookups: bool,
    pub fail_writes: bool,
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

fn offline() -> Error {
    Error::Http { status: 503, endpoint: "fake".into() }
}

impl FakeBackend {
    pub fn with_summaries(summaries: Vec<ConversationSummary>) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for s in &summaries {
                state.users.insert(
                    s.participant_id.clone(),
                    UserSummary { id: s.participant_id.clone(), name: "Grace Investor".into(), role: None, avatar_url: None },
                );
                state
                    .projects
                    .insert(s.project_id.clone(), ProjectSummary { id: s.project_id.clone(), title: "Solar Kites".into() });
            }
            state.summaries = summaries;
        }
        backend
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn posted_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().posted.iter().map(|(_, m)| m.id.clone()).collect()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn conversations(&self, _user_id: &str) -> Result<Vec<ConversationSummary>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(offline());
        }
        Ok(state.summaries.clone())
    }

    async fn user(&self, user_id: &str) -> Result<UserSummary> {
        let mut state = self.state.lock().unwrap();
        state.user_lookups += 1;
        if state.fail_lookups {
            return Err(offline());
        }
        state.users.get(user_id).cloned().ok_or_else(offline)
    }

    async fn project(&self, project_id: &str) -> Result<ProjectSummary> {
        let state = self.state.lock().unwrap();
        if state.fail_lookups {
            return Err(offline());
        }
        state.projects.get(project_id).cloned().ok_or_else(offline)
    }

    async fn post_message(&self, conversation_id: &str, message: &Message) -> Result<Message> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(offline());
        }
        state.posted.push((conversation_id.to_string(), message.clone()));
        Ok(Message { status: DeliveryStatus::Sent, ..message.clone() })
    }

    async fn mark_read(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(offline());
        }
        state.reads.push((conversation_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn patch_conversation(&self, conversation_id: &str, patch: &ConversationPatch) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(offline());
        }
        state.patches.push((conversation_id.to_string(), patch.clone()));
        Ok(())
    }

    async fn post_meeting(&self, conversation_id: &str, meeting: &Meeting) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(offline());
        }
        state.meetings.push((conversation_id.to_string(), meeting.clone()));
        Ok(())
    }

    async fn post_document(&self, conversation_id: &str, document: &SharedDocument) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(offline());
        }
        state.documents.push((conversation_id.to_string(), document.clone()));
        Ok(())
    }
}

pub fn me() -> CurrentUser {
    CurrentUser { id: ME.into(), name: "Ada Founder".into() }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn incoming(id: &str, content: &str, minutes: i64, read: bool) -> Message {
    Message {
        id: id.into(),
        sender: Sender::User(OTHER.into()),
        content: content.into(),
        attachments: Vec::new(),
        timestamp: base_time() + Duration::minutes(minutes),
        status: DeliveryStatus::Sent,
        read,
        embed: None,
    }
}

pub fn outgoing(id: &str, content: &str, minutes: i64) -> Message {
    Message { sender: Sender::User(ME.into()), ..incoming(id, content, minutes, false) }
}

pub fn summary(id: &str, nda_signed: bool, messages: Vec<Message>) -> ConversationSummary {
    let last_message_at = messages.iter().map(|m| m.timestamp).max();
    ConversationSummary {
        id: id.into(),
        participant_id: OTHER.into(),
        project_id: format!("project-{}", id),
        messages,
        nda_signed,
        created_at: base_time(),
        last_message_at,
        meetings: Vec::new(),
        documents: Vec::new(),
    }
}

pub fn conversation(id: &str, nda_signed: bool) -> Conversation {
    Conversation::from_summary(
        summary(id, nda_signed, Vec::new()),
        UserSummary::placeholder(OTHER),
        ProjectSummary::placeholder(&format!("project-{}", id)),
    )
}
