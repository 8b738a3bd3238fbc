//! Client-side conversation state: the list, the active conversation, and the
//! actions that mutate them.

pub mod actions;
pub mod compose;
pub mod live;
pub mod nda;
pub mod search;
pub mod send;
pub mod unread;

use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::api::Backend;
use crate::api::models::{Conversation, ConversationPatch, ConversationSummary, DeliveryStatus, Message, ProjectSummary, UserSummary};
use crate::error::{Error, Result};
use compose::Composer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
}

pub struct Inbox {
    backend: Arc<dyn Backend>,
    user: CurrentUser,
    conversations: Vec<Conversation>,
    active: Option<String>,
    composer: Composer,
    /// Set while a message post is in flight from the compose box.
    sending: bool,
    typing: HashSet<String>,
    meeting_base_url: String,
}

impl Inbox {
    pub fn new(backend: Arc<dyn Backend>, user: CurrentUser) -> Self {
        Self {
            backend,
            user,
            conversations: Vec::new(),
            active: None,
            composer: Composer::default(),
            sending: false,
            typing: HashSet::new(),
            meeting_base_url: crate::app::DEFAULT_MEETING_BASE_URL.to_string(),
        }
    }

    pub fn with_meeting_base_url(mut self, url: &str) -> Self {
        self.meeting_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active.as_deref().and_then(|id| self.conversation(id))
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Seed the list from cached data, before the network answers.
    pub fn restore(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        self.drop_stale_active();
        self.recount_all();
        self.sort();
    }

    /// Fetch the conversation list and enrich it with participant and project
    /// data. Messages that are still `Sending` or `Failed` locally and absent
    /// from the server copy are carried over.
    pub async fn load(&mut self) -> Result<&[Conversation]> {
        let summaries = self.backend.conversations(&self.user.id).await?;
        info!("Loaded {} conversations for {}", summaries.len(), self.user.id);

        let mut users: HashMap<String, UserSummary> = HashMap::new();
        let mut projects: HashMap<String, ProjectSummary> = HashMap::new();
        let mut fresh = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let participant = match users.get(&summary.participant_id) {
                Some(u) => u.clone(),
                None => {
                    let u = self.lookup_user(&summary).await;
                    users.insert(summary.participant_id.clone(), u.clone());
                    u
                }
            };
            let project = match projects.get(&summary.project_id) {
                Some(p) => p.clone(),
                None => {
                    let p = self.lookup_project(&summary).await;
                    projects.insert(summary.project_id.clone(), p.clone());
                    p
                }
            };
            fresh.push(Conversation::from_summary(summary, participant, project));
        }

        for conv in &mut fresh {
            let Some(local) = self.conversations.iter().find(|c| c.id == conv.id) else {
                continue;
            };
            for msg in &local.messages {
                if msg.status != DeliveryStatus::Sent && conv.message(&msg.id).is_none() {
                    conv.messages.push(msg.clone());
                }
            }
        }

        self.conversations = fresh;
        self.drop_stale_active();
        self.recount_all();
        self.sort();
        Ok(&self.conversations)
    }

    async fn lookup_user(&self, summary: &ConversationSummary) -> UserSummary {
        match self.backend.user(&summary.participant_id).await {
            Ok(u) => u,
            Err(e) => {
                warn!("Participant lookup failed for {}: {}", summary.id, e);
                UserSummary::placeholder(&summary.participant_id)
            }
        }
    }

    async fn lookup_project(&self, summary: &ConversationSummary) -> ProjectSummary {
        match self.backend.project(&summary.project_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Project lookup failed for {}: {}", summary.id, e);
                ProjectSummary::placeholder(&summary.project_id)
            }
        }
    }

    /// Make `id` the active conversation and mark it read.
    pub async fn select(&mut self, id: &str) -> Result<()> {
        if self.conversation(id).is_none() {
            return Err(Error::ConversationNotFound(id.to_string()));
        }
        if self.active.as_deref() != Some(id) {
            self.composer.clear();
        }
        self.active = Some(id.to_string());
        self.mark_read(id).await
    }

    /// Merge `patch` into the conversation. There is one copy per
    /// conversation, so the list and the active view see the same result.
    pub fn update(&mut self, id: &str, patch: &ConversationPatch) -> Result<()> {
        let conv = self.conversation_mut(id).ok_or_else(|| Error::ConversationNotFound(id.to_string()))?;
        patch.apply(conv);
        self.sort();
        Ok(())
    }

    /// Shared append path for sent, system and pushed messages. A message
    /// whose id is already present replaces the existing copy.
    fn append_message(&mut self, conversation_id: &str, message: Message) -> Result<()> {
        let self_id = self.user.id.clone();
        let conv = self
            .conversation_mut(conversation_id)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))?;
        let at = message.timestamp;
        match conv.message_mut(&message.id) {
            Some(existing) => *existing = message,
            None => conv.messages.push(message),
        }
        conv.recount_unread(&self_id);
        self.note_activity(conversation_id, at);
        Ok(())
    }

    /// Advance `last_message_at` to `at` when it is newer, then re-sort.
    fn note_activity(&mut self, conversation_id: &str, at: chrono::DateTime<chrono::Utc>) {
        if let Some(conv) = self.conversation_mut(conversation_id) {
            if conv.last_message_at.map_or(true, |last| at > last) {
                conv.last_message_at = Some(at);
            }
        }
        self.sort();
    }

    fn drop_stale_active(&mut self) {
        if let Some(active) = &self.active {
            if self.conversation(active).is_none() {
                self.active = None;
            }
        }
    }

    fn set_status(&mut self, conversation_id: &str, message_id: &str, status: DeliveryStatus) {
        if let Some(msg) = self.conversation_mut(conversation_id).and_then(|c| c.message_mut(message_id)) {
            msg.status = status;
        }
    }

    fn sort(&mut self) {
        self.conversations.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    }

    fn recount_all(&mut self) {
        let self_id = self.user.id.clone();
        for conv in &mut self.conversations {
            conv.recount_unread(&self_id);
        }
    }
}
