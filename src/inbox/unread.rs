use log::warn;

use super::Inbox;
use crate::api::models::{Conversation, Message};
use crate::error::{Error, Result};

/// Messages from anyone but `self_id` that are not yet read.
pub fn unread_count(messages: &[Message], self_id: &str) -> usize {
    messages.iter().filter(|m| !m.sender.is_user(self_id) && !m.read).count()
}

impl Conversation {
    pub fn recount_unread(&mut self, self_id: &str) {
        self.unread_count = unread_count(&self.messages, self_id);
    }
}

impl Inbox {
    /// Mark everything the other side sent as read, then tell the backend.
    /// Backend failures are logged; the local state stays read.
    pub async fn mark_read(&mut self, conversation_id: &str) -> Result<()> {
        let self_id = self.user.id.clone();
        let conv = self
            .conversation_mut(conversation_id)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))?;
        for msg in conv.messages.iter_mut().filter(|m| !m.sender.is_user(&self_id)) {
            msg.read = true;
        }
        conv.unread_count = 0;

        if let Err(e) = self.backend.mark_read(conversation_id, &self_id).await {
            warn!("Failed to mark {} read: {}", conversation_id, e);
        }
        Ok(())
    }

    pub fn total_unread(&self) -> usize {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    /// Read receipt: `reader_id` has seen our messages in the conversation.
    pub(crate) fn record_read_receipt(&mut self, conversation_id: &str, reader_id: &str) {
        let self_id = self.user.id.clone();
        if reader_id == self_id {
            return;
        }
        if let Some(conv) = self.conversation_mut(conversation_id) {
            for msg in conv.messages.iter_mut().filter(|m| m.sender.is_user(&self_id)) {
                msg.read = true;
            }
        }
    }
}
