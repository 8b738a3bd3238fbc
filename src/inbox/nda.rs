use log::{info, warn};

use super::Inbox;
use crate::api::models::{ConversationPatch, Message};
use crate::error::{Error, Result};
use crate::utils::new_id;

impl Inbox {
    /// Sign the conversation's NDA on behalf of the current user.
    ///
    /// One-way: returns `Ok(false)` without side effects when it is already
    /// signed. Persisting the flag and the system message is best effort.
    pub async fn sign_nda(&mut self, conversation_id: &str) -> Result<bool> {
        let conv = self
            .conversation_mut(conversation_id)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))?;
        if conv.nda_signed {
            return Ok(false);
        }
        conv.nda_signed = true;

        let notice = Message::system(new_id(), format!("{} signed the NDA", self.user.name), None);
        self.append_message(conversation_id, notice.clone())?;
        info!("{} signed the NDA in {}", self.user.id, conversation_id);

        let patch = ConversationPatch { nda_signed: Some(true), ..Default::default() };
        if let Err(e) = self.backend.patch_conversation(conversation_id, &patch).await {
            warn!("Failed to persist NDA signature for {}: {}", conversation_id, e);
        }
        if let Err(e) = self.backend.post_message(conversation_id, &notice).await {
            warn!("Failed to post NDA notice for {}: {}", conversation_id, e);
        }
        Ok(true)
    }

    /// Whether the compose box and send button are enabled.
    pub fn can_compose(&self, conversation_id: &str) -> bool {
        self.conversation(conversation_id).is_some_and(|c| c.nda_signed)
    }

    /// Documents shared before signing are flagged as unprotected.
    pub fn documents_protected(&self, conversation_id: &str) -> bool {
        self.can_compose(conversation_id)
    }
}
