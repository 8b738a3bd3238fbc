use log::{debug, warn};

use super::Inbox;
use crate::api::events::ServerEvent;
use crate::api::models::DeliveryStatus;

impl Inbox {
    /// Fold a pushed server event into local state.
    pub fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Typing { conversation_id, user_id, active } => {
                if user_id == self.user.id {
                    return;
                }
                if active {
                    self.typing.insert(conversation_id);
                } else {
                    self.typing.remove(&conversation_id);
                }
            }
            ServerEvent::MessageCreated { conversation_id, mut message } => {
                // A message from the participant ends their typing state.
                if !message.sender.is_user(&self.user.id) {
                    self.typing.remove(&conversation_id);
                }
                let local = self
                    .conversation(&conversation_id)
                    .and_then(|c| c.message(&message.id))
                    .map(|m| (m.status, m.read));
                match local {
                    // Our own in-flight send is reconciled by finish_send.
                    Some((DeliveryStatus::Sending, _)) => {
                        debug!("Deferring echo of in-flight message {}", message.id);
                        return;
                    }
                    // Redelivery never makes a message unread again.
                    Some((_, read)) => message.read |= read,
                    None => {}
                }
                message.status = DeliveryStatus::Sent;
                if let Err(e) = self.append_message(&conversation_id, message) {
                    warn!("Dropping pushed message: {}", e);
                }
            }
            ServerEvent::ConversationUpdated { conversation_id, patch } => {
                if let Err(e) = self.update(&conversation_id, &patch) {
                    warn!("Dropping conversation update: {}", e);
                }
            }
            ServerEvent::MessagesRead { conversation_id, reader_id } => {
                self.record_read_receipt(&conversation_id, &reader_id);
            }
        }
    }

    pub fn is_typing(&self, conversation_id: &str) -> bool {
        self.typing.contains(conversation_id)
    }
}
