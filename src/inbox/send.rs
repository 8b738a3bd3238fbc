use chrono::Utc;
use log::{debug, info, warn};

use super::Inbox;
use crate::api::models::{DeliveryStatus, Message, Sender};
use crate::error;
use crate::utils::new_id;

/// Why a send request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    NoActiveConversation,
    UnknownMessage,
    NdaNotSigned,
    /// Another message from the compose box is still in flight.
    InFlight,
    /// Only `Failed` messages can be resent.
    NotRetryable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Skipped(SkipReason),
    Sent(String),
    Failed(String),
}

/// An optimistic message already shown locally, waiting for the backend.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub conversation_id: String,
    pub message: Message,
}

impl Inbox {
    /// Send the compose buffer to the active conversation.
    pub async fn send(&mut self) -> SendOutcome {
        let pending = match self.begin_send() {
            Ok(p) => p,
            Err(reason) => return SendOutcome::Skipped(reason),
        };
        let result = self.backend.post_message(&pending.conversation_id, &pending.message).await;
        self.finish_send(pending, result)
    }

    /// Append the compose buffer as a `Sending` message and clear the buffer.
    /// The caller submits `PendingSend::message` and reports back through
    /// [`Inbox::finish_send`].
    pub fn begin_send(&mut self) -> Result<PendingSend, SkipReason> {
        if self.composer.is_empty() {
            return Err(SkipReason::Empty);
        }
        let conv = self.active().ok_or(SkipReason::NoActiveConversation)?;
        if !conv.nda_signed {
            debug!("Send blocked in {}: NDA not signed", conv.id);
            return Err(SkipReason::NdaNotSigned);
        }
        if self.sending {
            return Err(SkipReason::InFlight);
        }
        let conversation_id = conv.id.clone();

        let (text, attachments) = self.composer.take();
        let message = Message {
            id: new_id(),
            sender: Sender::User(self.user.id.clone()),
            content: text.trim().to_string(),
            attachments,
            timestamp: Utc::now(),
            status: DeliveryStatus::Sending,
            read: false,
            embed: None,
        };
        self.append_message(&conversation_id, message.clone())
            .map_err(|_| SkipReason::NoActiveConversation)?;
        self.sending = true;
        Ok(PendingSend { conversation_id, message })
    }

    /// Reconcile an optimistic message with the backend result, by id.
    pub fn finish_send(&mut self, pending: PendingSend, result: error::Result<Message>) -> SendOutcome {
        self.sending = false;
        let id = pending.message.id;
        match result {
            Ok(mut confirmed) => {
                confirmed.id = id.clone();
                confirmed.status = DeliveryStatus::Sent;
                let at = confirmed.timestamp;
                let self_id = self.user.id.clone();
                if let Some(conv) = self.conversation_mut(&pending.conversation_id) {
                    if let Some(local) = conv.message_mut(&id) {
                        *local = confirmed;
                    }
                    conv.recount_unread(&self_id);
                }
                self.note_activity(&pending.conversation_id, at);
                info!("Message {} sent to {}", id, pending.conversation_id);
                SendOutcome::Sent(id)
            }
            Err(e) => {
                warn!("Message {} to {} failed: {}", id, pending.conversation_id, e);
                self.set_status(&pending.conversation_id, &id, DeliveryStatus::Failed);
                SendOutcome::Failed(id)
            }
        }
    }

    /// Resend a `Failed` message under its original id.
    pub async fn retry(&mut self, conversation_id: &str, message_id: &str) -> SendOutcome {
        let pending = match self.begin_retry(conversation_id, message_id) {
            Ok(p) => p,
            Err(reason) => return SendOutcome::Skipped(reason),
        };
        let result = self.backend.post_message(&pending.conversation_id, &pending.message).await;
        self.finish_send(pending, result)
    }

    pub fn begin_retry(&mut self, conversation_id: &str, message_id: &str) -> Result<PendingSend, SkipReason> {
        if self.sending {
            return Err(SkipReason::InFlight);
        }
        let conv = self.conversation_mut(conversation_id).ok_or(SkipReason::NoActiveConversation)?;
        if !conv.nda_signed {
            return Err(SkipReason::NdaNotSigned);
        }
        let msg = conv.message_mut(message_id).ok_or(SkipReason::UnknownMessage)?;
        if msg.status != DeliveryStatus::Failed {
            return Err(SkipReason::NotRetryable);
        }
        msg.status = DeliveryStatus::Sending;
        let message = msg.clone();
        self.sending = true;
        Ok(PendingSend { conversation_id: conversation_id.to_string(), message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Attachment;
    use crate::testing::{FakeBackend, me, summary};
    use std::sync::Arc;

    async fn ready(nda_signed: bool) -> (Arc<FakeBackend>, Inbox) {
        let backend = Arc::new(FakeBackend::with_summaries(vec![summary("c1", nda_signed, Vec::new())]));
        let mut inbox = Inbox::new(backend.clone(), me());
        inbox.load().await.unwrap();
        inbox.select("c1").await.unwrap();
        (backend, inbox)
    }

    fn count_with_id(inbox: &Inbox, id: &str) -> usize {
        inbox.active().unwrap().messages.iter().filter(|m| m.id == id).count()
    }

    #[tokio::test]
    async fn unsigned_nda_leaves_messages_and_buffer_untouched() {
        let (backend, mut inbox) = ready(false).await;
        inbox.composer_mut().set_text("hello");

        assert_eq!(inbox.send().await, SendOutcome::Skipped(SkipReason::NdaNotSigned));
        assert!(inbox.active().unwrap().messages.is_empty());
        assert_eq!(inbox.composer().text(), "hello");
        assert!(backend.posted_ids().is_empty());
    }

    #[tokio::test]
    async fn empty_buffer_or_no_active_conversation_is_a_no_op() {
        let (_, mut inbox) = ready(true).await;
        assert_eq!(inbox.send().await, SendOutcome::Skipped(SkipReason::Empty));

        let backend = Arc::new(FakeBackend::default());
        let mut idle = Inbox::new(backend, me());
        idle.composer_mut().set_text("hello");
        assert_eq!(idle.send().await, SendOutcome::Skipped(SkipReason::NoActiveConversation));
    }

    #[tokio::test]
    async fn successful_send_leaves_one_sent_copy() {
        let (backend, mut inbox) = ready(true).await;
        inbox.composer_mut().set_text("  Here is our traction update ");

        let SendOutcome::Sent(id) = inbox.send().await else { panic!("expected send") };
        assert_eq!(count_with_id(&inbox, &id), 1);
        let msg = inbox.active().unwrap().message(&id).unwrap();
        assert_eq!(msg.status, DeliveryStatus::Sent);
        assert_eq!(msg.content, "Here is our traction update");
        assert!(inbox.composer().is_empty());
        assert!(!inbox.is_sending());
        assert_eq!(backend.posted_ids(), vec![id]);
    }

    #[tokio::test]
    async fn optimistic_message_is_visible_while_in_flight() {
        let (_, mut inbox) = ready(true).await;
        inbox.composer_mut().set_text("first");
        let pending = inbox.begin_send().unwrap();

        let msg = inbox.active().unwrap().message(&pending.message.id).unwrap();
        assert_eq!(msg.status, DeliveryStatus::Sending);
        assert!(inbox.composer().is_empty());

        inbox.composer_mut().set_text("second");
        assert_eq!(inbox.begin_send().unwrap_err(), SkipReason::InFlight);
        assert_eq!(inbox.composer().text(), "second");

        let confirmed = pending.message.clone();
        assert!(matches!(inbox.finish_send(pending, Ok(confirmed)), SendOutcome::Sent(_)));
        assert!(inbox.begin_send().is_ok());
    }

    #[tokio::test]
    async fn confirmed_timestamp_updates_activity_and_order() {
        let backend = Arc::new(FakeBackend::with_summaries(vec![summary("c1", true, Vec::new()), summary("c2", true, Vec::new())]));
        let mut inbox = Inbox::new(backend, me());
        inbox.load().await.unwrap();
        inbox.select("c1").await.unwrap();
        inbox.composer_mut().set_text("Following up on the round");
        let pending = inbox.begin_send().unwrap();

        // Another conversation gets newer activity while the post is in flight.
        let busy_at = pending.message.timestamp + chrono::Duration::seconds(5);
        inbox.note_activity("c2", busy_at);
        assert_eq!(inbox.conversations()[0].id, "c2");

        let mut confirmed = pending.message.clone();
        confirmed.timestamp = busy_at + chrono::Duration::seconds(5);
        let at = confirmed.timestamp;
        assert!(matches!(inbox.finish_send(pending, Ok(confirmed)), SendOutcome::Sent(_)));

        assert_eq!(inbox.conversations()[0].id, "c1");
        assert_eq!(inbox.conversation("c1").unwrap().last_message_at, Some(at));
    }

    #[tokio::test]
    async fn failed_send_is_kept_and_retry_reuses_the_id() {
        let (backend, mut inbox) = ready(true).await;
        backend.set_fail_writes(true);
        inbox.composer_mut().set_text("term sheet attached");

        let SendOutcome::Failed(id) = inbox.send().await else { panic!("expected failure") };
        assert_eq!(count_with_id(&inbox, &id), 1);
        assert_eq!(inbox.active().unwrap().message(&id).unwrap().status, DeliveryStatus::Failed);

        let pending = inbox.begin_retry("c1", &id).unwrap();
        assert_eq!(inbox.begin_retry("c1", &id).unwrap_err(), SkipReason::InFlight);
        assert_eq!(count_with_id(&inbox, &id), 1);

        backend.set_fail_writes(false);
        let result = crate::api::Backend::post_message(backend.as_ref(), "c1", &pending.message).await;
        assert_eq!(inbox.finish_send(pending, result), SendOutcome::Sent(id.clone()));
        assert_eq!(count_with_id(&inbox, &id), 1);
        assert_eq!(inbox.active().unwrap().message(&id).unwrap().status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn only_failed_messages_can_be_retried() {
        let (_, mut inbox) = ready(true).await;
        inbox.composer_mut().set_text("ok");
        let SendOutcome::Sent(id) = inbox.send().await else { panic!("expected send") };
        assert_eq!(inbox.retry("c1", &id).await, SendOutcome::Skipped(SkipReason::NotRetryable));
        assert_eq!(inbox.retry("c1", "missing").await, SendOutcome::Skipped(SkipReason::UnknownMessage));
    }

    #[tokio::test]
    async fn attachments_travel_with_the_message() {
        let (_, mut inbox) = ready(true).await;
        let deck = Attachment {
            id: "a1".into(),
            name: "deck.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 1024,
            url: "https://files.pitchlink.io/a1".into(),
        };
        inbox.composer_mut().add_attachment(deck.clone()).unwrap();

        let SendOutcome::Sent(id) = inbox.send().await else { panic!("expected send") };
        let msg = inbox.active().unwrap().message(&id).unwrap();
        assert_eq!(msg.attachments, vec![deck]);
        assert_eq!(msg.content, "");
    }
}
