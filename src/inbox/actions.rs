//! Meeting scheduling and document sharing. Both validate locally, append a
//! system message embedding the new object, then persist without rollback.

use chrono::{DateTime, Utc};
use log::{info, warn};

use super::Inbox;
use super::compose::MAX_ATTACHMENT_BYTES;
use crate::api::models::{DocumentStatus, Embed, Meeting, MeetingStatus, Message, SharedDocument};
use crate::error::ValidationError;
use crate::utils::new_id;

pub const DEFAULT_MEETING_MINUTES: u32 = 30;

#[derive(Debug, Clone, Default)]
pub struct MeetingDraft {
    pub title: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub agenda: String,
    /// Generated from the meeting id when absent.
    pub link: Option<String>,
}

/// A file already uploaded to storage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentDraft {
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct SharedOutcome {
    pub document: SharedDocument,
    /// Set when the NDA was not signed at share time.
    pub unprotected_warning: Option<String>,
}

impl Inbox {
    pub async fn schedule_meeting(&mut self, conversation_id: &str, draft: MeetingDraft) -> Result<Meeting, ValidationError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let scheduled_at = draft.scheduled_at.ok_or(ValidationError::MissingSchedule)?;
        if self.conversation(conversation_id).is_none() {
            return Err(ValidationError::ConversationNotFound(conversation_id.to_string()));
        }

        let id = new_id();
        let meeting = Meeting {
            link: draft.link.unwrap_or_else(|| format!("{}/{}", self.meeting_base_url, id)),
            id,
            conversation_id: conversation_id.to_string(),
            title: title.to_string(),
            scheduled_at,
            duration_minutes: draft.duration_minutes.unwrap_or(DEFAULT_MEETING_MINUTES),
            agenda: draft.agenda.trim().to_string(),
            status: MeetingStatus::Scheduled,
        };
        let notice = Message::system(
            new_id(),
            format!(
                "{} scheduled \"{}\" for {}",
                self.user.name,
                meeting.title,
                scheduled_at.format("%Y-%m-%d %H:%M UTC")
            ),
            Some(Embed::Meeting(meeting.clone())),
        );

        if let Some(conv) = self.conversation_mut(conversation_id) {
            conv.meetings.push(meeting.clone());
        }
        self.append_message(conversation_id, notice.clone())
            .map_err(|_| ValidationError::ConversationNotFound(conversation_id.to_string()))?;
        info!("Scheduled meeting {} in {}", meeting.id, conversation_id);

        if let Err(e) = self.backend.post_meeting(conversation_id, &meeting).await {
            warn!("Failed to save meeting {}: {}", meeting.id, e);
        }
        if let Err(e) = self.backend.post_message(conversation_id, &notice).await {
            warn!("Failed to post meeting notice for {}: {}", conversation_id, e);
        }
        Ok(meeting)
    }

    pub async fn share_document(&mut self, conversation_id: &str, draft: DocumentDraft) -> Result<SharedOutcome, ValidationError> {
        let file = draft.file.ok_or(ValidationError::MissingFile)?;
        if file.size > MAX_ATTACHMENT_BYTES {
            return Err(ValidationError::FileTooLarge { name: file.name, size: file.size, limit: MAX_ATTACHMENT_BYTES });
        }
        let protected = match self.conversation(conversation_id) {
            Some(conv) => conv.nda_signed,
            None => return Err(ValidationError::ConversationNotFound(conversation_id.to_string())),
        };

        let document = SharedDocument {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            name: file.name,
            mime_type: file.mime_type,
            size: file.size,
            url: file.url,
            uploaded_by: self.user.id.clone(),
            status: DocumentStatus::Shared,
            nda_protected: protected,
        };
        let unprotected_warning = (!protected)
            .then(|| format!("{} was shared before the NDA was signed and is not covered by it", document.name));
        let notice = Message::system(
            new_id(),
            format!("{} shared {}", self.user.name, document.name),
            Some(Embed::Document(document.clone())),
        );

        if let Some(conv) = self.conversation_mut(conversation_id) {
            conv.documents.push(document.clone());
        }
        self.append_message(conversation_id, notice.clone())
            .map_err(|_| ValidationError::ConversationNotFound(conversation_id.to_string()))?;
        info!("Shared document {} in {}", document.id, conversation_id);

        if let Err(e) = self.backend.post_document(conversation_id, &document).await {
            warn!("Failed to save document {}: {}", document.id, e);
        }
        if let Err(e) = self.backend.post_message(conversation_id, &notice).await {
            warn!("Failed to post document notice for {}: {}", conversation_id, e);
        }
        Ok(SharedOutcome { document, unprotected_warning })
    }
}
