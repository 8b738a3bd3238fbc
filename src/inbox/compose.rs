use std::fmt;

use crate::api::models::Attachment;
use crate::utils::format_bytes;

/// Largest file accepted as a message attachment or shared document.
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Shown to the user when a file is refused; the compose state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentWarning {
    pub name: String,
    pub size: u64,
}

impl fmt::Display for AttachmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is {}, files must be {} or smaller",
            self.name,
            format_bytes(self.size),
            format_bytes(MAX_ATTACHMENT_BYTES)
        )
    }
}

/// Compose buffer: draft text plus the attachments queued for the next send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composer {
    text: String,
    attachments: Vec<Attachment>,
}

impl Composer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> Result<(), AttachmentWarning> {
        if attachment.size > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentWarning { name: attachment.name, size: attachment.size });
        }
        self.attachments.push(attachment);
        Ok(())
    }

    pub fn remove_attachment(&mut self, id: &str) -> Option<Attachment> {
        let idx = self.attachments.iter().position(|a| a.id == id)?;
        Some(self.attachments.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.attachments.clear();
    }

    /// Empty the buffer, handing back what it held.
    pub(crate) fn take(&mut self) -> (String, Vec<Attachment>) {
        (std::mem::take(&mut self.text), std::mem::take(&mut self.attachments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, size: u64) -> Attachment {
        Attachment {
            id: id.into(),
            name: format!("{}.pdf", id),
            mime_type: "application/pdf".into(),
            size,
            url: format!("https://files.pitchlink.io/{}", id),
        }
    }

    #[test]
    fn oversized_files_never_enter_the_set() {
        let mut composer = Composer::default();
        composer.add_attachment(file("deck", 2 * 1024 * 1024)).unwrap();
        let warning = composer.add_attachment(file("video", MAX_ATTACHMENT_BYTES + 1)).unwrap_err();

        assert_eq!(warning.name, "video.pdf");
        assert!(warning.to_string().contains("10.0 MB"));
        let ids: Vec<_> = composer.attachments().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["deck"]);
    }

    #[test]
    fn exactly_ten_megabytes_is_accepted() {
        let mut composer = Composer::default();
        assert!(composer.add_attachment(file("edge", MAX_ATTACHMENT_BYTES)).is_ok());
    }

    #[test]
    fn whitespace_only_text_counts_as_empty() {
        let mut composer = Composer::default();
        composer.set_text("   \n");
        assert!(composer.is_empty());
        composer.add_attachment(file("deck", 10)).unwrap();
        assert!(!composer.is_empty());
        assert!(composer.remove_attachment("deck").is_some());
        assert!(composer.is_empty());
    }
}
