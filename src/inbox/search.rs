use super::Inbox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchHit {
    /// The participant name or project title matched.
    Conversation { conversation_id: String },
    Message { conversation_id: String, message_id: String },
}

impl Inbox {
    /// Case-insensitive search over participants, projects, message text and
    /// attachment names, in conversation list order.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let matches = |s: &str| s.to_lowercase().contains(&needle);

        let mut hits = Vec::new();
        for conv in &self.conversations {
            if matches(&conv.participant.name) || matches(&conv.project.title) {
                hits.push(SearchHit::Conversation { conversation_id: conv.id.clone() });
            }
            for msg in &conv.messages {
                if matches(&msg.content) || msg.attachments.iter().any(|a| matches(&a.name)) {
                    hits.push(SearchHit::Message { conversation_id: conv.id.clone(), message_id: msg.id.clone() });
                }
            }
        }
        hits
    }
}
