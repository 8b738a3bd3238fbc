use futures_util::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use url::Url;

use crate::api::models::{ConversationPatch, Message};
use crate::error::Result;

/// Raw frame pushed by the server: `{ "type": "...", "data": { ... } }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IncomingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Typing { conversation_id: String, user_id: String, active: bool },
    MessageCreated { conversation_id: String, message: Message },
    ConversationUpdated { conversation_id: String, patch: ConversationPatch },
    /// Read receipt: `reader_id` has read everything in the conversation.
    MessagesRead { conversation_id: String, reader_id: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingData {
    conversation_id: String,
    user_id: String,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageData {
    conversation_id: String,
    message: Message,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    conversation_id: String,
    #[serde(flatten)]
    patch: ConversationPatch,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadData {
    conversation_id: String,
    reader_id: String,
}

fn default_true() -> bool {
    true
}

impl IncomingEvent {
    /// Decode into a typed event. Unknown event types yield `Ok(None)`.
    pub fn into_event(self) -> serde_json::Result<Option<ServerEvent>> {
        let event = match self.event_type.as_str() {
            "typing" => {
                let d: TypingData = serde_json::from_value(self.data)?;
                ServerEvent::Typing { conversation_id: d.conversation_id, user_id: d.user_id, active: d.active }
            }
            "messageCreated" => {
                let d: MessageData = serde_json::from_value(self.data)?;
                ServerEvent::MessageCreated { conversation_id: d.conversation_id, message: d.message }
            }
            "conversationUpdated" => {
                let d: UpdateData = serde_json::from_value(self.data)?;
                ServerEvent::ConversationUpdated { conversation_id: d.conversation_id, patch: d.patch }
            }
            "messagesRead" => {
                let d: ReadData = serde_json::from_value(self.data)?;
                ServerEvent::MessagesRead { conversation_id: d.conversation_id, reader_id: d.reader_id }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

pub fn decode_frame(text: &str) -> serde_json::Result<Option<ServerEvent>> {
    serde_json::from_str::<IncomingEvent>(text)?.into_event()
}

/// Follow the server's event socket, forwarding decoded events until the
/// socket closes or the receiver is dropped.
pub async fn listen(ws_url: &str, token: Option<&str>, events: UnboundedSender<ServerEvent>) -> Result<()> {
    let url = Url::parse(ws_url)?;
    let mut request = url.as_str().into_client_request()?;
    if let Some(t) = token {
        if let Ok(value) = format!("Bearer {}", t).parse() {
            request.headers_mut().insert("Authorization", value);
        }
    }
    let (mut ws_stream, _) = connect_async(request).await?;
    info!("Event socket connected to {}", url);

    while let Some(frame) = ws_stream.next().await {
        let text = match frame? {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        match decode_frame(&text) {
            Ok(Some(event)) => {
                if events.send(event).is_err() {
                    debug!("Event receiver dropped, closing socket");
                    break;
                }
            }
            Ok(None) => debug!("Ignoring unknown event: {}", text),
            Err(e) => warn!("Malformed event frame: {}", e),
        }
    }
    info!("Event socket closed");
    Ok(())
}
