//! Realtime messaging: conversation rooms over WebSocket.
//!
//! The gateway only relays. Messages are persisted through the REST chat
//! endpoint, never through this channel.

mod gateway;
pub mod ws;

pub use gateway::{ConnectionId, Gateway, GatewayError, OUTBOX_CAPACITY};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent by clients, `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Conversation id to join
    JoinRoom(String),
    SendMessage(OutgoingMessage),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub conversation_id: String,
    /// Relayed to the room unchanged
    pub message: Value,
}

/// Frames pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ReceiveMessage(Value),
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_frames() {
        let join: ClientEvent =
            serde_json::from_value(json!({"event": "joinRoom", "data": "c1"})).unwrap();
        assert_eq!(join, ClientEvent::JoinRoom("c1".into()));

        let send: ClientEvent = serde_json::from_value(json!({
            "event": "sendMessage",
            "data": {"conversationId": "c1", "message": {"text": "hi"}}
        }))
        .unwrap();
        assert_eq!(
            send,
            ClientEvent::SendMessage(OutgoingMessage {
                conversation_id: "c1".into(),
                message: json!({"text": "hi"}),
            })
        );
    }

    #[test]
    fn server_frames_use_event_envelope() {
        let frame = serde_json::to_value(ServerEvent::ReceiveMessage(json!("hello"))).unwrap();
        assert_eq!(frame, json!({"event": "receiveMessage", "data": "hello"}));

        let frame = serde_json::to_value(ServerEvent::error("bad frame")).unwrap();
        assert_eq!(frame, json!({"event": "error", "data": {"message": "bad frame"}}));
    }
}
