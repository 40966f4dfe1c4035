/// Wire events exchanged with socket clients.
///
/// Every frame is a JSON text message shaped `{"event": <name>, "data": {..}}`.
use crate::models::Notification;
use crate::registry::ConnectionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default `type` of a client broadcast
pub const DEFAULT_BROADCAST_TYPE: &str = "info";

/// Server-to-client events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// First frame on every new connection
    Welcome {
        message: String,
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },

    /// Producer notification
    Notification(Notification),

    /// Direct chat message
    NewMessage {
        from: Option<String>,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Chat broadcast to every connection
    BroadcastMessage {
        from: Option<String>,
        message: String,
        #[serde(rename = "type")]
        message_type: String,
        timestamp: DateTime<Utc>,
    },

    /// Chat message scoped to a room
    RoomMessage {
        room: String,
        from: Option<String>,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Another connection joined a room this connection is in
    UserJoined {
        #[serde(rename = "userId")]
        user_id: Option<String>,
        room: String,
    },

    /// Another connection left a room this connection is in
    UserLeft {
        #[serde(rename = "userId")]
        user_id: Option<String>,
        room: String,
    },

    // Acknowledgements, sent back to the originating connection only
    Registered {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
        message: String,
    },

    MessageSent {
        success: bool,
        message: String,
    },

    MessageError {
        success: bool,
        message: String,
    },

    BroadcastSent {
        success: bool,
        recipients: usize,
    },

    JoinedRoom {
        room: String,
        message: String,
    },

    LeftRoom {
        room: String,
        message: String,
    },

    RoomMessageSent {
        success: bool,
        room: String,
    },

    /// Rejected inbound frame
    Error {
        code: String,
        message: String,
    },
}

impl ServerEvent {
    pub fn welcome(connection_id: ConnectionId) -> Self {
        ServerEvent::Welcome {
            message: "Connection established".to_string(),
            connection_id,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Welcome { .. } => "welcome",
            ServerEvent::Notification(_) => "notification",
            ServerEvent::NewMessage { .. } => "newMessage",
            ServerEvent::BroadcastMessage { .. } => "broadcastMessage",
            ServerEvent::RoomMessage { .. } => "roomMessage",
            ServerEvent::UserJoined { .. } => "userJoined",
            ServerEvent::UserLeft { .. } => "userLeft",
            ServerEvent::Registered { .. } => "registered",
            ServerEvent::MessageSent { .. } => "messageSent",
            ServerEvent::MessageError { .. } => "messageError",
            ServerEvent::BroadcastSent { .. } => "broadcastSent",
            ServerEvent::JoinedRoom { .. } => "joinedRoom",
            ServerEvent::LeftRoom { .. } => "leftRoom",
            ServerEvent::RoomMessageSent { .. } => "roomMessageSent",
            ServerEvent::Error { .. } => "error",
        }
    }

    /// Serialize to a text frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Raw inbound frame, payload decoded later by the event's handler
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
}

/// Payload of `joinRoom` and `leaveRoom`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoomPayload {
    #[validate(length(min = 1, message = "room is required"))]
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessagePayload {
    #[validate(length(min = 1, message = "recipient is required"))]
    pub to: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BroadcastPayload {
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoomMessagePayload {
    #[validate(length(min = 1, message = "room is required"))]
    pub room: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}
