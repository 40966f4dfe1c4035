/// Inbound frame dispatch
///
/// Maps a wire event name to its handler. Each handler decodes and
/// validates its own payload, applies the registry change or routes the
/// message, and returns the acknowledgement for the sending connection.
/// Rejected frames become an `error` event instead of reaching the core.
use super::messages::{
    BroadcastPayload, InboundFrame, RegisterPayload, RoomMessagePayload, RoomPayload,
    SendMessagePayload, ServerEvent, DEFAULT_BROADCAST_TYPE,
};
use crate::error::AppError;
use crate::models::{DeliveryStatus, MessageKind, MessageRecord};
use crate::registry::ConnectionId;
use crate::state::RelayState;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, info};
use validator::Validate;

pub type EventHandler =
    fn(&RelayState, ConnectionId, serde_json::Value) -> Result<ServerEvent, AppError>;

pub struct Dispatcher {
    handlers: HashMap<&'static str, EventHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, EventHandler> = HashMap::new();
        handlers.insert("register", handle_register);
        handlers.insert("joinRoom", handle_join_room);
        handlers.insert("leaveRoom", handle_leave_room);
        handlers.insert("sendMessage", handle_send_message);
        handlers.insert("broadcast", handle_broadcast);
        handlers.insert("roomMessage", handle_room_message);
        Self { handlers }
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Decode one text frame and run its handler.
    pub fn dispatch(&self, state: &RelayState, id: ConnectionId, text: &str) -> ServerEvent {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(connection_id = %id, error = %e, "Malformed frame");
                return ServerEvent::error("INVALID_FRAME", e.to_string());
            }
        };

        let Some(handler) = self.handlers.get(frame.event.as_str()) else {
            debug!(connection_id = %id, event = %frame.event, "Unknown event");
            return ServerEvent::error("UNKNOWN_EVENT", format!("unknown event: {}", frame.event));
        };

        match handler(state, id, frame.data) {
            Ok(ack) => ack,
            Err(e) => {
                debug!(connection_id = %id, event = %frame.event, error = %e, "Frame rejected");
                ServerEvent::error(e.code(), e.to_string())
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn parse<T>(data: serde_json::Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(data)?;
    payload.validate()?;
    Ok(payload)
}

fn handle_register(
    state: &RelayState,
    id: ConnectionId,
    data: serde_json::Value,
) -> Result<ServerEvent, AppError> {
    let payload: RegisterPayload = parse(data)?;
    if !state.registry.register(id, &payload.user_id) {
        return Err(AppError::ConnectionClosed(id.to_string()));
    }
    info!(connection_id = %id, user_id = %payload.user_id, "User registered");

    Ok(ServerEvent::Registered {
        user_id: payload.user_id,
        connection_id: id,
        message: "User registered".to_string(),
    })
}

fn handle_join_room(
    state: &RelayState,
    id: ConnectionId,
    data: serde_json::Value,
) -> Result<ServerEvent, AppError> {
    let RoomPayload { room } = parse(data)?;
    if !state.registry.join_room(id, &room) {
        return Err(AppError::ConnectionClosed(id.to_string()));
    }
    info!(connection_id = %id, room = %room, "Joined room");

    let notice = ServerEvent::UserJoined {
        user_id: state.registry.user_of(id),
        room: room.clone(),
    };
    state.router.deliver_to_room_except(&room, id, &notice);

    Ok(ServerEvent::JoinedRoom {
        room,
        message: "You joined the room".to_string(),
    })
}

fn handle_leave_room(
    state: &RelayState,
    id: ConnectionId,
    data: serde_json::Value,
) -> Result<ServerEvent, AppError> {
    let RoomPayload { room } = parse(data)?;
    // leaving a room the connection is not in changes nothing
    if state.registry.leave_room(id, &room) {
        info!(connection_id = %id, room = %room, "Left room");

        let notice = ServerEvent::UserLeft {
            user_id: state.registry.user_of(id),
            room: room.clone(),
        };
        state.router.deliver_to_room_except(&room, id, &notice);
    }

    Ok(ServerEvent::LeftRoom {
        room,
        message: "You left the room".to_string(),
    })
}

fn handle_send_message(
    state: &RelayState,
    id: ConnectionId,
    data: serde_json::Value,
) -> Result<ServerEvent, AppError> {
    let payload: SendMessagePayload = parse(data)?;
    let from = payload
        .from
        .filter(|from| !from.is_empty())
        .or_else(|| state.registry.user_of(id));

    let event = ServerEvent::NewMessage {
        from: from.clone(),
        message: payload.message.clone(),
        timestamp: Utc::now(),
    };
    let delivered = state.router.deliver_to_user(&payload.to, &event);

    state.audit.message(MessageRecord {
        from_user_id: from.clone(),
        to_user_id: Some(payload.to.clone()),
        room: None,
        message: payload.message,
        kind: MessageKind::Direct,
        status: DeliveryStatus::from_delivered(delivered),
        recorded_at: Utc::now(),
    });

    if delivered {
        info!(from = ?from, to = %payload.to, "Direct message sent");
        Ok(ServerEvent::MessageSent {
            success: true,
            message: "Message sent".to_string(),
        })
    } else {
        Ok(ServerEvent::MessageError {
            success: false,
            message: "User not connected".to_string(),
        })
    }
}

fn handle_broadcast(
    state: &RelayState,
    id: ConnectionId,
    data: serde_json::Value,
) -> Result<ServerEvent, AppError> {
    let payload: BroadcastPayload = parse(data)?;
    let from = state.registry.user_of(id);

    let event = ServerEvent::BroadcastMessage {
        from: from.clone(),
        message: payload.message.clone(),
        message_type: payload
            .message_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_BROADCAST_TYPE.to_string()),
        timestamp: Utc::now(),
    };
    let recipients = state.router.deliver_to_all(&event);
    info!(from = ?from, recipients, "Broadcast sent");

    state.audit.message(MessageRecord {
        from_user_id: from,
        to_user_id: None,
        room: None,
        message: payload.message,
        kind: MessageKind::Broadcast,
        status: DeliveryStatus::from_delivered(recipients > 0),
        recorded_at: Utc::now(),
    });

    Ok(ServerEvent::BroadcastSent {
        success: true,
        recipients,
    })
}

fn handle_room_message(
    state: &RelayState,
    id: ConnectionId,
    data: serde_json::Value,
) -> Result<ServerEvent, AppError> {
    let payload: RoomMessagePayload = parse(data)?;
    let from = state.registry.user_of(id);

    let event = ServerEvent::RoomMessage {
        room: payload.room.clone(),
        from: from.clone(),
        message: payload.message.clone(),
        timestamp: Utc::now(),
    };
    let sent = state.router.deliver_to_room(&payload.room, &event);
    info!(from = ?from, room = %payload.room, recipients = sent, "Room message sent");

    state.audit.message(MessageRecord {
        from_user_id: from,
        to_user_id: None,
        room: Some(payload.room.clone()),
        message: payload.message,
        kind: MessageKind::Room,
        status: DeliveryStatus::from_delivered(sent > 0),
        recorded_at: Utc::now(),
    });

    Ok(ServerEvent::RoomMessageSent {
        success: true,
        room: payload.room,
    })
}
