/// Transport seam between the router and live socket sessions.
///
/// The router only ever sees `Transport`; the production implementation is
/// `SessionHub`, which keeps one unbounded channel per session actor. Pushing
/// into the channel never blocks, so emission is fire-and-forget.
use crate::registry::ConnectionId;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Sender half owned by the hub for one session
pub type SessionSender = UnboundedSender<String>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is not (or no longer) attached to the transport
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// The session's receiving side has gone away
    #[error("connection closed: {0}")]
    ConnectionClosed(ConnectionId),
}

#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Queue one text frame for a connection.
    fn emit(&self, id: ConnectionId, frame: &str) -> Result<(), TransportError>;

    /// Every connection currently attached, registered or not.
    fn connections(&self) -> Vec<ConnectionId>;
}

#[derive(Debug, Default)]
pub struct SessionHub {
    sessions: RwLock<HashMap<ConnectionId, SessionSender>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session and hand back the receiving side of its channel.
    ///
    /// Re-attaching an id replaces (and closes) the previous channel.
    pub fn attach(&self, id: ConnectionId) -> UnboundedReceiver<String> {
        let (tx, rx) = unbounded_channel();
        let previous = self.sessions.write().insert(id, tx);
        if previous.is_some() {
            tracing::warn!(connection_id = %id, "Session re-attached, previous channel dropped");
        }
        rx
    }

    /// Detach a session. Returns `false` if it was not attached.
    pub fn detach(&self, id: ConnectionId) -> bool {
        self.sessions.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Transport for SessionHub {
    fn emit(&self, id: ConnectionId, frame: &str) -> Result<(), TransportError> {
        let sessions = self.sessions.read();
        let sender = sessions
            .get(&id)
            .ok_or(TransportError::UnknownConnection(id))?;
        sender
            .send(frame.to_string())
            .map_err(|_| TransportError::ConnectionClosed(id))
    }

    fn connections(&self) -> Vec<ConnectionId> {
        self.sessions.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attach_and_emit() {
        let hub = SessionHub::new();
        let id = ConnectionId::new();
        let mut rx = hub.attach(id);

        hub.emit(id, "hello").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        assert_eq!(hub.connections(), vec![id]);
    }

    #[test]
    fn test_emit_unknown_connection() {
        let hub = SessionHub::new();
        let id = ConnectionId::new();
        assert_eq!(hub.emit(id, "x"), Err(TransportError::UnknownConnection(id)));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let hub = SessionHub::new();
        let id = ConnectionId::new();
        drop(hub.attach(id));
        assert_eq!(hub.emit(id, "x"), Err(TransportError::ConnectionClosed(id)));
    }

    #[tokio::test]
    async fn test_detach_closes_channel() {
        let hub = SessionHub::new();
        let id = ConnectionId::new();
        let mut rx = hub.attach(id);

        assert!(hub.detach(id));
        assert!(!hub.detach(id));
        assert!(hub.is_empty());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_reattach_replaces_channel() {
        let hub = SessionHub::new();
        let id = ConnectionId::new();
        let old = hub.attach(id);
        let _new = hub.attach(id);
        assert_eq!(hub.len(), 1);
        drop(old);
        assert!(hub.emit(id, "still-open").is_ok());
    }
}
