/// Message router
///
/// Resolves delivery requests (one user, one room, everyone) against the
/// connection registry and emits the event frame through the transport.
///
/// Delivery is at-most-once and best-effort:
/// 1. No waiting for client acknowledgement
/// 2. No retries
/// 3. A failed emission to one connection is logged and skipped; the
///    remaining targets are still attempted
use crate::metrics;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::websocket::transport::Transport;
use crate::websocket::ServerEvent;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct Router {
    registry: Arc<ConnectionRegistry>,
    transport: Arc<dyn Transport>,
}

impl Router {
    pub fn new(registry: Arc<ConnectionRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Emit to every live connection of `user_id`.
    ///
    /// Returns `true` if at least one connection accepted the frame. A user
    /// with no live connections yields `false` without touching the transport.
    pub fn deliver_to_user(&self, user_id: &str, event: &ServerEvent) -> bool {
        let handles = self.registry.resolve_user(user_id);
        if handles.is_empty() {
            debug!(user_id = %user_id, event = event.name(), "User not connected");
            metrics::record_delivery("user", false);
            return false;
        }

        let sent = self.emit_to(handles, event);
        let delivered = sent > 0;
        metrics::record_delivery("user", delivered);
        debug!(user_id = %user_id, event = event.name(), sent, "Delivered to user");
        delivered
    }

    /// Emit to every member of `room`. An empty or unknown room is a no-op.
    ///
    /// Returns the number of connections that accepted the frame.
    pub fn deliver_to_room(&self, room: &str, event: &ServerEvent) -> usize {
        let members = self.registry.resolve_room(room);
        let sent = self.emit_to(members, event);
        metrics::record_delivery("room", sent > 0);
        debug!(room = %room, event = event.name(), sent, "Delivered to room");
        sent
    }

    /// Same as `deliver_to_room` but skips `except`.
    pub fn deliver_to_room_except(
        &self,
        room: &str,
        except: ConnectionId,
        event: &ServerEvent,
    ) -> usize {
        let mut members = self.registry.resolve_room(room);
        members.remove(&except);
        let sent = self.emit_to(members, event);
        metrics::record_delivery("room", sent > 0);
        debug!(room = %room, except = %except, event = event.name(), sent, "Delivered to room");
        sent
    }

    /// Emit to every connection the transport knows about, registered or not.
    pub fn deliver_to_all(&self, event: &ServerEvent) -> usize {
        let targets = self.transport.connections();
        let sent = self.emit_to(targets, event);
        metrics::record_delivery("all", sent > 0);
        debug!(event = event.name(), sent, "Broadcast delivered");
        sent
    }

    fn emit_to<I>(&self, targets: I, event: &ServerEvent) -> usize
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let mut targets = targets.into_iter().peekable();
        if targets.peek().is_none() {
            return 0;
        }

        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(event = event.name(), error = %e, "Failed to encode event frame");
                return 0;
            }
        };

        let mut sent = 0;
        for id in targets {
            match self.transport.emit(id, &frame) {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(connection_id = %id, event = event.name(), error = %e, "Transport write failed");
                    metrics::record_transport_failure();
                }
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Notification, NotificationType};
    use crate::websocket::transport::{MockTransport, SessionHub, TransportError};
    use mockall::predicate::eq;
    use std::collections::HashSet;

    fn notification() -> ServerEvent {
        ServerEvent::Notification(Notification::new(NotificationType::Info, "Hello", "World"))
    }

    fn live(registry: &ConnectionRegistry) -> ConnectionId {
        let id = ConnectionId::new();
        registry.connect(id);
        id
    }

    #[tokio::test]
    async fn test_fan_out_to_every_device() {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(SessionHub::new());
        let h1 = live(&registry);
        let h2 = live(&registry);
        let mut rx1 = hub.attach(h1);
        let mut rx2 = hub.attach(h2);
        registry.register(h1, "alice");
        registry.register(h2, "alice");

        let router = Router::new(registry, hub);
        assert!(router.deliver_to_user("alice", &notification()));

        for rx in [&mut rx1, &mut rx2] {
            let frame = rx.recv().await.expect("frame");
            let event = ServerEvent::from_frame(&frame).unwrap();
            assert_eq!(event.name(), "notification");
        }
    }

    #[test]
    fn test_unknown_user_makes_no_transport_call() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut transport = MockTransport::new();
        transport.expect_emit().never();
        transport.expect_connections().never();

        let router = Router::new(registry, Arc::new(transport));
        assert!(!router.deliver_to_user("bob", &notification()));
    }

    #[test]
    fn test_one_failed_handle_does_not_flip_result() {
        let registry = Arc::new(ConnectionRegistry::new());
        let good = live(&registry);
        let bad = live(&registry);
        registry.register(good, "alice");
        registry.register(bad, "alice");

        let mut transport = MockTransport::new();
        transport
            .expect_emit()
            .with(eq(bad), mockall::predicate::always())
            .times(1)
            .returning(move |id, _| Err(TransportError::ConnectionClosed(id)));
        transport
            .expect_emit()
            .with(eq(good), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));

        let router = Router::new(registry, Arc::new(transport));
        assert!(router.deliver_to_user("alice", &notification()));
    }

    #[test]
    fn test_all_handles_failing_reports_undelivered() {
        let registry = Arc::new(ConnectionRegistry::new());
        let h1 = live(&registry);
        registry.register(h1, "alice");

        let mut transport = MockTransport::new();
        transport
            .expect_emit()
            .times(1)
            .returning(|id, _| Err(TransportError::UnknownConnection(id)));

        let router = Router::new(registry, Arc::new(transport));
        assert!(!router.deliver_to_user("alice", &notification()));
    }

    #[test]
    fn test_disconnected_user_not_delivered() {
        let registry = Arc::new(ConnectionRegistry::new());
        let h1 = live(&registry);
        registry.register(h1, "alice");
        registry.on_disconnect(h1);

        let mut transport = MockTransport::new();
        transport.expect_emit().never();

        let router = Router::new(registry, Arc::new(transport));
        assert!(!router.deliver_to_user("alice", &notification()));
    }

    #[test]
    fn test_room_delivery_targets_members_only() {
        let registry = Arc::new(ConnectionRegistry::new());
        let member = live(&registry);
        let outsider = live(&registry);
        registry.register(member, "alice");
        registry.register(outsider, "bob");
        registry.join_room(member, "team");

        let mut transport = MockTransport::new();
        transport
            .expect_emit()
            .with(eq(member), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));
        transport
            .expect_emit()
            .with(eq(outsider), mockall::predicate::always())
            .never();

        let router = Router::new(registry, Arc::new(transport));
        assert_eq!(router.deliver_to_room("team", &notification()), 1);
    }

    #[test]
    fn test_unknown_room_is_silent_noop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut transport = MockTransport::new();
        transport.expect_emit().never();

        let router = Router::new(registry, Arc::new(transport));
        assert_eq!(router.deliver_to_room("ghost-room", &notification()), 0);
    }

    #[test]
    fn test_room_delivery_except_sender() {
        let registry = Arc::new(ConnectionRegistry::new());
        let sender = live(&registry);
        let other = live(&registry);
        registry.join_room(sender, "team");
        registry.join_room(other, "team");

        let mut transport = MockTransport::new();
        transport
            .expect_emit()
            .with(eq(other), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));

        let router = Router::new(registry, Arc::new(transport));
        let event = ServerEvent::UserJoined {
            user_id: None,
            room: "team".into(),
        };
        assert_eq!(router.deliver_to_room_except("team", sender, &event), 1);
    }

    #[test]
    fn test_broadcast_uses_transport_connections() {
        let registry = Arc::new(ConnectionRegistry::new());
        let unregistered: Vec<ConnectionId> = (0..3).map(|_| ConnectionId::new()).collect();
        let expected: HashSet<ConnectionId> = unregistered.iter().copied().collect();

        let mut transport = MockTransport::new();
        let targets = unregistered.clone();
        transport
            .expect_connections()
            .times(1)
            .returning(move || targets.clone());
        transport
            .expect_emit()
            .withf(move |id, _| expected.contains(id))
            .times(3)
            .returning(|_, _| Ok(()));

        let router = Router::new(registry, Arc::new(transport));
        assert_eq!(router.deliver_to_all(&notification()), 3);
    }
}
