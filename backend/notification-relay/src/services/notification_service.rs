/// Notification facade used by producers (upload, mail and chat flows).
///
/// Stamps the dispatch time, hands the notification to the router and
/// forwards a snapshot to the audit trail whatever the outcome. The audit
/// call runs detached, so a slow or failing sink never changes what the
/// caller is told.
use super::audit::AuditTrail;
use super::router::Router;
use crate::models::{AuditRecord, DeliveryStatus, Notification, NotificationType};
use crate::registry::ConnectionRegistry;
use crate::websocket::ServerEvent;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub struct NotificationService {
    router: Arc<Router>,
    registry: Arc<ConnectionRegistry>,
    audit: AuditTrail,
}

impl NotificationService {
    pub fn new(router: Arc<Router>, registry: Arc<ConnectionRegistry>, audit: AuditTrail) -> Self {
        Self {
            router,
            registry,
            audit,
        }
    }

    /// Send to every live connection of one user.
    ///
    /// Returns whether the notification reached at least one connection.
    pub fn send_to_user(&self, user_id: &str, mut notification: Notification) -> bool {
        notification.timestamp = Some(Utc::now());

        let delivered = self
            .router
            .deliver_to_user(user_id, &ServerEvent::Notification(notification.clone()));

        if delivered {
            info!(user_id = %user_id, title = %notification.title, "Notification sent to user");
        } else {
            warn!(user_id = %user_id, title = %notification.title, "User not connected, notification left pending");
        }

        self.record(Some(user_id), None, notification, delivered);
        delivered
    }

    /// Send to every connection that joined `room`
    pub fn send_to_room(&self, room: &str, mut notification: Notification) {
        notification.timestamp = Some(Utc::now());

        let sent = self
            .router
            .deliver_to_room(room, &ServerEvent::Notification(notification.clone()));
        info!(room = %room, title = %notification.title, recipients = sent, "Notification sent to room");

        self.record(None, Some(room), notification, sent > 0);
    }

    /// Send to every open connection
    pub fn send_to_all(&self, mut notification: Notification) {
        notification.timestamp = Some(Utc::now());

        let sent = self
            .router
            .deliver_to_all(&ServerEvent::Notification(notification.clone()));
        info!(title = %notification.title, recipients = sent, "Broadcast notification sent");

        self.record(None, None, notification, sent > 0);
    }

    pub fn notify_file_uploaded(&self, user_id: &str, file_name: &str, file_url: &str) -> bool {
        self.send_to_user(
            user_id,
            Notification::new(
                NotificationType::FileUploaded,
                "File uploaded",
                format!("The file \"{file_name}\" was uploaded successfully"),
            )
            .with_data(json!({ "fileName": file_name, "fileUrl": file_url })),
        )
    }

    pub fn notify_email_sent(&self, user_id: &str, recipient: &str, subject: &str) -> bool {
        self.send_to_user(
            user_id,
            Notification::new(
                NotificationType::EmailSent,
                "Email sent",
                format!("Email successfully sent to {recipient}"),
            )
            .with_data(json!({ "recipient": recipient, "subject": subject })),
        )
    }

    pub fn notify_message_received(&self, user_id: &str, from: &str, preview: &str) -> bool {
        self.send_to_user(
            user_id,
            Notification::new(
                NotificationType::MessageReceived,
                "New message",
                format!("Message from {from}"),
            )
            .with_data(json!({ "from": from, "preview": preview })),
        )
    }

    pub fn notify_success(&self, user_id: &str, title: &str, message: &str) -> bool {
        self.send_to_user(user_id, Notification::new(NotificationType::Success, title, message))
    }

    pub fn notify_error(&self, user_id: &str, title: &str, message: &str) -> bool {
        self.send_to_user(user_id, Notification::new(NotificationType::Error, title, message))
    }

    pub fn notify_warning(&self, user_id: &str, title: &str, message: &str) -> bool {
        self.send_to_user(user_id, Notification::new(NotificationType::Warning, title, message))
    }

    pub fn notify_info(&self, user_id: &str, title: &str, message: &str) -> bool {
        self.send_to_user(user_id, Notification::new(NotificationType::Info, title, message))
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.registry.is_connected(user_id)
    }

    pub fn connected_users(&self) -> HashSet<String> {
        self.registry.list_connected_users()
    }

    fn record(
        &self,
        user_id: Option<&str>,
        room: Option<&str>,
        mut notification: Notification,
        delivered: bool,
    ) {
        let status = DeliveryStatus::from_delivered(delivered);
        notification.status = status;
        self.audit.notification(AuditRecord {
            user_id: user_id.map(str::to_string),
            room: room.map(str::to_string),
            notification,
            status,
            recorded_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionId;
    use crate::services::audit::{AuditError, MockAuditSink};
    use crate::websocket::transport::{SessionHub, Transport};
    use std::time::Duration;
    use tokio::runtime::{Handle, Runtime};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        hub: Arc<SessionHub>,
        service: NotificationService,
        audits: UnboundedReceiver<AuditRecord>,
    }

    fn fixture(fail_audit: bool) -> Fixture {
        fixture_on(Handle::current(), fail_audit)
    }

    fn fixture_on(runtime: Handle, fail_audit: bool) -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(SessionHub::new());
        let transport: Arc<dyn Transport> = hub.clone();
        let router = Arc::new(Router::new(registry.clone(), transport));

        let (tx, audits) = mpsc::unbounded_channel();
        let mut sink = MockAuditSink::new();
        sink.expect_record_notification().returning(move |record| {
            let _ = tx.send(record);
            if fail_audit {
                Err(AuditError::Unavailable("sink offline".into()))
            } else {
                Ok(())
            }
        });

        let service = NotificationService::new(
            router,
            registry.clone(),
            AuditTrail::new(Arc::new(sink), runtime),
        );
        Fixture {
            registry,
            hub,
            service,
            audits,
        }
    }

    fn connect(f: &Fixture, user: &str) -> (ConnectionId, UnboundedReceiver<String>) {
        let id = ConnectionId::new();
        let rx = f.hub.attach(id);
        f.registry.connect(id);
        f.registry.register(id, user);
        (id, rx)
    }

    #[tokio::test]
    async fn test_send_to_user_stamps_and_audits_delivered() {
        let mut f = fixture(false);
        let (_, mut rx) = connect(&f, "alice");

        let n = Notification::new(NotificationType::Info, "Hi", "there");
        assert!(n.timestamp.is_none());
        assert!(f.service.send_to_user("alice", n));

        let frame = rx.recv().await.unwrap();
        match ServerEvent::from_frame(&frame).unwrap() {
            ServerEvent::Notification(sent) => assert!(sent.timestamp.is_some()),
            other => panic!("unexpected event {other:?}"),
        }

        let record = f.audits.recv().await.unwrap();
        assert_eq!(record.user_id.as_deref(), Some("alice"));
        assert_eq!(record.status, DeliveryStatus::Delivered);
        assert_eq!(record.notification.status, DeliveryStatus::Delivered);
        assert!(record.notification.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_offline_user_audited_as_pending() {
        let mut f = fixture(false);

        assert!(!f.service.send_to_user("bob", Notification::new(NotificationType::Warning, "a", "b")));

        let record = f.audits.recv().await.unwrap();
        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.user_id.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_result() {
        let mut f = fixture(true);
        let (_, _rx) = connect(&f, "alice");

        assert!(f.service.notify_success("alice", "Saved", "All good"));
        assert!(f.audits.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_room_and_broadcast_are_audited_without_user() {
        let mut f = fixture(false);
        let (id, mut rx) = connect(&f, "alice");
        f.registry.join_room(id, "team");

        f.service
            .send_to_room("team", Notification::new(NotificationType::Info, "Room", "msg"));
        let room_record = f.audits.recv().await.unwrap();
        assert_eq!(room_record.room.as_deref(), Some("team"));
        assert!(room_record.user_id.is_none());
        assert_eq!(room_record.status, DeliveryStatus::Delivered);

        f.service
            .send_to_room("ghost-room", Notification::new(NotificationType::Info, "x", "y"));
        assert_eq!(f.audits.recv().await.unwrap().status, DeliveryStatus::Pending);

        f.service
            .send_to_all(Notification::new(NotificationType::Info, "All", "msg"));
        let all_record = f.audits.recv().await.unwrap();
        assert!(all_record.room.is_none() && all_record.user_id.is_none());

        // room frame then broadcast frame
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_convenience_wrappers_shape_payload() {
        let mut f = fixture(false);
        let (_, mut rx) = connect(&f, "alice");

        assert!(f
            .service
            .notify_file_uploaded("alice", "report.pdf", "https://files/report.pdf"));
        let frame = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["data"]["type"], "file_uploaded");
        assert_eq!(value["data"]["data"]["fileName"], "report.pdf");
        assert!(value["data"]["message"]
            .as_str()
            .unwrap()
            .contains("report.pdf"));

        assert!(f.service.notify_email_sent("alice", "bob@example.com", "Invoice"));
        let record = f.audits.recv().await.unwrap();
        assert_eq!(record.notification.notification_type, NotificationType::FileUploaded);
        let record = f.audits.recv().await.unwrap();
        assert_eq!(record.notification.notification_type, NotificationType::EmailSent);

        assert!(!f.service.notify_message_received("carol", "alice", "lunch?"));
    }

    #[tokio::test]
    async fn test_presence_queries() {
        let f = fixture(false);
        let (id, _rx) = connect(&f, "alice");

        assert!(f.service.is_connected("alice"));
        assert_eq!(f.service.connected_users(), HashSet::from(["alice".to_string()]));

        f.registry.on_disconnect(id);
        assert!(!f.service.is_connected("alice"));
        assert!(f.service.connected_users().is_empty());
    }

    #[test]
    fn test_producer_thread_outside_runtime_is_audited() {
        let runtime = Runtime::new().unwrap();
        let Fixture {
            service,
            mut audits,
            ..
        } = fixture_on(runtime.handle().clone(), false);
        let service = Arc::new(service);

        let producer = Arc::clone(&service);
        let delivered = std::thread::spawn(move || {
            producer.send_to_user("bob", Notification::new(NotificationType::Info, "a", "b"))
        })
        .join()
        .unwrap();
        assert!(!delivered);

        let record = runtime
            .block_on(async { tokio::time::timeout(Duration::from_secs(1), audits.recv()).await })
            .expect("audit call attempted")
            .unwrap();
        assert_eq!(record.user_id.as_deref(), Some("bob"));
        assert_eq!(record.status, DeliveryStatus::Pending);
    }
}
