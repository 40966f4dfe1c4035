use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Plain informational notice
    #[default]
    Info,
    /// Operation completed
    Success,
    /// Something needs attention
    Warning,
    /// Operation failed
    Error,
    /// Object storage upload finished
    FileUploaded,
    /// Transactional email was handed to the mail provider
    EmailSent,
    /// Chat message arrived
    MessageReceived,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
            NotificationType::FileUploaded => "file_uploaded",
            NotificationType::EmailSent => "email_sent",
            NotificationType::MessageReceived => "message_received",
        }
    }
}

/// Delivery status recorded alongside each notification
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// No live connection accepted the frame
    #[default]
    Pending,
    /// Handed to at least one live connection
    Delivered,
}

impl DeliveryStatus {
    pub fn from_delivered(delivered: bool) -> Self {
        if delivered {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

/// A notification as pushed to clients.
///
/// The producer builds it; `timestamp` is stamped by the notification
/// service at dispatch time. `status` never goes over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub status: DeliveryStatus,
}

impl Notification {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            message: message.into(),
            data: None,
            timestamp: None,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Snapshot handed to the audit sink after every notification dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Addressed user, `None` for room and global broadcasts
    pub user_id: Option<String>,
    /// Addressed room, if any
    pub room: Option<String>,
    pub notification: Notification,
    pub status: DeliveryStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Chat message scope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Direct,
    Room,
    Broadcast,
}

/// Chat message history entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub room: Option<String>,
    pub message: String,
    pub kind: MessageKind,
    pub status: DeliveryStatus,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_type_wire_names() {
        assert_eq!(
            serde_json::to_value(NotificationType::FileUploaded).unwrap(),
            json!("file_uploaded")
        );
        assert_eq!(NotificationType::MessageReceived.as_str(), "message_received");
        assert_eq!(NotificationType::default(), NotificationType::Info);
    }

    #[test]
    fn test_notification_wire_shape_omits_status() {
        let mut n = Notification::new(NotificationType::Success, "Done", "It worked")
            .with_data(json!({"id": 7}));
        n.status = DeliveryStatus::Delivered;

        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["data"]["id"], 7);
        assert!(value.get("status").is_none());
        assert!(value["timestamp"].is_null());
    }

    #[test]
    fn test_delivery_status_from_bool() {
        assert_eq!(DeliveryStatus::from_delivered(true), DeliveryStatus::Delivered);
        assert_eq!(DeliveryStatus::from_delivered(false).as_str(), "pending");
    }
}
