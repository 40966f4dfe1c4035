pub mod audit;
pub mod notification_service;
pub mod router;

pub use audit::{AuditError, AuditSink, AuditTrail, TracingAuditSink};
pub use notification_service::NotificationService;
pub use router::Router;
