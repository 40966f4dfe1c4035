pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::AppError;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use services::{AuditSink, NotificationService, Router, TracingAuditSink};
pub use state::RelayState;
pub use websocket::{ServerEvent, SessionHub, Transport};
