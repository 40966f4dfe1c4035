use crate::{
    config::Config,
    registry::ConnectionRegistry,
    services::{AuditSink, AuditTrail, NotificationService, Router},
    websocket::{dispatch::Dispatcher, transport::SessionHub},
};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Everything a socket session or HTTP handler needs, cheap to clone
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub hub: Arc<SessionHub>,
    pub router: Arc<Router>,
    pub notifications: Arc<NotificationService>,
    pub audit: AuditTrail,
    pub dispatcher: Arc<Dispatcher>,
}

impl RelayState {
    /// `runtime` hosts detached audit calls; pass the server's runtime handle.
    pub fn new(config: Config, sink: Arc<dyn AuditSink>, runtime: Handle) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(SessionHub::new());
        let router = Arc::new(Router::new(registry.clone(), hub.clone()));
        let audit = AuditTrail::new(sink, runtime);
        let notifications = Arc::new(NotificationService::new(
            router.clone(),
            registry.clone(),
            audit.clone(),
        ));

        Self {
            config: Arc::new(config),
            registry,
            hub,
            router,
            notifications,
            audit,
            dispatcher: Arc::new(Dispatcher::new()),
        }
    }
}
