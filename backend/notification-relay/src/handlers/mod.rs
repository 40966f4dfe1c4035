/// HTTP handlers for the relay
pub mod notifications;
pub mod websocket;

use actix_web::web;

pub use notifications::register_routes as register_notifications;
pub use websocket::register_routes as register_websocket;

/// Mount every relay route
pub fn configure(cfg: &mut web::ServiceConfig) {
    register_notifications(cfg);
    register_websocket(cfg);
}
