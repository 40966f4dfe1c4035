/// Socket upgrade and connection metrics endpoints
use crate::error::AppError;
use crate::registry::RegistryStats;
use crate::state::RelayState;
use crate::websocket::WsSession;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMetrics {
    #[serde(flatten)]
    pub registry: RegistryStats,
    /// Sessions with an attached outbound channel
    pub sessions: usize,
}

/// Upgrade to a socket session
///
/// Endpoint: GET /ws
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<RelayState>,
) -> Result<HttpResponse, Error> {
    let max_frame = state.config.websocket.max_frame_bytes;
    let session = WsSession::new(state.get_ref().clone());

    ws::WsResponseBuilder::new(session, &req, stream)
        .frame_size(max_frame)
        .start()
}

/// Get connection metrics
///
/// Endpoint: GET /api/v1/ws/metrics
pub async fn ws_metrics(state: web::Data<RelayState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(WsMetrics {
        registry: state.registry.stats(),
        sessions: state.hub.len(),
    }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_handler))
        .service(web::scope("/api/v1/ws").route("/metrics", web::get().to(ws_metrics)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_body_is_flat() {
        let body = serde_json::to_value(WsMetrics {
            registry: RegistryStats {
                connections: 3,
                registered_connections: 2,
                users: 1,
                rooms: 0,
            },
            sessions: 3,
        })
        .unwrap();

        assert_eq!(body["connections"], 3);
        assert_eq!(body["registeredConnections"], 2);
        assert_eq!(body["sessions"], 3);
    }
}
