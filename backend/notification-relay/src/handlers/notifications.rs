/// Producer-facing notification API
use crate::error::AppError;
use crate::models::{Notification, NotificationType};
use crate::state::RelayState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

/// Notification body shared by every send endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotificationPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default, rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl NotificationPayload {
    fn into_notification(self) -> Notification {
        let notification =
            Notification::new(self.notification_type, self.title, self.message);
        match self.data {
            Some(data) => notification.with_data(data),
            None => notification,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendToUserRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub notification: NotificationPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendToRoomRequest {
    #[validate(length(min = 1, message = "room is required"))]
    pub room: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub notification: NotificationPayload,
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Send a notification to every connection of one user
///
/// POST /api/v1/notifications/send
pub async fn send_to_user(
    state: web::Data<RelayState>,
    req: web::Json<SendToUserRequest>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    req.validate()?;

    let sent = state
        .notifications
        .send_to_user(&req.user_id, req.notification.into_notification());

    let message = if sent {
        "Notification sent"
    } else {
        "User not connected"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        message,
        json!({ "sent": sent, "userId": req.user_id }),
    )))
}

/// Send a notification to every open connection
///
/// POST /api/v1/notifications/broadcast
pub async fn broadcast(
    state: web::Data<RelayState>,
    req: web::Json<NotificationPayload>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    req.validate()?;

    state.notifications.send_to_all(req.into_notification());
    Ok(HttpResponse::Ok().json(ApiResponse::done("Broadcast sent")))
}

/// Send a notification to every member of a room
///
/// POST /api/v1/notifications/room
pub async fn send_to_room(
    state: web::Data<RelayState>,
    req: web::Json<SendToRoomRequest>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    req.validate()?;

    state
        .notifications
        .send_to_room(&req.room, req.notification.into_notification());
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Notification sent to room",
        json!({ "room": req.room }),
    )))
}

/// GET /api/v1/notifications/status/{user_id}
pub async fn user_status(
    state: web::Data<RelayState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let is_connected = state.notifications.is_connected(&user_id);

    Ok(HttpResponse::Ok().json(json!({
        "userId": user_id,
        "isConnected": is_connected,
        "status": if is_connected { "online" } else { "offline" },
    })))
}

/// GET /api/v1/notifications/connected
pub async fn connected_users(state: web::Data<RelayState>) -> Result<HttpResponse, AppError> {
    let mut users: Vec<String> = state.notifications.connected_users().into_iter().collect();
    users.sort();

    Ok(HttpResponse::Ok().json(json!({
        "count": users.len(),
        "users": users,
    })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("/send", web::post().to(send_to_user))
            .route("/broadcast", web::post().to(broadcast))
            .route("/room", web::post().to(send_to_room))
            .route("/status/{user_id}", web::get().to(user_status))
            .route("/connected", web::get().to(connected_users)),
    );
}
