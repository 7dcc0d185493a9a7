// src/models/notification.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Notification kinds, one per engagement event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Follow,
    Like,
    Comment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Follow => "follow",
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
        }
    }
}

/// Represents the 'notifications' table.
///
/// Notifications are an immutable historical log: deleting the like or
/// comment that produced one does not remove it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    pub notification_type: String,
    pub post_id: Option<Uuid>,
    pub message: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A notification joined with sender identity, as delivered to clients
/// (both the list endpoint and the SSE stream).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub notification_type: String,
    pub message: String,
    pub is_read: bool,
    pub post_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
