// src/handlers/notifications.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{AppendHeaders, IntoResponse, Sse},
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::notification::NotificationResponse, sse, utils::jwt::Claims};

/// List all notifications for the requesting user, newest first.
///
/// Read-with-mutation contract: fetching the list marks every unread
/// notification as read, and the count of notifications that *were* unread is
/// returned in the `X-Unread-Count` header. The notification set itself is
/// unchanged, so repeat calls are idempotent for the data, not for read state.
pub async fn list_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let unread = sse::unread_count(&pool, user_id).await?;

    if unread > 0 {
        sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&pool)
        .await?;
    }

    let notifications = sqlx::query_as::<_, NotificationResponse>(
        "SELECT n.id, n.notification_type, n.message, n.is_read, n.post_id,
                n.sender_id, u.username AS sender_username,
                u.first_name AS sender_first_name, u.last_name AS sender_last_name,
                n.created_at
         FROM notifications n
         JOIN users u ON n.sender_id = u.id
         WHERE n.recipient_id = $1
         ORDER BY n.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok((
        AppendHeaders([("X-Unread-Count", unread.to_string())]),
        Json(json!({ "notifications": notifications })),
    ))
}

/// Mark one notification as read. `PUT /api/notifications/{id}/read`.
pub async fn mark_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
    )
    .bind(notification_id)
    .bind(user_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(json!({ "status": "marked as read" })))
}

/// Mark every unread notification as read. `POST /api/notifications/read-all`.
pub async fn mark_all_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
    )
    .bind(user_id)
    .execute(&pool)
    .await?;

    Ok(Json(json!({ "status": "all notifications marked as read" })))
}

/// Current unread count, without the read-marking side effect.
pub async fn unread_count(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let unread = sse::unread_count(&pool, user_id).await?;

    Ok(Json(json!({ "unread_count": unread })))
}

/// Open the notification delivery channel. `GET /api/notifications/stream`.
pub async fn stream(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    Ok(Sse::new(sse::open_channel(pool, user_id)))
}
