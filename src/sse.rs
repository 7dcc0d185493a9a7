// src/sse.rs
//
// Notification delivery channel: a long-lived SSE stream per connected
// client. Each connection runs one cooperative polling task that watches the
// notification table for the recipient and forwards what it finds; the task
// never busy-waits and dies as soon as the client goes away.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::Event;
use chrono::Utc;
use futures::stream::Stream;
use serde::Serialize;
use sqlx::PgPool;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::models::notification::NotificationResponse;

/// How often the channel polls for new notifications.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Trailing window each poll covers. Wider than the poll interval, so
/// delivery is at-least-once; duplicate suppression is the client's job.
pub const POLL_WINDOW: Duration = Duration::from_secs(2);
/// How often the channel emits a heartbeat with the unread count.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// Idle sleep between loop iterations; bounds per-connection CPU use.
pub const IDLE_PAUSE: Duration = Duration::from_millis(500);
/// Cap on notifications forwarded per poll.
const POLL_BATCH: i64 = 5;

/// Events emitted on the notification stream.
///
/// A connection emits `connection` exactly once, then any number of
/// `new_notification` and `heartbeat` events; `error` is terminal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connection {
        message: String,
    },
    NewNotification {
        notification: NotificationResponse,
    },
    Heartbeat {
        unread_count: i64,
    },
    Error {
        message: String,
    },
}

/// Notifications for `recipient_id` created after `since`, oldest first.
async fn recent_notifications(
    pool: &PgPool,
    recipient_id: Uuid,
    since: chrono::DateTime<Utc>,
) -> Result<Vec<NotificationResponse>, sqlx::Error> {
    sqlx::query_as::<_, NotificationResponse>(
        "SELECT n.id, n.notification_type, n.message, n.is_read, n.post_id,
                n.sender_id, u.username AS sender_username,
                u.first_name AS sender_first_name, u.last_name AS sender_last_name,
                n.created_at
         FROM notifications n
         JOIN users u ON n.sender_id = u.id
         WHERE n.recipient_id = $1 AND n.created_at > $2
         ORDER BY n.created_at ASC
         LIMIT $3",
    )
    .bind(recipient_id)
    .bind(since)
    .bind(POLL_BATCH)
    .fetch_all(pool)
    .await
}

/// Current unread-notification count for a user.
/// Shared with the non-streaming notification endpoints.
pub async fn unread_count(pool: &PgPool, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await
}

/// Open a notification channel for `recipient_id`.
///
/// Spawns the polling task and returns the event stream to hand to
/// `Sse::new`. When the client disconnects the stream (and its receiver) is
/// dropped, the next send fails, and the task exits; nothing is left polling.
pub fn open_channel(
    pool: PgPool,
    recipient_id: Uuid,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let (tx, rx) = tokio::sync::mpsc::channel::<StreamEvent>(16);

    tokio::spawn(async move {
        if tx
            .send(StreamEvent::Connection {
                message: "Connected to notification stream".to_string(),
            })
            .await
            .is_err()
        {
            return;
        }

        let mut last_poll = tokio::time::Instant::now();
        let mut last_heartbeat = tokio::time::Instant::now();

        loop {
            if last_poll.elapsed() >= POLL_INTERVAL {
                let since = Utc::now()
                    - chrono::Duration::from_std(POLL_WINDOW).unwrap_or(chrono::Duration::zero());
                match recent_notifications(&pool, recipient_id, since).await {
                    Ok(batch) => {
                        for notification in batch {
                            if tx
                                .send(StreamEvent::NewNotification { notification })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Notification stream poll failed: {}", e);
                        let _ = tx
                            .send(StreamEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                }
                last_poll = tokio::time::Instant::now();
            }

            if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
                match unread_count(&pool, recipient_id).await {
                    Ok(count) => {
                        if tx
                            .send(StreamEvent::Heartbeat {
                                unread_count: count,
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Notification stream heartbeat failed: {}", e);
                        let _ = tx
                            .send(StreamEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                }
                last_heartbeat = tokio::time::Instant::now();
            }

            tokio::time::sleep(IDLE_PAUSE).await;
        }
    });

    // The channel emits its own heartbeats, so no extra SSE keep-alive is
    // layered on top.
    ReceiverStream::new(rx).map(|event| {
        Ok(Event::default()
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().data("error")))
    })
}
