// src/notify.rs
//
// Notification fan-out: every qualifying engagement event (follow, like,
// comment) produces exactly one notification row. Only the first creation of
// a like or follow row qualifies; reactivating a toggled row is not a new
// event and produces nothing. Fan-out runs inline after the triggering write
// commits; a fan-out failure is logged and never fails the write itself.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::notification::NotificationType;

pub fn follow_message(username: &str) -> String {
    format!("{} started following you", username)
}

pub fn like_message(username: &str) -> String {
    format!("{} liked your post", username)
}

pub fn comment_message(username: &str) -> String {
    format!("{} commented on your post", username)
}

async fn insert(
    pool: &PgPool,
    recipient_id: Uuid,
    sender_id: Uuid,
    kind: NotificationType,
    post_id: Option<Uuid>,
    message: String,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications (id, recipient_id, sender_id, notification_type, post_id, message)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(recipient_id)
    .bind(sender_id)
    .bind(kind.as_str())
    .bind(post_id)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Notify `following_id` that `follower` now follows them.
/// Called for newly created edges only; reactivation stays silent.
pub async fn follow_created(
    pool: &PgPool,
    follower_id: Uuid,
    follower_username: &str,
    following_id: Uuid,
) {
    let message = follow_message(follower_username);
    if let Err(e) = insert(
        pool,
        following_id,
        follower_id,
        NotificationType::Follow,
        None,
        message,
    )
    .await
    {
        tracing::warn!("Follow notification fan-out failed: {}", e);
    }
}

/// Notify a post's author of a new like. Self-likes are suppressed.
pub async fn like_created(
    pool: &PgPool,
    liker_id: Uuid,
    liker_username: &str,
    post_author_id: Uuid,
    post_id: Uuid,
) {
    if liker_id == post_author_id {
        return;
    }
    let message = like_message(liker_username);
    if let Err(e) = insert(
        pool,
        post_author_id,
        liker_id,
        NotificationType::Like,
        Some(post_id),
        message,
    )
    .await
    {
        tracing::warn!("Like notification fan-out failed: {}", e);
    }
}

/// Notify a post's author of a new comment. Self-comments are suppressed.
pub async fn comment_created(
    pool: &PgPool,
    commenter_id: Uuid,
    commenter_username: &str,
    post_author_id: Uuid,
    post_id: Uuid,
) {
    if commenter_id == post_author_id {
        return;
    }
    let message = comment_message(commenter_username);
    if let Err(e) = insert(
        pool,
        post_author_id,
        commenter_id,
        NotificationType::Comment,
        Some(post_id),
        message,
    )
    .await
    {
        tracing::warn!("Comment notification fan-out failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_actor() {
        assert_eq!(follow_message("alice"), "alice started following you");
        assert_eq!(like_message("bob"), "bob liked your post");
        assert_eq!(comment_message("carol"), "carol commented on your post");
    }
}
