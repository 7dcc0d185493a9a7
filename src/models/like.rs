// src/models/like.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'likes' table: one row per (user, post) pair, ever.
///
/// Toggling a like flips `is_active` on the existing row instead of inserting
/// or deleting, so duplicate-creation races collapse onto the unique row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Response for the like-status lookup.
#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub post_id: Uuid,
    pub is_liked: bool,
    pub like_count: i32,
}
