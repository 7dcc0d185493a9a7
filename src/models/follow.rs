// src/models/follow.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'follows' table: one row per ordered (follower, following)
/// pair, with `is_active` carrying the current state. Self-follows are
/// rejected before insert and excluded by a CHECK constraint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Follow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One entry in a followers/following listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FollowEntry {
    pub user_id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// When the follow edge was first created.
    pub followed_at: chrono::DateTime<chrono::Utc>,
}
