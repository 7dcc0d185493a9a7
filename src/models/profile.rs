// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'profiles' table. One row per user, created in the same
/// transaction as the user row, so it is never absent.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: String,
    pub avatar_url: String,
    pub website: String,
    pub location: String,
    /// 'public', 'followers_only' or 'private'.
    pub privacy: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for updating profile settings. Absent fields keep their value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 160, message = "Bio cannot exceed 160 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "avatar_url must be a valid URL"))]
    pub avatar_url: Option<String>,

    #[validate(url(message = "website must be a valid URL"))]
    pub website: Option<String>,

    #[validate(length(max = 100))]
    pub location: Option<String>,

    /// Validated against the privacy enum in the handler.
    pub privacy: Option<String>,
}

/// A full profile view: identity, settings, and the counts computed on read.
///
/// Follower/following/post counts are never stored; they are counted from the
/// follow graph and post table at request time so they cannot drift.
#[derive(Debug, FromRow, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub website: String,
    pub location: String,
    pub privacy: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
