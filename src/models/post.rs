// src/models/post.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::pagination::Pagination;

/// Post category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Announcement,
    Question,
}

impl Category {
    pub const VALUES: [&'static str; 3] = ["general", "announcement", "question"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "general" => Some(Category::General),
            "announcement" => Some(Category::Announcement),
            "question" => Some(Category::Question),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Announcement => "announcement",
            Category::Question => "question",
        }
    }
}

/// Represents the 'posts' table in the database.
///
/// `like_count` and `comment_count` are derived from the active like/comment
/// rows and are repaired by recounting, never adjusted in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub like_count: i32,
    pub comment_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 280,
        message = "Post content must be between 1 and 280 characters"
    ))]
    pub content: String,

    /// URL returned by the blob storage service; stored verbatim.
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,

    /// Validated against the category enum in the handler. Defaults to 'general'.
    pub category: Option<String>,
}

/// DTO for editing a post. Counters are never touched by an edit.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(
        min = 1,
        max = 280,
        message = "Post content must be between 1 and 280 characters"
    ))]
    pub content: Option<String>,

    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,

    pub category: Option<String>,
}

/// A post joined with its author identity and the viewer's like status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category: String,
    pub like_count: i32,
    pub comment_count: i32,
    /// Whether the requesting user currently likes this post.
    pub is_liked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Feed page: items plus the pagination envelope.
#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: Pagination,
}

/// Query parameters for the post listing / feed.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub page: Option<i64>,
    /// When present, list this author's posts behind the privacy gate
    /// instead of assembling the follow-based feed.
    pub author: Option<Uuid>,
}
