// src/handlers/profile.rs
//
// Profile views. Follower/following/post counts are computed on read from
// the follow graph and the post table; they are never stored, so they cannot
// drift the way the post counters can.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::profile::{Profile, ProfileResponse, UpdateProfileRequest},
    privacy::{self, Privacy},
    utils::jwt::Claims,
};

const PROFILE_QUERY: &str = "
    SELECT u.id, u.username, u.first_name, u.last_name,
           p.bio, p.avatar_url, p.website, p.location, p.privacy,
           (SELECT COUNT(*) FROM follows WHERE following_id = u.id AND is_active) AS followers_count,
           (SELECT COUNT(*) FROM follows WHERE follower_id = u.id AND is_active) AS following_count,
           (SELECT COUNT(*) FROM posts WHERE author_id = u.id AND is_active) AS posts_count,
           u.created_at
    FROM users u
    JOIN profiles p ON p.user_id = u.id
    WHERE u.id = $1 AND u.is_active";

async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<ProfileResponse, AppError> {
    sqlx::query_as::<_, ProfileResponse>(PROFILE_QUERY)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// The requesting user's own profile. `GET /api/profile/me`.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let profile = fetch_profile(&pool, user_id).await?;

    Ok(Json(profile))
}

/// Update profile settings. `PUT /api/profile/settings`.
/// Absent fields keep their current value.
pub async fn update_settings(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let privacy = match payload.privacy.as_deref() {
        None => None,
        Some(v) => Some(
            Privacy::parse(v)
                .map(|p| p.as_str())
                .ok_or_else(|| AppError::BadRequest(format!("Invalid privacy setting '{}'", v)))?,
        ),
    };

    let profile = sqlx::query_as::<_, Profile>(
        "UPDATE profiles SET
            bio = COALESCE($2, bio),
            avatar_url = COALESCE($3, avatar_url),
            website = COALESCE($4, website),
            location = COALESCE($5, location),
            privacy = COALESCE($6, privacy),
            updated_at = NOW()
         WHERE user_id = $1
         RETURNING user_id, bio, avatar_url, website, location, privacy,
                   created_at, updated_at",
    )
    .bind(user_id)
    .bind(&payload.bio)
    .bind(&payload.avatar_url)
    .bind(&payload.website)
    .bind(&payload.location)
    .bind(privacy)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Another user's profile, behind the privacy gate. `GET /api/users/{id}`.
///
/// A viewer the gate turns away still gets the bare identity, so clients can
/// render a "this profile is private" shell instead of an error page.
pub async fn get_user_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = claims.user_id()?;

    let allowed = privacy::viewer_can_see(&pool, viewer, claims.is_admin(), user_id).await?;

    if allowed {
        let profile = fetch_profile(&pool, user_id).await?;
        return Ok(Json(json!(profile)));
    }

    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT u.username, p.privacy
         FROM users u JOIN profiles p ON p.user_id = u.id
         WHERE u.id = $1 AND u.is_active",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let (username, privacy_value) = row;

    Ok(Json(json!({
        "id": user_id,
        "username": username,
        "privacy": privacy_value,
        "is_private": true,
    })))
}
