// src/handlers/follows.rs
//
// The follow graph: directed edges between users with toggle-reactivation
// semantics. One row per ordered pair, ever; `is_active` carries the state.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        follow::{Follow, FollowEntry},
        user::{DiscoverParams, UserSummary},
    },
    notify,
    pagination::{DEFAULT_PAGE_SIZE, PageParams, Pagination, offset},
    privacy,
    utils::jwt::Claims,
};

async fn user_exists(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

async fn fetch_follow(
    pool: &PgPool,
    follower: Uuid,
    following: Uuid,
) -> Result<Option<Follow>, sqlx::Error> {
    sqlx::query_as::<_, Follow>(
        "SELECT id, follower_id, following_id, is_active, created_at
         FROM follows WHERE follower_id = $1 AND following_id = $2",
    )
    .bind(follower)
    .bind(following)
    .fetch_optional(pool)
    .await
}

async fn activate_follow(pool: &PgPool, follow_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE follows SET is_active = TRUE WHERE id = $1")
        .bind(follow_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Follow a user. `POST /api/users/{id}/follow`.
///
/// Self-follow is rejected outright. An inactive row is reactivated rather
/// than duplicated; a concurrent duplicate insert hits the unique constraint
/// and resolves through the same reactivation path.
pub async fn follow_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let follower = claims.user_id()?;

    if follower == user_id {
        return Err(AppError::BadRequest(
            "You cannot follow yourself".to_string(),
        ));
    }

    if !user_exists(&pool, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    // Fan-out accompanies a brand-new edge only; reactivating a toggled edge
    // is silent, so an unfollow/refollow cycle never re-notifies.
    let mut created = false;

    match fetch_follow(&pool, follower, user_id).await? {
        Some(follow) if follow.is_active => {
            return Err(AppError::BadRequest(
                "You are already following this user".to_string(),
            ));
        }
        Some(follow) => activate_follow(&pool, follow.id).await?,
        None => {
            let insert = sqlx::query(
                "INSERT INTO follows (id, follower_id, following_id) VALUES ($1, $2, $3)",
            )
            .bind(Uuid::new_v4())
            .bind(follower)
            .bind(user_id)
            .execute(&pool)
            .await;

            match insert {
                Ok(_) => created = true,
                Err(e) if is_unique_violation(&e) => {
                    // The winning concurrent insert owns the notification.
                    match fetch_follow(&pool, follower, user_id).await? {
                        Some(follow) if follow.is_active => {
                            return Err(AppError::BadRequest(
                                "You are already following this user".to_string(),
                            ));
                        }
                        Some(follow) => activate_follow(&pool, follow.id).await?,
                        None => return Err(AppError::from(e)),
                    }
                }
                Err(e) => return Err(AppError::from(e)),
            }
        }
    }

    if created {
        let follower_username = sqlx::query_scalar::<_, String>(
            "SELECT username FROM users WHERE id = $1",
        )
        .bind(follower)
        .fetch_one(&pool)
        .await?;

        notify::follow_created(&pool, follower, &follower_username, user_id).await;
    }

    Ok(Json(json!({ "message": "Successfully followed user" })))
}

/// Unfollow a user. `POST` or `DELETE /api/users/{id}/unfollow`.
pub async fn unfollow_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let follower = claims.user_id()?;

    if !user_exists(&pool, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let result = sqlx::query(
        "UPDATE follows SET is_active = FALSE
         WHERE follower_id = $1 AND following_id = $2 AND is_active",
    )
    .bind(follower)
    .bind(user_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "You are not following this user".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Successfully unfollowed user" })))
}

/// Is the requesting user following `{id}`? Degrades to false on lookup
/// failure rather than failing the request.
pub async fn follow_status(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let follower = claims.user_id()?;

    let is_following = match privacy::is_following(&pool, follower, user_id).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Follow status lookup failed: {}", e);
            false
        }
    };

    Ok(Json(json!({ "is_following": is_following })))
}

/// Paginated list of a user's followers, newest first.
pub async fn list_followers(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    if !user_exists(&pool, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let page = params.page();

    let total_items = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM follows WHERE following_id = $1 AND is_active",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let followers = sqlx::query_as::<_, FollowEntry>(
        "SELECT u.id AS user_id, u.username, u.first_name, u.last_name,
                f.created_at AS followed_at
         FROM follows f
         JOIN users u ON f.follower_id = u.id
         WHERE f.following_id = $1 AND f.is_active
         ORDER BY f.created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(DEFAULT_PAGE_SIZE)
    .bind(offset(page, DEFAULT_PAGE_SIZE))
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "followers": followers,
        "pagination": Pagination::new(page, DEFAULT_PAGE_SIZE, total_items),
    })))
}

/// Paginated list of the users someone follows, newest first.
pub async fn list_following(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    if !user_exists(&pool, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let page = params.page();

    let total_items = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND is_active",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let following = sqlx::query_as::<_, FollowEntry>(
        "SELECT u.id AS user_id, u.username, u.first_name, u.last_name,
                f.created_at AS followed_at
         FROM follows f
         JOIN users u ON f.following_id = u.id
         WHERE f.follower_id = $1 AND f.is_active
         ORDER BY f.created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(DEFAULT_PAGE_SIZE)
    .bind(offset(page, DEFAULT_PAGE_SIZE))
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "following": following,
        "pagination": Pagination::new(page, DEFAULT_PAGE_SIZE, total_items),
    })))
}

/// Discover users to follow: everyone else, optionally filtered by a
/// case-insensitive name search, newest accounts first.
pub async fn discover_users(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DiscoverParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = claims.user_id()?;
    let page = params.page.unwrap_or(1).max(1);
    let pattern = params
        .search
        .as_deref()
        .map(|s| format!("%{}%", s));

    let total_items = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users
         WHERE id <> $1 AND is_active
           AND ($2::TEXT IS NULL
                OR username ILIKE $2 OR first_name ILIKE $2 OR last_name ILIKE $2)",
    )
    .bind(viewer)
    .bind(&pattern)
    .fetch_one(&pool)
    .await?;

    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, first_name, last_name
         FROM users
         WHERE id <> $1 AND is_active
           AND ($2::TEXT IS NULL
                OR username ILIKE $2 OR first_name ILIKE $2 OR last_name ILIKE $2)
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(viewer)
    .bind(&pattern)
    .bind(DEFAULT_PAGE_SIZE)
    .bind(offset(page, DEFAULT_PAGE_SIZE))
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "users": users,
        "pagination": Pagination::new(page, DEFAULT_PAGE_SIZE, total_items),
    })))
}
