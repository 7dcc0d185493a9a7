// src/handlers/interaction.rs
//
// Likes and comments. Both feed the counter reconciler and the notification
// fan-out; neither side effect may fail the triggering write.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    counters,
    error::{AppError, is_unique_violation},
    models::{
        comment::{CommentResponse, CreateCommentRequest},
        like::{Like, LikeStatusResponse},
    },
    notify,
    utils::{jwt::Claims, sanitize::strip_html},
};

/// The author of an active post, or 404.
async fn post_author(pool: &PgPool, post_id: Uuid) -> Result<Uuid, AppError> {
    sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1 AND is_active")
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

async fn username_of(pool: &PgPool, user_id: Uuid) -> Result<String, AppError> {
    sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

async fn fetch_like(
    pool: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<Option<Like>, sqlx::Error> {
    sqlx::query_as::<_, Like>(
        "SELECT id, user_id, post_id, is_active, created_at
         FROM likes WHERE user_id = $1 AND post_id = $2",
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

async fn activate_like(pool: &PgPool, like_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE likes SET is_active = TRUE WHERE id = $1")
        .bind(like_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Like a post. `POST /api/posts/{id}/like`.
///
/// One like row per (user, post), ever: a previously unliked row is
/// reactivated, and a concurrent duplicate insert resolves through the same
/// reactivation path via the unique constraint.
pub async fn like_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let author_id = post_author(&pool, post_id).await?;

    // Fan-out accompanies a brand-new like row only. Reactivating a toggled
    // row is silent, so an unlike/re-like cycle never re-notifies the author.
    let mut created = false;

    match fetch_like(&pool, user_id, post_id).await? {
        Some(like) if like.is_active => {
            return Err(AppError::BadRequest(
                "You have already liked this post".to_string(),
            ));
        }
        Some(like) => activate_like(&pool, like.id).await?,
        None => {
            let insert = sqlx::query(
                "INSERT INTO likes (id, user_id, post_id) VALUES ($1, $2, $3)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(post_id)
            .execute(&pool)
            .await;

            match insert {
                Ok(_) => created = true,
                Err(e) if is_unique_violation(&e) => {
                    // Lost a race with an identical request: the unique row
                    // now exists and the winning insert owns the
                    // notification. Treat it as the toggle case.
                    match fetch_like(&pool, user_id, post_id).await? {
                        Some(like) if like.is_active => {
                            return Err(AppError::BadRequest(
                                "You have already liked this post".to_string(),
                            ));
                        }
                        Some(like) => activate_like(&pool, like.id).await?,
                        None => return Err(AppError::from(e)),
                    }
                }
                Err(e) => return Err(AppError::from(e)),
            }
        }
    }

    counters::recount_or_log(&pool, post_id).await;

    if created {
        let username = username_of(&pool, user_id).await?;
        notify::like_created(&pool, user_id, &username, author_id, post_id).await;
    }

    Ok(Json(json!({ "message": "Post liked successfully" })))
}

/// Unlike a post. `DELETE /api/posts/{id}/like`.
pub async fn unlike_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    post_author(&pool, post_id).await?;

    let result = sqlx::query(
        "UPDATE likes SET is_active = FALSE
         WHERE user_id = $1 AND post_id = $2 AND is_active",
    )
    .bind(user_id)
    .bind(post_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "You have not liked this post".to_string(),
        ));
    }

    // Unliking keeps the notification; only the counter is reconciled.
    counters::recount_or_log(&pool, post_id).await;

    Ok(Json(json!({ "message": "Post unliked successfully" })))
}

/// Whether the requesting user currently likes a post. `GET .../like-status`.
pub async fn like_status(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let like_count = sqlx::query_scalar::<_, i32>(
        "SELECT like_count FROM posts WHERE id = $1 AND is_active",
    )
    .bind(post_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let is_liked = matches!(
        fetch_like(&pool, user_id, post_id).await?,
        Some(like) if like.is_active
    );

    Ok(Json(LikeStatusResponse {
        post_id,
        is_liked,
        like_count,
    }))
}

/// Create a comment on a post. `POST /api/posts/{id}/comments`.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let author_id = post_author(&pool, post_id).await?;
    let content = strip_html(&payload.content);

    if content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Comment cannot be empty".to_string(),
        ));
    }

    let username = username_of(&pool, user_id).await?;

    let comment = sqlx::query_as::<_, CommentResponse>(
        "INSERT INTO comments (id, post_id, author_id, content)
         VALUES ($1, $2, $3, $4)
         RETURNING id, post_id, author_id, $5::TEXT AS author_username, content, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(user_id)
    .bind(&content)
    .bind(&username)
    .fetch_one(&pool)
    .await?;

    counters::recount_or_log(&pool, post_id).await;
    notify::comment_created(&pool, user_id, &username, author_id, post_id).await;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List a post's active comments, newest first.
pub async fn list_comments(
    State(pool): State<PgPool>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    post_author(&pool, post_id).await?;

    let comments = sqlx::query_as::<_, CommentResponse>(
        "SELECT c.id, c.post_id, c.author_id, u.username AS author_username,
                c.content, c.created_at
         FROM comments c
         JOIN users u ON c.author_id = u.id
         WHERE c.post_id = $1 AND c.is_active
         ORDER BY c.created_at DESC",
    )
    .bind(post_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}

/// Delete a comment (soft delete). Author only. The parent post is recounted;
/// the comment's notification is kept.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let row = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT author_id, post_id FROM comments WHERE id = $1 AND is_active",
    )
    .bind(comment_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let (author_id, post_id) = row;

    if author_id != user_id {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this comment".to_string(),
        ));
    }

    sqlx::query("UPDATE comments SET is_active = FALSE WHERE id = $1")
        .bind(comment_id)
        .execute(&pool)
        .await?;

    counters::recount_or_log(&pool, post_id).await;

    Ok(StatusCode::NO_CONTENT)
}
