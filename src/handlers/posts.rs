// src/handlers/posts.rs
//
// Post CRUD and the feed assembler. The feed is the follow-graph read path:
// posts by the viewer and everyone they actively follow, newest first, with
// a fixed page size. The author-filtered listing goes through the privacy
// gate instead and answers denial with an empty page.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{
        Category, CreatePostRequest, FeedParams, FeedResponse, Post, PostResponse,
        UpdatePostRequest,
    },
    pagination::{DEFAULT_PAGE_SIZE, Pagination, offset},
    privacy,
    utils::{jwt::Claims, sanitize::strip_html},
};

fn parse_category(value: Option<&str>) -> Result<&'static str, AppError> {
    match value {
        None => Ok(Category::General.as_str()),
        Some(v) => Category::parse(v)
            .map(|c| c.as_str())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid category '{}'", v))),
    }
}

/// Create a new post.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let author_id = claims.user_id()?;
    let category = parse_category(payload.category.as_deref())?;
    let content = strip_html(&payload.content);

    if content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Post content cannot be empty".to_string(),
        ));
    }

    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (id, author_id, content, image_url, category)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, author_id, content, image_url, category, is_active,
                   like_count, comment_count, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind(&content)
    .bind(&payload.image_url)
    .bind(category)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// The feed, or (with `?author=`) a privacy-gated author listing.
///
/// `GET /api/posts?page=N` and `GET /api/posts?author=<id>&page=N`.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = claims.user_id()?;
    let page = params.page.unwrap_or(1).max(1);

    let feed = match params.author {
        Some(author) => author_page(&pool, &claims, viewer, author, page).await?,
        None => assemble_feed(&pool, viewer, page).await?,
    };

    Ok(Json(feed))
}

/// Posts by the viewer plus everyone the viewer actively follows.
///
/// If the follow-graph lookup fails transiently, the feed degrades to the
/// viewer's own posts instead of failing the request.
async fn assemble_feed(pool: &PgPool, viewer: Uuid, page: i64) -> Result<FeedResponse, AppError> {
    let mut author_ids = match following_ids(pool, viewer).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(
                "Follow graph lookup failed for {}; degrading feed to own posts: {}",
                viewer,
                e
            );
            Vec::new()
        }
    };
    author_ids.push(viewer);

    page_of_posts(pool, viewer, author_ids, page).await
}

/// One author's posts behind the privacy gate. Denied access yields an empty
/// page, not an error; the gate is evaluated fresh on every request.
async fn author_page(
    pool: &PgPool,
    claims: &Claims,
    viewer: Uuid,
    author: Uuid,
    page: i64,
) -> Result<FeedResponse, AppError> {
    let allowed = match privacy::viewer_can_see(pool, viewer, claims.is_admin(), author).await {
        Ok(allowed) => allowed,
        Err(AppError::NotFound(msg)) => return Err(AppError::NotFound(msg)),
        Err(e) => {
            tracing::warn!("Privacy gate check failed, denying access: {}", e);
            false
        }
    };

    if !allowed {
        return Ok(FeedResponse {
            posts: Vec::new(),
            pagination: Pagination::empty(page, DEFAULT_PAGE_SIZE),
        });
    }

    page_of_posts(pool, viewer, vec![author], page).await
}

/// Ids of users the viewer actively follows.
async fn following_ids(pool: &PgPool, viewer: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT following_id FROM follows WHERE follower_id = $1 AND is_active",
    )
    .bind(viewer)
    .fetch_all(pool)
    .await
}

/// A page of active posts by the given authors, newest first, with the
/// viewer's like status joined in.
async fn page_of_posts(
    pool: &PgPool,
    viewer: Uuid,
    author_ids: Vec<Uuid>,
    page: i64,
) -> Result<FeedResponse, AppError> {
    let total_items = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM posts WHERE author_id = ANY($1) AND is_active",
    )
    .bind(&author_ids)
    .fetch_one(pool)
    .await?;

    let posts = sqlx::query_as::<_, PostResponse>(
        "SELECT p.id, p.author_id, u.username AS author_username,
                u.first_name AS author_first_name, u.last_name AS author_last_name,
                p.content, p.image_url, p.category, p.like_count, p.comment_count,
                (l.id IS NOT NULL) AS is_liked,
                p.created_at, p.updated_at
         FROM posts p
         JOIN users u ON p.author_id = u.id
         LEFT JOIN likes l ON l.post_id = p.id AND l.user_id = $2 AND l.is_active
         WHERE p.author_id = ANY($1) AND p.is_active
         ORDER BY p.created_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(&author_ids)
    .bind(viewer)
    .bind(DEFAULT_PAGE_SIZE)
    .bind(offset(page, DEFAULT_PAGE_SIZE))
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::from(e)
    })?;

    Ok(FeedResponse {
        posts,
        pagination: Pagination::new(page, DEFAULT_PAGE_SIZE, total_items),
    })
}

/// Get a single active post by id, with the viewer's like status.
pub async fn get_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = claims.user_id()?;

    let post = sqlx::query_as::<_, PostResponse>(
        "SELECT p.id, p.author_id, u.username AS author_username,
                u.first_name AS author_first_name, u.last_name AS author_last_name,
                p.content, p.image_url, p.category, p.like_count, p.comment_count,
                (l.id IS NOT NULL) AS is_liked,
                p.created_at, p.updated_at
         FROM posts p
         JOIN users u ON p.author_id = u.id
         LEFT JOIN likes l ON l.post_id = p.id AND l.user_id = $2 AND l.is_active
         WHERE p.id = $1 AND p.is_active",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Edit a post. Author only. Touches content/category/image only — the
/// counter columns belong to the reconciler.
pub async fn update_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let author_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT author_id FROM posts WHERE id = $1 AND is_active",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if author_id != user_id {
        return Err(AppError::Forbidden(
            "You are not authorized to edit this post".to_string(),
        ));
    }

    let category = match payload.category.as_deref() {
        Some(v) => Some(parse_category(Some(v))?),
        None => None,
    };
    let content = payload.content.as_deref().map(strip_html);

    let post = sqlx::query_as::<_, Post>(
        "UPDATE posts SET
            content = COALESCE($2, content),
            image_url = COALESCE($3, image_url),
            category = COALESCE($4, category),
            updated_at = NOW()
         WHERE id = $1
         RETURNING id, author_id, content, image_url, category, is_active,
                   like_count, comment_count, created_at, updated_at",
    )
    .bind(id)
    .bind(content)
    .bind(&payload.image_url)
    .bind(category)
    .fetch_one(&pool)
    .await?;

    Ok(Json(post))
}

/// Delete a post (soft delete). Author or admin.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let author_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT author_id FROM posts WHERE id = $1 AND is_active",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if author_id != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this post".to_string(),
        ));
    }

    sqlx::query("UPDATE posts SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}
