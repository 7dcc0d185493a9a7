// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, follows, interaction, notifications, posts, profile},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, posts, users, profile, notifications).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (database pool + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .expose_headers([axum::http::HeaderName::from_static("x-unread-count")]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/{id}/like",
            post(interaction::like_post).delete(interaction::unlike_post),
        )
        .route("/{id}/like-status", get(interaction::like_status))
        .route(
            "/{id}/comments",
            get(interaction::list_comments).post(interaction::create_comment),
        );

    let comment_routes = Router::new().route("/{id}", delete(interaction::delete_comment));

    let user_routes = Router::new()
        .route("/discover", get(follows::discover_users))
        .route("/{id}", get(profile::get_user_profile))
        .route("/{id}/follow", post(follows::follow_user))
        .route(
            "/{id}/unfollow",
            post(follows::unfollow_user).delete(follows::unfollow_user),
        )
        .route("/{id}/follow-status", get(follows::follow_status))
        .route("/{id}/followers", get(follows::list_followers))
        .route("/{id}/following", get(follows::list_following));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/settings", put(profile::update_settings));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/stream", get(notifications::stream))
        .route("/unread-count", get(notifications::unread_count))
        .route("/{id}/read", put(notifications::mark_read))
        .route("/read-all", post(notifications::mark_all_read));

    let protected = Router::new()
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/users", user_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/notifications", notification_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(protected)
        // Global middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
