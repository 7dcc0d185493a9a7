// tests/api_tests.rs
//
// Integration tests against a running Postgres. Each test spawns the app on
// a random port and drives it over HTTP. Without DATABASE_URL set the tests
// skip themselves, so the suite can run without a database.

use serde_json::{Value, json};
use socialconnect::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Spawn the app on a random port. Returns the base URL, or None when no
/// database is configured.
async fn try_spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        counter_sweep_interval: 0,
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

/// Register a fresh user and log in. Returns (token, user_id).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, String) {
    let unique = &Uuid::new_v4().to_string()[..8];
    let username = format!("u_{}", unique);
    let email = format!("{}@example.com", username);

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": username,
            "email": email,
            "password": "password123",
            "first_name": "Test",
            "last_name": "User"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);
    let user_id = resp.json::<Value>().await.unwrap()["user_id"]
        .as_str()
        .unwrap()
        .to_string();

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json::<Value>()
        .await
        .unwrap();

    (login["token"].as_str().unwrap().to_string(), user_id)
}

async fn create_post(client: &reqwest::Client, address: &str, token: &str, content: &str) -> String {
    let resp = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(token)
        .json(&json!({ "content": content }))
        .send()
        .await
        .expect("Create post failed");
    assert_eq!(resp.status().as_u16(), 201);
    resp.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_check_404() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": "yo",
            "email": "yo@example.com",
            "password": "password123",
            "first_name": "Y",
            "last_name": "O"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let username = format!("u_{}", &Uuid::new_v4().to_string()[..8]);
    let payload = json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "password123",
        "first_name": "A",
        "last_name": "B"
    });

    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn like_toggle_keeps_counter_consistent() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (author_token, _) = register_and_login(&client, &address).await;
    let (liker_token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &author_token, "counter test").await;

    // Like once: ok. Like again: 400, counter unchanged.
    let first = client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&liker_token)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&liker_token)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 400);

    let status = client
        .get(format!("{}/api/posts/{}/like-status", address, post_id))
        .bearer_auth(&liker_token)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(status["is_liked"], true);
    assert_eq!(status["like_count"], 1);

    // Unlike: ok. Unlike again: 400.
    let unlike = client
        .delete(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&liker_token)
        .send()
        .await
        .unwrap();
    assert_eq!(unlike.status().as_u16(), 200);

    let again = client
        .delete(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&liker_token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 400);

    let status = client
        .get(format!("{}/api/posts/{}/like-status", address, post_id))
        .bearer_auth(&liker_token)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(status["is_liked"], false);
    assert_eq!(status["like_count"], 0);
}

#[tokio::test]
async fn follow_toggle_reuses_the_row() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, id_a) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;

    // Self-follow is a validation error.
    let selfie = client
        .post(format!("{}/api/users/{}/follow", address, id_a))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(selfie.status().as_u16(), 400);

    // Follow, duplicate follow, unfollow, duplicate unfollow, re-follow.
    for (method_path, expected) in [
        ("follow", 200),
        ("follow", 400),
        ("unfollow", 200),
        ("unfollow", 400),
        ("follow", 200),
    ] {
        let resp = client
            .post(format!("{}/api/users/{}/{}", address, id_a, method_path))
            .bearer_auth(&token_b)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), expected, "step {}", method_path);
    }

    let status = client
        .get(format!("{}/api/users/{}/follow-status", address, id_a))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(status["is_following"], true);

    // Exactly one follower despite the toggling.
    let followers = client
        .get(format!("{}/api/users/{}/followers", address, id_a))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(followers["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn feed_shows_own_and_followed_posts() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, id_a) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;

    create_post(&client, &address, &token_a, "from a").await;
    create_post(&client, &address, &token_b, "from b").await;

    // Before following, B's feed has only B's post.
    let feed = client
        .get(format!("{}/api/posts?page=1", address))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let contents: Vec<&str> = feed["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["content"].as_str().unwrap())
        .collect();
    assert!(contents.contains(&"from b"));
    assert!(!contents.contains(&"from a"));

    client
        .post(format!("{}/api/users/{}/follow", address, id_a))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();

    let feed = client
        .get(format!("{}/api/posts?page=1", address))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let contents: Vec<&str> = feed["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["content"].as_str().unwrap())
        .collect();
    assert!(contents.contains(&"from a"));
    assert!(contents.contains(&"from b"));
    assert_eq!(feed["pagination"]["current_page"], 1);
    assert_eq!(feed["pagination"]["items_per_page"], 20);
}

#[tokio::test]
async fn privacy_gate_on_author_listing() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, id_a) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;
    let (token_d, _) = register_and_login(&client, &address).await;

    create_post(&client, &address, &token_a, "a's post").await;

    // Private: nobody but the owner sees the posts; the response is an empty
    // page, not an error.
    let set_private = client
        .put(format!("{}/api/profile/settings", address))
        .bearer_auth(&token_a)
        .json(&json!({ "privacy": "private" }))
        .send()
        .await
        .unwrap();
    assert_eq!(set_private.status().as_u16(), 200);

    let listing = client
        .get(format!("{}/api/posts?author={}", address, id_a))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(listing.status().as_u16(), 200);
    let body = listing.json::<Value>().await.unwrap();
    assert_eq!(body["posts"].as_array().unwrap().len(), 0);

    // Followers-only: a follower sees the posts, a stranger still does not.
    client
        .post(format!("{}/api/users/{}/follow", address, id_a))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    client
        .put(format!("{}/api/profile/settings", address))
        .bearer_auth(&token_a)
        .json(&json!({ "privacy": "followers_only" }))
        .send()
        .await
        .unwrap();

    let follower_view = client
        .get(format!("{}/api/posts?author={}", address, id_a))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(follower_view["posts"].as_array().unwrap().len(), 1);

    let stranger_view = client
        .get(format!("{}/api/posts?author={}", address, id_a))
        .bearer_auth(&token_d)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(stranger_view["posts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn notification_list_marks_read_and_reports_previous_unread() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, _) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token_a, "notify me").await;

    // A liking their own post produces no notification.
    client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();

    // B liking it produces exactly one.
    client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();

    let first = client
        .get(format!("{}/api/notifications", address))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(first.headers()["X-Unread-Count"], "1");
    let body = first.json::<Value>().await.unwrap();
    let items = body["notifications"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["notification_type"], "like");

    // The fetch marked everything read: the second call reports zero unread
    // but the same notification set.
    let second = client
        .get(format!("{}/api/notifications", address))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(second.headers()["X-Unread-Count"], "0");
    let body = second.json::<Value>().await.unwrap();
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn comment_create_and_delete_recounts() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, _) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token_a, "comment here").await;

    let created = client
        .post(format!("{}/api/posts/{}/comments", address, post_id))
        .bearer_auth(&token_b)
        .json(&json!({ "content": "nice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let comment_id = created.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let post = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(post["comment_count"], 1);

    // Only the author may delete.
    let forbidden = client
        .delete(format!("{}/api/comments/{}", address, comment_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let deleted = client
        .delete(format!("{}/api/comments/{}", address, comment_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let post = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(post["comment_count"], 0);
}

#[tokio::test]
async fn reactivated_like_does_not_renotify() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, _) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token_a, "toggle me").await;

    client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();

    let first = client
        .get(format!("{}/api/notifications", address))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(first.headers()["X-Unread-Count"], "1");
    let body = first.json::<Value>().await.unwrap();
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);

    // Unlike and re-like: the old row is reactivated, not re-created, so the
    // author gets no second notification.
    client
        .delete(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    let relike = client
        .post(format!("{}/api/posts/{}/like", address, post_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(relike.status().as_u16(), 200);

    let second = client
        .get(format!("{}/api/notifications", address))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(second.headers()["X-Unread-Count"], "0");
    let body = second.json::<Value>().await.unwrap();
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn refollow_does_not_renotify() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let (token_a, id_a) = register_and_login(&client, &address).await;
    let (token_b, _) = register_and_login(&client, &address).await;

    for action in ["follow", "unfollow", "follow"] {
        let resp = client
            .post(format!("{}/api/users/{}/{}", address, id_a, action))
            .bearer_auth(&token_b)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "step {}", action);
    }

    // The refollow reused the edge; only the original follow notified.
    let listing = client
        .get(format!("{}/api/notifications", address))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(listing.headers()["X-Unread-Count"], "1");
    let body = listing.json::<Value>().await.unwrap();
    let items = body["notifications"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["notification_type"], "follow");
}

#[tokio::test]
async fn notification_stream_opens_with_connection_then_heartbeats() {
    let Some(address) = try_spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;

    let mut response = client
        .get(format!("{}/api/notifications/stream", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Read until the first heartbeat arrives (the interval is 5s).
    let mut body = String::new();
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    while !body.contains("\"type\":\"heartbeat\"") {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        assert!(!remaining.is_zero(), "no heartbeat before deadline: {}", body);
        match tokio::time::timeout(remaining, response.chunk()).await {
            Ok(Ok(Some(chunk))) => body.push_str(&String::from_utf8_lossy(&chunk)),
            other => panic!("stream ended early ({:?} received): {}", other.is_ok(), body),
        }
    }

    // Exactly one connection event, emitted before any heartbeat; a user with
    // no notifications sees zero unread and no new_notification events.
    let connection_at = body.find("\"type\":\"connection\"").expect("no connection event");
    let heartbeat_at = body.find("\"type\":\"heartbeat\"").unwrap();
    assert!(connection_at < heartbeat_at);
    assert_eq!(body.matches("\"type\":\"connection\"").count(), 1);
    assert!(body.contains("\"unread_count\":0"));
    assert!(!body.contains("\"type\":\"new_notification\""));

    // Dropping the response closes the stream; the polling task's next send
    // fails and it exits.
    drop(response);
}
