// src/counters.rs
//
// Denormalized engagement counters on posts. The counters are never
// incremented or decremented in place: every trigger recomputes them from the
// active like/comment rows, so interleaved toggles and deletes converge to
// the correct value instead of drifting.

use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

/// Recompute `like_count` and `comment_count` for one post.
///
/// A single UPDATE restricted to the two counter columns, so concurrent edits
/// to content or category are never clobbered.
pub async fn recount(pool: &PgPool, post_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE posts SET
            like_count = (SELECT COUNT(*) FROM likes WHERE post_id = $1 AND is_active),
            comment_count = (SELECT COUNT(*) FROM comments WHERE post_id = $1 AND is_active)
         WHERE id = $1",
    )
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Recount, logging instead of failing.
///
/// Reconciliation is a dependent side effect: the like/comment/follow that
/// triggered it has already succeeded, and a failed recount is repaired by
/// the next trigger or the drift sweep.
pub async fn recount_or_log(pool: &PgPool, post_id: Uuid) {
    if let Err(e) = recount(pool, post_id).await {
        tracing::warn!("Counter recount failed for post {}: {}", post_id, e);
    }
}

/// Repair every post whose stored counters disagree with the active rows.
/// Returns the number of rows fixed.
pub async fn sweep(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE posts SET like_count = sub.lc, comment_count = sub.cc
         FROM (
            SELECT p.id,
                   (SELECT COUNT(*) FROM likes WHERE post_id = p.id AND is_active) AS lc,
                   (SELECT COUNT(*) FROM comments WHERE post_id = p.id AND is_active) AS cc
            FROM posts p
         ) sub
         WHERE posts.id = sub.id
           AND (posts.like_count <> sub.lc OR posts.comment_count <> sub.cc)",
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Background convergence loop, spawned once at startup.
/// Best effort: failures are logged and the next tick retries.
pub fn spawn_sweeper(pool: PgPool, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("Counter drift sweeper disabled");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sweep(&pool).await {
                Ok(0) => {}
                Ok(fixed) => tracing::info!("Counter sweep repaired {} post(s)", fixed),
                Err(e) => tracing::warn!("Counter sweep failed: {}", e),
            }
        }
    });
}
