// src/privacy.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Profile visibility setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    Public,
    FollowersOnly,
    Private,
}

impl Privacy {
    pub const VALUES: [&'static str; 3] = ["public", "followers_only", "private"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Privacy::Public),
            "followers_only" => Some(Privacy::FollowersOnly),
            "private" => Some(Privacy::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::FollowersOnly => "followers_only",
            Privacy::Private => "private",
        }
    }
}

/// The privacy gate: may `viewer` see `subject`'s posts and profile detail?
///
/// Owner always; public always; followers_only only when the viewer actively
/// follows the subject; private is owner-only. Pure so the rule is testable
/// without a database.
pub fn can_view(viewer: Uuid, subject: Uuid, privacy: Privacy, is_follower: bool) -> bool {
    if viewer == subject {
        return true;
    }
    match privacy {
        Privacy::Public => true,
        Privacy::FollowersOnly => is_follower,
        Privacy::Private => false,
    }
}

/// True when an active follow edge exists from `follower` to `following`.
pub async fn is_following(pool: &PgPool, follower: Uuid, following: Uuid) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM follows
            WHERE follower_id = $1 AND following_id = $2 AND is_active
        )",
    )
    .bind(follower)
    .bind(following)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Evaluate the privacy gate for a request.
///
/// Runs fresh queries every time: follow state changes frequently and must
/// not be cached across requests. Admin viewers bypass the gate.
pub async fn viewer_can_see(
    pool: &PgPool,
    viewer: Uuid,
    viewer_is_admin: bool,
    subject: Uuid,
) -> Result<bool, AppError> {
    if viewer == subject || viewer_is_admin {
        return Ok(true);
    }

    let privacy_value = sqlx::query_scalar::<_, String>(
        "SELECT privacy FROM profiles WHERE user_id = $1",
    )
    .bind(subject)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    // An unknown stored value falls back to public, matching the column default.
    let privacy = Privacy::parse(&privacy_value).unwrap_or(Privacy::Public);

    let is_follower = if privacy == Privacy::FollowersOnly {
        is_following(pool, viewer, subject).await?
    } else {
        false
    };

    Ok(can_view(viewer, subject, privacy, is_follower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_always_sees_own_content() {
        let u = Uuid::new_v4();
        assert!(can_view(u, u, Privacy::Private, false));
    }

    #[test]
    fn public_is_visible_to_anyone() {
        assert!(can_view(Uuid::new_v4(), Uuid::new_v4(), Privacy::Public, false));
    }

    #[test]
    fn followers_only_requires_active_follow() {
        let viewer = Uuid::new_v4();
        let subject = Uuid::new_v4();
        assert!(!can_view(viewer, subject, Privacy::FollowersOnly, false));
        assert!(can_view(viewer, subject, Privacy::FollowersOnly, true));
    }

    #[test]
    fn private_is_owner_only() {
        let viewer = Uuid::new_v4();
        let subject = Uuid::new_v4();
        assert!(!can_view(viewer, subject, Privacy::Private, true));
    }

    #[test]
    fn parse_round_trip() {
        for value in Privacy::VALUES {
            assert_eq!(Privacy::parse(value).unwrap().as_str(), value);
        }
        assert!(Privacy::parse("friends").is_none());
    }
}
