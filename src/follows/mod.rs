use serde::{Deserialize, Serialize};

pub mod handler;

/// Database model for a follow relationship
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A user card as shown in follower lists, suggestions and search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
    pub is_following: bool, // Whether the viewer follows this user
}

/// Response for follow/unfollow actions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowActionResponse {
    pub following: bool,
    pub followers_count: i64,
}

pub const SUGGESTION_LIMIT: i64 = 5;
