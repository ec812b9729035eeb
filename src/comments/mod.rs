use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod handler;

/// Database model for a comment
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Request payload for creating a comment
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateComment {
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub content: String,
}

/// Comment joined with the commenter's identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedComment {
    pub comment_id: i64,
}
