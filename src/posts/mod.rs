use serde::{Deserialize, Serialize};

pub mod handler;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Database model for a post
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A post annotated with its author and live engagement counts for one viewer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
}

/// Page-number pagination (`?page=2&limit=10`).
///
/// There is no total count: a page holding exactly `limit` rows only means
/// more rows *may* exist.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        let page = self.page.unwrap_or(1).max(1);
        (page - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedPost {
    pub post_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}
