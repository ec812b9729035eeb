use serde::{Deserialize, Serialize};

pub mod handler;

pub const SEARCH_LIMIT: i64 = 20;
pub const MIN_SEARCH_CHARS: usize = 2;

/// Public profile with computed counts relative to the viewer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_following: bool,
}

/// Fields of a profile update; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Escapes LIKE wildcards so the query matches literally.
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("ali"), "%ali%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
