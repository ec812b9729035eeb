use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    auth::jwt,
    config::settings::Settings,
    error::AppError,
    follows::UserSummary,
    media::{self, StagedImage},
    posts::{
        handler::{fetch_posts, PostScope},
        PageQuery,
    },
    response::ApiResponse,
    users::{like_pattern, ProfileResponse, ProfileUpdate, MIN_SEARCH_CHARS, SEARCH_LIMIT},
};

/// Get user profile with counts
/// GET /api/users/:id
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let profile = sqlx::query_as::<_, ProfileResponse>(
        r#"
        SELECT
            u.id, u.username, u.full_name, u.bio, u.profile_picture, u.created_at,
            (SELECT COUNT(*) FROM posts WHERE user_id = u.id) AS posts_count,
            (SELECT COUNT(*) FROM followers WHERE following_id = u.id) AS followers_count,
            (SELECT COUNT(*) FROM followers WHERE follower_id = u.id) AS following_count,
            EXISTS(SELECT 1 FROM followers WHERE follower_id = $1 AND following_id = u.id) AS is_following
        FROM users u
        WHERE u.id = $2
        "#,
    )
    .bind(claims.sub)
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch user profile: {:?}", e);
        AppError::InternalServerError
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::success(profile))
}

/// Update own profile
/// PUT /api/users/profile (multipart: full_name, bio, profile_picture?)
pub async fn update_profile(
    State(pool): State<SqlitePool>,
    State(settings): State<Settings>,
    claims: jwt::Claims,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut update = ProfileUpdate::default();
    let mut picture: Option<StagedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(media::multipart_error)? {
        match field.name() {
            Some("full_name") => update.full_name = Some(media::read_text(field).await?),
            Some("bio") => update.bio = Some(media::read_text(field).await?),
            Some("profile_picture") => picture = media::accept_image(field).await?,
            _ => media::skip(field).await?,
        }
    }

    if update.full_name.as_deref().map_or(0, |s| s.chars().count()) > 100 {
        return Err(AppError::BadRequest(
            "Full name must be at most 100 characters".to_string(),
        ));
    }
    if update.bio.as_deref().map_or(0, |s| s.chars().count()) > 500 {
        return Err(AppError::BadRequest(
            "Bio must be at most 500 characters".to_string(),
        ));
    }

    // The previous picture file is left on disk.
    if let Some(picture) = picture {
        update.profile_picture = Some(picture.store(&settings.upload_dir).await?);
    }

    let result = sqlx::query(
        r#"
        UPDATE users SET
            full_name = COALESCE($1, full_name),
            bio = COALESCE($2, bio),
            profile_picture = COALESCE($3, profile_picture)
        WHERE id = $4
        "#,
    )
    .bind(update.full_name.as_deref().map(str::trim))
    .bind(update.bio.as_deref().map(str::trim))
    .bind(&update.profile_picture)
    .bind(claims.sub)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update profile: {:?}", e);
        AppError::InternalServerError
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(ApiResponse::ok("Profile updated successfully"))
}

/// Posts written by one user
/// GET /api/users/:id/posts?page&limit
pub async fn list_user_posts(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(user_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let posts = fetch_posts(&pool, claims.sub, PostScope::ByAuthor(user_id), page).await?;
    Ok(ApiResponse::success(posts))
}

/// Case-insensitive search on username and full name
/// GET /api/users/search/:query
pub async fn search_users(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(query): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_CHARS {
        return Ok(ApiResponse::success(Vec::<UserSummary>::new()));
    }

    let users = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT
            u.id, u.username, u.full_name, u.profile_picture,
            EXISTS(SELECT 1 FROM followers WHERE follower_id = $1 AND following_id = u.id) AS is_following
        FROM users u
        WHERE LOWER(u.username) LIKE LOWER($2) ESCAPE '\'
           OR LOWER(COALESCE(u.full_name, '')) LIKE LOWER($2) ESCAPE '\'
        ORDER BY u.username
        LIMIT $3
        "#,
    )
    .bind(claims.sub)
    .bind(like_pattern(query))
    .bind(SEARCH_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to search users: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success(users))
}

/// Delete own account and everything that references it
/// DELETE /api/users/account
pub async fn delete_account(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub;

    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    // Children before parents: foreign keys are enforced.
    for statement in [
        "DELETE FROM likes WHERE user_id = $1",
        "DELETE FROM likes WHERE post_id IN (SELECT id FROM posts WHERE user_id = $1)",
        "DELETE FROM comments WHERE user_id = $1",
        "DELETE FROM comments WHERE post_id IN (SELECT id FROM posts WHERE user_id = $1)",
        "DELETE FROM posts WHERE user_id = $1",
        "DELETE FROM followers WHERE follower_id = $1 OR following_id = $1",
    ] {
        sqlx::query(statement)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::store("Failed to delete account data"))?;
    }

    let removed = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::store("Failed to delete user account"))?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    tracing::info!(user_id, "account deleted");
    Ok(ApiResponse::ok("Account deleted successfully"))
}
