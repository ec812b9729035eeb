use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    auth::jwt,
    error::AppError,
    follows::{Follow, FollowActionResponse, UserSummary, SUGGESTION_LIMIT},
    response::ApiResponse,
};

/// Follow or unfollow a user
/// POST /api/users/:id/follow
pub async fn toggle_follow(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Can't follow yourself
    if claims.sub == user_id {
        return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
    }

    // Verify target user exists
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let removed = sqlx::query("DELETE FROM followers WHERE follower_id = $1 AND following_id = $2")
        .bind(claims.sub)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(AppError::store("Failed to unfollow user"))?
        .rows_affected();

    let following = if removed > 0 {
        false
    } else {
        // A concurrent follow may win the insert; either way the edge now exists.
        let inserted = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO followers (follower_id, following_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(claims.sub)
        .bind(user_id)
        .bind(chrono::Utc::now())
        .fetch_optional(&pool)
        .await
        .map_err(AppError::insert("Failed to follow user"))?;

        if let Some(edge) = inserted {
            tracing::debug!(edge_id = edge.id, "{} -> {} followed", edge.follower_id, edge.following_id);
        }
        true
    };

    let followers_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM followers WHERE following_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success_with_message(
        if following { "User followed" } else { "User unfollowed" },
        FollowActionResponse {
            following,
            followers_count,
        },
    ))
}

/// Get a user's followers
/// GET /api/users/:id/followers
pub async fn get_followers(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let followers = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT
            u.id, u.username, u.full_name, u.profile_picture,
            EXISTS(SELECT 1 FROM followers v WHERE v.follower_id = $1 AND v.following_id = u.id) AS is_following
        FROM followers f
        JOIN users u ON f.follower_id = u.id
        WHERE f.following_id = $2
        ORDER BY f.created_at DESC, f.id DESC
        "#,
    )
    .bind(claims.sub)
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch followers: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success(followers))
}

/// Get users that a user is following
/// GET /api/users/:id/following
pub async fn get_following(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let following = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT
            u.id, u.username, u.full_name, u.profile_picture,
            EXISTS(SELECT 1 FROM followers v WHERE v.follower_id = $1 AND v.following_id = u.id) AS is_following
        FROM followers f
        JOIN users u ON f.following_id = u.id
        WHERE f.follower_id = $2
        ORDER BY f.created_at DESC, f.id DESC
        "#,
    )
    .bind(claims.sub)
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch following: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success(following))
}

/// Random users the viewer does not follow yet
/// GET /api/users/suggested
pub async fn suggested_users(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let suggestions = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT
            u.id, u.username, u.full_name, u.profile_picture,
            FALSE AS is_following
        FROM users u
        WHERE u.id <> $1
          AND NOT EXISTS (
              SELECT 1 FROM followers f
              WHERE f.follower_id = $1 AND f.following_id = u.id
          )
        ORDER BY RANDOM()
        LIMIT $2
        "#,
    )
    .bind(claims.sub)
    .bind(SUGGESTION_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Follow suggestions error: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success(suggestions))
}
