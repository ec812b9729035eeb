use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::jwt,
    comments::{Comment, CommentResponse, CreateComment, CreatedComment},
    error::AppError,
    response::ApiResponse,
};

/// Add a comment to a post
/// POST /api/posts/:id/comments
pub async fn add_comment(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "Comment content is required".to_string(),
        ));
    }
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    sqlx::query("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (post_id, user_id, content, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(post_id)
    .bind(claims.sub)
    .bind(content)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(AppError::insert("Failed to create comment"))?;

    Ok(ApiResponse::success_with_message(
        "Comment added successfully",
        CreatedComment {
            comment_id: comment.id,
        },
    )
    .created())
}

/// Comments on a post, oldest first
/// GET /api/posts/:id/comments
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    _claims: jwt::Claims,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT
            c.id, c.post_id, c.user_id, c.content, c.created_at,
            u.username, u.full_name, u.profile_picture
        FROM comments c
        JOIN users u ON c.user_id = u.id
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch comments: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success(comments))
}
