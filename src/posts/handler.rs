use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use sqlx::{Row, SqlitePool};

use crate::{
    auth::jwt,
    config::settings::Settings,
    error::AppError,
    media::{self, StagedImage},
    posts::{CreatedPost, Post, LikeResponse, PageQuery, PostResponse, MAX_CONTENT_CHARS},
    response::ApiResponse,
};

/// Which posts an annotated listing covers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PostScope {
    All,
    ByAuthor(i64),
}

fn annotated_posts_sql(filter: &str, paged: bool) -> String {
    format!(
        r#"
        SELECT
            p.id, p.user_id, p.content, p.image_url, p.created_at,
            u.username, u.full_name, u.profile_picture,
            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
            EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = $1) AS is_liked
        FROM posts p
        JOIN users u ON p.user_id = u.id
        {}
        ORDER BY p.created_at DESC, p.id DESC
        {}
        "#,
        filter,
        if paged { "LIMIT $2 OFFSET $3" } else { "" }
    )
}

/// Newest-first posts annotated for `viewer_id`.
pub(crate) async fn fetch_posts(
    pool: &SqlitePool,
    viewer_id: i64,
    scope: PostScope,
    page: PageQuery,
) -> Result<Vec<PostResponse>, AppError> {
    let query_str = match scope {
        PostScope::All => annotated_posts_sql("", true),
        PostScope::ByAuthor(_) => annotated_posts_sql("WHERE p.user_id = $4", true),
    };

    let mut query = sqlx::query_as::<_, PostResponse>(&query_str)
        .bind(viewer_id)
        .bind(page.limit())
        .bind(page.offset());
    if let PostScope::ByAuthor(author_id) = scope {
        query = query.bind(author_id);
    }

    query.fetch_all(pool).await.map_err(|e| {
        tracing::error!("Failed to fetch posts: {:?}", e);
        AppError::InternalServerError
    })
}

pub(crate) async fn fetch_post(
    pool: &SqlitePool,
    viewer_id: i64,
    post_id: i64,
) -> Result<PostResponse, AppError> {
    sqlx::query_as::<_, PostResponse>(&annotated_posts_sql("WHERE p.id = $2", false))
        .bind(viewer_id)
        .bind(post_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::store("Failed to fetch post"))?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

async fn ensure_post_exists(pool: &SqlitePool, post_id: i64) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;
    Ok(())
}

/// Reverse-chronological feed
/// GET /api/posts?page&limit
pub async fn list_feed(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let posts = fetch_posts(&pool, claims.sub, PostScope::All, page).await?;
    Ok(ApiResponse::success(posts))
}

/// Create a post with optional image
/// POST /api/posts (multipart: content, image?)
pub async fn create_post(
    State(pool): State<SqlitePool>,
    State(settings): State<Settings>,
    claims: jwt::Claims,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut content = String::new();
    let mut image: Option<StagedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(media::multipart_error)? {
        match field.name() {
            Some("content") => content = media::read_text(field).await?,
            Some("image") => image = media::accept_image(field).await?,
            _ => media::skip(field).await?,
        }
    }

    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }

    let image_url = match image {
        Some(image) => Some(image.store(&settings.upload_dir).await?),
        None => None,
    };

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (user_id, content, image_url, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(claims.sub)
    .bind(content)
    .bind(&image_url)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(AppError::insert("Failed to create post"))?;

    tracing::info!(post_id = post.id, user_id = claims.sub, "post created");

    Ok(ApiResponse::success_with_message(
        "Post created successfully",
        CreatedPost { post_id: post.id },
    )
    .created())
}

/// Single annotated post
/// GET /api/posts/:id
pub async fn get_post(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, claims.sub, post_id).await?;
    Ok(ApiResponse::success(post))
}

/// Delete own post together with its comments and likes
/// DELETE /api/posts/:id
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let row = sqlx::query("SELECT user_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let owner_id: i64 = row.get("user_id");
    if owner_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only delete your own posts".to_string(),
        ));
    }

    for statement in [
        "DELETE FROM likes WHERE post_id = $1",
        "DELETE FROM comments WHERE post_id = $1",
        "DELETE FROM posts WHERE id = $1",
    ] {
        sqlx::query(statement)
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::store("Failed to delete post"))?;
    }

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    tracing::info!(post_id, user_id = claims.sub, "post deleted");
    Ok(ApiResponse::ok("Post deleted successfully"))
}

/// Like or unlike a post
/// POST /api/posts/:id/like
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_post_exists(&pool, post_id).await?;

    let removed = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(claims.sub)
        .execute(&pool)
        .await
        .map_err(AppError::store("Failed to unlike post"))?
        .rows_affected();

    let liked = if removed > 0 {
        false
    } else {
        // A concurrent like may win the insert; either way the row now exists.
        sqlx::query(
            r#"
            INSERT INTO likes (post_id, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(claims.sub)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .map_err(AppError::insert("Failed to like post"))?;
        true
    };

    let likes_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success_with_message(
        if liked { "Post liked" } else { "Post unliked" },
        LikeResponse { liked, likes_count },
    ))
}
