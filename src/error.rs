use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    InternalServerError,
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests { retry_after_secs: u64 },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Duplicate username/email is reported as a plain bad request.
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Logs a store failure and collapses it into a generic 500.
    pub fn store(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
        move |e| {
            tracing::error!("{}: {:?}", context, e);
            AppError::InternalServerError
        }
    }

    /// Like [`AppError::store`], but a row whose author no longer exists is a 404.
    /// Tokens outlive deleted accounts, so inserts can hit the `users` foreign key.
    pub fn insert(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
        move |e| {
            if is_foreign_key_violation(&e) {
                tracing::debug!("{}: referenced row is gone", context);
                AppError::NotFound("User not found".to_string())
            } else {
                tracing::error!("{}: {:?}", context, e);
                AppError::InternalServerError
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InternalServerError => write!(f, "Internal Server Error"),
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::TooManyRequests { .. } => {
                write!(f, "Too many requests, please try again later")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));

        match self {
            AppError::TooManyRequests { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// True when the error is a UNIQUE constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// True when the error is a FOREIGN KEY constraint violation.
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_bad_request() {
        let err = AppError::Conflict("Username or email already exists".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Username or email already exists");
    }

    #[test]
    fn internal_error_hides_details() {
        let response = AppError::InternalServerError.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rate_limited_response_sets_retry_after() {
        let response = AppError::TooManyRequests {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[tokio::test]
    async fn dangling_author_insert_is_not_found() {
        let pool = crate::db::connect("sqlite::memory:", 1).await.unwrap();
        let err = sqlx::query("INSERT INTO posts (user_id, content, created_at) VALUES ($1, $2, $3)")
            .bind(42_i64)
            .bind("orphan")
            .bind(chrono::Utc::now())
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(is_foreign_key_violation(&err));
        assert!(!is_unique_violation(&err));
        let mapped = AppError::insert("Failed to create post")(err);
        assert_eq!(mapped.status(), StatusCode::NOT_FOUND);
    }
}
