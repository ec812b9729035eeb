use axum::{extract::State, response::IntoResponse, Json};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::{jwt, utils, AuthResponse, LoginUser, RegisterUser, User, UserResponse},
    config::settings::Settings,
    error::{is_unique_violation, AppError},
    response::ApiResponse,
};

/// Register a new account
/// POST /api/register
pub async fn register(
    State(pool): State<SqlitePool>,
    State(settings): State<Settings>,
    Json(payload): Json<RegisterUser>,
) -> Result<impl IntoResponse, AppError> {
    if !payload.has_required_fields() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_hash = utils::hash_password_blocking(payload.password.clone())
        .await
        .map_err(|e| {
            tracing::error!("Password hashing failed: {:?}", e);
            AppError::InternalServerError
        })?;

    let full_name = payload
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, full_name, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(payload.username.trim())
    .bind(payload.email.trim())
    .bind(&password_hash)
    .bind(full_name)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e: sqlx::Error| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already exists".to_string())
        } else {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        }
    })?;

    tracing::info!(user_id = user.id, "registered {}", user.username);

    let token = jwt::create_token(
        user.id,
        &user.username,
        &settings.jwt_secret,
        settings.token_ttl_hours,
    )
    .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AuthResponse {
        message: "User registered successfully".to_string(),
        token,
        user: UserResponse::from(user),
    })
    .created())
}

/// Exchange credentials for a token
/// POST /api/login
pub async fn login(
    State(pool): State<SqlitePool>,
    State(settings): State<Settings>,
    Json(payload): Json<LoginUser>,
) -> Result<impl IntoResponse, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(payload.username.trim())
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or_else(invalid)?;

    utils::verify_password_blocking(user.password_hash.clone(), payload.password)
        .await
        .map_err(|_| invalid())?;

    let token = jwt::create_token(
        user.id,
        &user.username,
        &settings.jwt_secret,
        settings.token_ttl_hours,
    )
    .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: UserResponse::from(user),
    }))
}

/// The authenticated user's own record
/// GET /api/me
pub async fn get_me(
    State(pool): State<SqlitePool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::success(UserResponse::from(user)))
}
