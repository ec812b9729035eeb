use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    auth, comments,
    config::settings::Settings,
    follows, media, posts,
    rate_limit::{RateLimitConfig, RateLimitLayer},
    users,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub settings: Settings,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> SqlitePool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

/// API routes only, without middleware.
pub fn api_router() -> Router<AppState> {
    let post_router = Router::new()
        .route(
            "/",
            get(posts::handler::list_feed).post(posts::handler::create_post),
        )
        .route(
            "/:id",
            get(posts::handler::get_post).delete(posts::handler::delete_post),
        )
        .route("/:id/like", post(posts::handler::toggle_like))
        .route(
            "/:id/comments",
            get(comments::handler::list_comments).post(comments::handler::add_comment),
        );

    let user_router = Router::new()
        .route("/suggested", get(follows::handler::suggested_users))
        .route("/search/:query", get(users::handler::search_users))
        .route("/profile", put(users::handler::update_profile))
        .route("/account", axum::routing::delete(users::handler::delete_account))
        .route("/:id", get(users::handler::get_profile))
        .route("/:id/posts", get(users::handler::list_user_posts))
        .route("/:id/follow", post(follows::handler::toggle_follow))
        .route("/:id/followers", get(follows::handler::get_followers))
        .route("/:id/following", get(follows::handler::get_following));

    Router::new()
        .route("/register", post(auth::handler::register))
        .route("/login", post(auth::handler::login))
        .route("/me", get(auth::handler::get_me))
        .nest("/posts", post_router)
        .nest("/users", user_router)
        .layer(DefaultBodyLimit::max(media::MAX_BODY_BYTES))
}

/// The full application: API, uploads, static client assets and middleware.
pub fn build_app(state: AppState) -> Router {
    let settings = &state.settings;
    let rate_limit = RateLimitLayer::new(RateLimitConfig {
        max_requests: settings.rate_limit_max,
        window: settings.rate_limit_window,
    });

    Router::new()
        .nest("/api", api_router())
        .nest_service(
            media::UPLOADS_URL_PREFIX,
            ServeDir::new(&settings.upload_dir),
        )
        .fallback_service(ServeDir::new(&settings.static_dir))
        .layer(rate_limit)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
