pub mod app;
pub mod auth;
pub mod client;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod follows;
pub mod media;
pub mod posts;
pub mod rate_limit;
pub mod response;
pub mod users;

pub use app::{build_app, AppState};
