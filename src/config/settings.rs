use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let port: u16 = try_load("PORT", "3000")?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => bail!("JWT_SECRET must be set"),
        };

        let window_secs: u64 = try_load("RATE_LIMIT_WINDOW_SECS", "900")?;

        Ok(Self {
            port,
            addr,
            database_url: try_load("DATABASE_URL", "sqlite://social_media.db")?,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            jwt_secret,
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", "168")?,
            static_dir: try_load("STATIC_DIR", "public")?,
            upload_dir: try_load("UPLOAD_DIR", "public/uploads")?,
            rate_limit_max: try_load("RATE_LIMIT_MAX", "100")?,
            rate_limit_window: Duration::from_secs(window_secs),
        })
    }

    /// Settings for an in-process server: in-memory store, throwaway secret.
    pub fn for_tests(upload_dir: impl Into<PathBuf>) -> Self {
        let upload_dir = upload_dir.into();
        let static_dir = upload_dir
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| upload_dir.clone());

        Self {
            port: 0,
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            static_dir,
            upload_dir,
            rate_limit_max: 10_000,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

fn try_load<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid value for {key}"))
}
