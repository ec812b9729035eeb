use std::net::SocketAddr;

use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use socialhub_backend::{build_app, config::settings::Settings, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("socialhub_backend=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let pool = db::connect(&settings.database_url, settings.db_max_connections).await?;

    tokio::fs::create_dir_all(&settings.upload_dir).await?;

    let app = build_app(AppState {
        pool,
        settings: settings.clone(),
    });

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
