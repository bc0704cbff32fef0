use anyhow::{Context, Result};
use content_pages::config::Config;
use content_pages::db::{ContentSnapshot, Database};
use content_pages::server::{self, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("content_pages=info".parse()?),
        )
        .init();

    info!("Starting content pages server");

    let config = Config::from_env()?;

    let snapshot = match (&config.database_url, &config.content_file) {
        (Some(database_url), _) => {
            info!("Loading content from PostgreSQL");
            Database::connect(database_url)
                .await?
                .load_snapshot()
                .await?
        }
        (None, Some(content_file)) => {
            info!("Loading content from {}", content_file);
            ContentSnapshot::from_json_file(content_file)?
        }
        (None, None) => anyhow::bail!("No content source configured"),
    };

    let (registry, store) = snapshot.into_parts()?;
    info!(
        "Default locale {}, {} mode",
        config.default_locale,
        if registry.is_multi_language() {
            "multi-language"
        } else {
            "single-language"
        }
    );

    let state = Arc::new(AppState::new(
        registry,
        &config.default_locale,
        Arc::new(store),
    ));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .context(format!("Failed to bind port {}", config.port))?;
    info!("✓ Listening on {}", listener.local_addr()?);

    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
