// Shieldgate API server
// Decision: Without DATABASE_URL the in-memory store is used (development only;
//           production config requires a database)

use anyhow::{Context, Result};
use shieldgate_api::{build_app, providers, AppContext};
use shieldgate_core::AppConfig;
use shieldgate_storage::StorageBackend;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shieldgate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("shieldgate-api starting...");

    let config = AppConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        environment = ?config.environment,
        mock_provider = config.use_mock_provider,
        "Configuration loaded"
    );

    let db = match &config.database_url {
        Some(url) => {
            let db = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database, migrations applied");
            db
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            StorageBackend::in_memory()
        }
    };

    let action_source = providers::create_action_source(&config)?;
    let shield = providers::create_shield_for(&config);
    let signer = providers::create_signer(&config)?;

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    if config.cors_allowed_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_allowed_origins, "CORS origins configured");
    }

    let app = build_app(AppContext {
        db,
        action_source,
        shield,
        signer,
        api_key: config.app_api_key.clone(),
        api_prefix: config.api_prefix.clone(),
        cors_allowed_origins: config.cors_allowed_origins.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
