//! botwrap server binary

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use botwrap::api::{create_router, AppState, Credentials};
use botwrap::config::{AppConfig, LogFormat};
use botwrap::lookup::LookupService;
use botwrap::storage::{RecordStore, SqliteRecordStore};
use botwrap::upstream::{
    build_http_client, HttpAddressNormalizer, HttpIncidentFeed, HttpSubscriberLookup,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    config.validate().context("invalid configuration")?;

    tracing::info!(path = %config.database.path, "Opening record store");
    let store = SqliteRecordStore::connect(&config.database.path, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.path))?;
    store
        .migrate()
        .await
        .context("failed to migrate database schema")?;
    let store: Arc<dyn RecordStore> = Arc::new(store);

    let http = build_http_client()?;
    let subscribers = Arc::new(HttpSubscriberLookup::new(http.clone(), &config.subscriber));
    let addresses = Arc::new(HttpAddressNormalizer::new(http.clone(), &config.address));
    let incidents = Arc::new(HttpIncidentFeed::new(http, &config.incidents));

    let lookup = Arc::new(LookupService::new(
        store.clone(),
        subscribers,
        addresses,
        config.lookup.max_age(),
    ));
    tracing::info!(max_age_days = config.lookup.max_age_days, "Lookup cache configured");

    let state = AppState::new(
        store,
        lookup,
        incidents,
        Credentials::from(&config.auth),
    );
    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("botwrap=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }

    Ok(())
}
