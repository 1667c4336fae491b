use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

/// Placeholder extraction backend.
///
/// Receipt extraction needs an external OCR/vision service; until one is
/// configured every `/extract` call answers 502.
struct UnconfiguredExtractor;

#[async_trait::async_trait]
impl server::BillExtractor for UnconfiguredExtractor {
    async fn extract(
        &self,
        _image: &[u8],
    ) -> Result<api_types::extract::ExtractedBill, server::ExtractionError> {
        Err(server::ExtractionError(
            "no extraction backend configured".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tabsplit={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    if let Some(server) = settings.server {
        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let db = match parse_database(&server.database).await {
                Ok(db) => db,
                Err(err) => {
                    tracing::error!("failed to initialize database: {err}");
                    return;
                }
            };

            let engine = match engine::Engine::builder()
                .database(db.clone())
                .gateway_secret(server.gateway_secret.into_bytes())
                .build()
            {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!("failed to build engine from database: {err}");
                    return;
                }
            };
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            let extractor = Arc::new(UnconfiguredExtractor);
            if let Err(err) = server::run_with_listener(engine, db, extractor, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
