use std::sync::Arc;

use anyhow::Context as _;
use warden_api::config::{ServerConfig, StorageConfig};
use warden_api::state::AppState;
use warden_core::{Adapter, AssetLoader};
use warden_infra::{InMemoryAdapter, PostgresAdapter, StaticAssetLoader};

const POSTGRES_MAX_CONNECTIONS: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let adapter: Arc<dyn Adapter> = match &config.storage {
        StorageConfig::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            Arc::new(InMemoryAdapter::new())
        }
        StorageConfig::Postgres { database_url } => {
            let adapter = PostgresAdapter::connect(database_url, POSTGRES_MAX_CONNECTIONS)
                .await
                .context("failed to connect to postgres")?;
            let applied = adapter.migrate().await.context("failed to apply migrations")?;
            tracing::info!(?applied, "migrations applied");
            Arc::new(adapter)
        }
    };
    let loader: Arc<dyn AssetLoader> = Arc::new(StaticAssetLoader::new(config.static_root.clone()));
    let state = Arc::new(AppState::new(&config.auth, adapter, loader));

    if let Some(admin) = config.admin.clone() {
        let seeded = Arc::clone(&state);
        let created = tokio::task::spawn_blocking(move || {
            seeded.write(|tx| {
                seeded
                    .users
                    .bootstrap_admin(tx, &admin.username, &admin.password, admin.rank)
            })
        })
        .await
        .context("bootstrap task failed")?
        .context("failed to bootstrap admin")?;
        if created {
            tracing::info!("bootstrap admin created");
        }
    }

    let app = warden_api::app::build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
