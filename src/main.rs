use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use log::{error, info};

use callserver::core::config::AppConfig;
use callserver::core::server::run;
use callserver::core::shared::state::AppState;
use callserver::core::shared::utils::{create_conn, run_migrations};
use callserver::storage::FileStorage;
use callserver::users::service::ensure_bootstrap_admin;

async fn init_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn FileStorage>> {
    #[cfg(feature = "drive")]
    if !config.drive.access_key.is_empty() {
        info!("Using drive storage bucket {}", config.drive.bucket);
        let storage = callserver::storage::s3::S3Storage::new(&config.drive).await;
        return Ok(Arc::new(storage));
    }

    info!("Using local media storage at {}", config.media.root);
    let storage = callserver::storage::LocalStorage::new(&config.media.root, &config.media.url);
    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_conn(&config.database.url, config.database.pool_size)
        .context("Failed to create database pool")?;
    if let Err(e) = run_migrations(&pool) {
        error!("Failed to run migrations: {}", e);
        anyhow::bail!("migrations failed: {}", e);
    }
    info!("Database migrations applied");

    if let Some(admin) = config.bootstrap_admin.clone() {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            ensure_bootstrap_admin(&mut conn, &admin).map_err(anyhow::Error::from)
        })
        .await
        .context("Bootstrap task panicked")??;
    }

    let storage = init_storage(&config).await?;
    let state = Arc::new(AppState::new(pool, config, storage)?);

    run(state).await.context("HTTP server failed")
}
