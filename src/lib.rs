pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod report;
pub mod storage;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core_state::CoreState;

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Cannot start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config)) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> Result<(), String> {
    for dir in [&config.data_dir, &config.media_root] {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Cannot create {}: {e}", dir.display()))?;
    }
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Cannot create {}: {e}", parent.display()))?;
    }

    // Open once up front so migrations run before the first request.
    db::open_database(&config.database_path)
        .map_err(|e| format!("Cannot open database {}: {e}", config.database_path.display()))?;
    tracing::info!(
        database = %config.database_path.display(),
        media_root = %config.media_root.display(),
        "Storage ready"
    );

    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::new(config));
    let server = api::start_server(core, bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {e}");
    }
    server.stop().await;
    Ok(())
}
