mod config;
mod error;
mod routes;
mod store;

use std::sync::Arc;

use config::AppConfig;
use routes::{app_router, AppState};
use store::ScanTable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parcelscan_api=info".parse().expect("valid directive")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "starting parcelscan-api");

    let table = ScanTable::open(&config.db_path)?;
    let state = AppState {
        store: Arc::new(table),
    };
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("parcelscan-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
