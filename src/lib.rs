// Player Performance - cricket performance store with a suitability classifier
// Module declarations

mod commands;
pub mod config;
pub mod model;
pub mod state;

pub use commands::{router, AppState};

use config::ServiceConfig;
use model::PlayerClassifier;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Ignore the error when a logger is already installed
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = ServiceConfig::load()?;
    let addr = config.socket_addr()?;

    // Initialize database
    let db = state::init_db(&config.database_path).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        e
    })?;

    let classifier = PlayerClassifier::open(config.training.clone(), &config.model_path)?;
    let app = AppState::new(
        db,
        classifier,
        config.model_path.clone(),
        config.trace_path.clone(),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Player performance service listening on {}", listener.local_addr()?);

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Player performance service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
