use mimalloc::MiMalloc;
use school_registry::config::Config;
use school_registry::db::SchoolsStorage;
use school_registry::service::upload_store::UploadStore;
use school_registry::{SchoolsState, schools_router};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.server.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        db_host = %cfg.database.host.as_deref().unwrap_or("<url>"),
        db_port = cfg.database.port,
        db_name = %cfg.database.database.as_deref().unwrap_or("<url>"),
        ssl = cfg.database.ssl,
        connection_limit = cfg.database.connection_limit,
        public_dir = %cfg.server.public_dir.display(),
        max_image_bytes = cfg.server.max_image_bytes,
        loglevel = %cfg.server.loglevel,
    );

    let storage = SchoolsStorage::connect(
        &cfg.database.connection_url()?,
        cfg.database.connection_limit,
    )
    .await?;
    storage.init_schema().await?;

    let uploads = UploadStore::new(&cfg.server.public_dir, cfg.server.max_image_bytes);
    uploads.prepare().await?;

    let state = SchoolsState::new(storage.clone(), uploads);
    let app = schools_router(state);

    let listener = TcpListener::bind(&cfg.server.bind).await?;
    info!("HTTP server listening on {}", cfg.server.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("closing database pool");
    storage.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
