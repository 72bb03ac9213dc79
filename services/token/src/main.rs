use anyhow::Context;
use rust_common::{init_tracing, TracingConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use token_rotation::alert::{AlertSink, SmtpAlertSink};
use token_rotation::config::{Config, StoreBackend};
use token_rotation::http::{self, AppState};
use token_rotation::jwt::TokenCodec;
use token_rotation::storage::{InMemorySessionStore, RedisSessionStore, SessionStore};
use token_rotation::RotationEngine;
use tracing::{error, info};

const SERVICE_NAME: &str = "token-rotation-service";
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    init_tracing(
        &TracingConfig::for_environment(config.environment.as_str())
            .with_service_name(SERVICE_NAME)
            .with_log_level(config.log_level.clone()),
    );
    info!(environment = config.environment.as_str(), "Starting token rotation service");

    let store = build_store(&config).await?;
    let alerts: Arc<dyn AlertSink> =
        Arc::new(SmtpAlertSink::new(&config.smtp).context("Invalid SMTP configuration")?);
    let codec = Arc::new(TokenCodec::new(&config.jwt_secret));

    let engine = Arc::new(RotationEngine::new(
        codec,
        store,
        alerts,
        config.rotation_settings(),
    ));

    let app = http::router(AppState {
        engine,
        trust_forwarded_for: config.trust_forwarded_for,
    });

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Token rotation service listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Token rotation service shutdown complete");
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn SessionStore>> {
    match &config.store {
        StoreBackend::Memory => {
            let store = Arc::new(InMemorySessionStore::new());
            let janitor = Arc::clone(&store);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(PURGE_INTERVAL);
                loop {
                    ticker.tick().await;
                    let purged = janitor.purge_expired().await;
                    if purged > 0 {
                        info!(purged, "Purged expired sessions");
                    }
                }
            });
            info!("Using in-memory session store");
            Ok(store)
        }
        StoreBackend::Redis { url } => {
            let store = RedisSessionStore::new(url)
                .await
                .context("Failed to connect to Redis")?;
            info!("Using Redis session store");
            Ok(Arc::new(store))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
