use anyhow::Context;
use dotenvy::dotenv;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use adapter::cache::build_dedup_store;
use server::{build_counter, build_router, config::Settings, promote_site_owner, state::AppState};
use storage::Db;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let db = Db::new(&settings.database.url).await?;
    promote_site_owner(&db, &settings.security).await?;

    let store = build_dedup_store(settings.redis.url.as_deref(), settings.redis.timeout())
        .context("Failed to initialise dedup store")?;
    let counter = build_counter(store, &settings.counter);

    let (tx_cmd, rx_cmd) = mpsc::channel(100);
    let cancel_token = CancellationToken::new();

    let mail_config = settings.mail.to_adapter();
    let worker_token = cancel_token.clone();
    let mail_worker = tokio::spawn(async move {
        if let Err(e) = adapter::start_with_cancel_token(mail_config, rx_cmd, worker_token).await {
            error!("Mail worker crashed: {:?}", e);
        }
    });

    let purge_db = db.clone();
    let purge_token = cancel_token.clone();
    let session_purger = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => match purge_db.purge_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => info!("Purged {} expired sessions", n),
                    Err(e) => error!("Session purge failed: {:?}", e),
                },
                _ = purge_token.cancelled() => break,
            }
        }
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState {
        db,
        counter,
        mailer: tx_cmd,
        settings: Arc::new(settings),
    };
    let app = build_router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // HTTP 停止后再通知后台任务退出
    cancel_token.cancel();
    let _ = tokio::join!(mail_worker, session_purger);
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
