use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use stateset_forecast as forecast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = forecast::config::load_config().context("failed to load configuration")?;
    forecast::config::init_tracing(cfg.log_level(), cfg.log_json);

    if cfg.is_production() && cfg.cors_allow_any_origin {
        warn!("Permissive CORS enabled in production via APP__CORS_ALLOW_ANY_ORIGIN");
    }

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    info!(
        backend_url = %cfg.backend_url,
        timeout_secs = cfg.backend_timeout_secs,
        lookback_days = cfg.lookback_days,
        "forecast backend configured"
    );
    let state = forecast::AppState::from_config(cfg).context("failed to build app state")?;
    let app = forecast::app_router(state);

    info!("stateset-forecast listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
