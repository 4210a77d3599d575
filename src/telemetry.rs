use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

const DEFAULT_FILTER: &str = "info,hyper=warn,tower_http=info,sqlx=warn";

pub fn init_tracing(cfg: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if cfg.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::SignalKind;

        match signal::unix::signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => log_interrupt(result),
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "shutdown signal received"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C"),
        }
    }

    log_interrupt(signal::ctrl_c().await);
}

fn log_interrupt(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!(signal = "SIGINT", "shutdown signal received"),
        Err(e) => warn!(error = %e, "Ctrl+C handler failed, shutting down"),
    }
}
