use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the git protocol.
pub fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level(log_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

pub fn default_level(log_level: &str) -> LevelFilter {
    log_level.trim().parse().unwrap_or(LevelFilter::WARN)
}

/// Flips the returned flag to `true` on SIGINT or SIGTERM.
pub fn spawn_shutdown_watch() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::debug!("shutdown signal received");
        let _ = cancel_tx.send(true);
    });
    cancel_rx
}

async fn wait_for_shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(error) => {
            tracing::warn!(error = %error, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_default_level_parses_config_values() {
        assert_eq!(default_level("info"), LevelFilter::INFO);
        assert_eq!(default_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(default_level(" error "), LevelFilter::ERROR);
    }

    #[test]
    fn regression_default_level_falls_back_to_warn() {
        assert_eq!(default_level(""), LevelFilter::WARN);
        assert_eq!(default_level("chatty"), LevelFilter::WARN);
    }
}
