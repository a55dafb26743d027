use tracing::*;

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c {}", err);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            error!("Failed to listen for SIGTERM {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on ctrl-c or SIGTERM, whichever comes first.
///
/// systemd stops units with SIGTERM, both have to reach the loops so the
/// motors are left in neutral.
pub async fn shutdown_signal() {
    tokio::select! {
        _ = ctrl_c() => info!("Received ctrl-c, shutting down"),
        _ = terminate() => info!("Received SIGTERM, shutting down"),
    }
}
