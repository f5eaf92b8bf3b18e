use crate::system::shutdown::ShutdownTx;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};

#[cfg(unix)]
pub async fn handle_stop_signals() -> Option<()> {
    let mut sigterm_stream = unix_signal(SignalKind::terminate()).ok()?;
    tokio::select! {
        _ = sigterm_stream.recv() => {
            info!("SIGTERM received. Exiting gracefully.");
            Some(())
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, exiting.");
            Some(())
        }
    }
}

#[cfg(not(unix))]
pub async fn handle_stop_signals() -> Option<()> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl+C received, exiting.");
            Some(())
        }
        Err(_) => None,
    }
}

/// Trip `shutdown` when the process is asked to stop.
pub fn shutdown_on_signal(shutdown: ShutdownTx) {
    tokio::spawn(async move {
        if handle_stop_signals().await.is_none() {
            warn!("Could not install stop signal handlers");
            // Keep the sender alive so receivers are not woken by the drop.
            std::future::pending::<()>().await;
        }
        let _ = shutdown.shutdown();
    });
}
