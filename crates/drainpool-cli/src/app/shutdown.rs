//! Process signal handling.
//!
//! `SIGINT` (Ctrl+C) and `SIGTERM` both cancel the shared token exactly once.
//! Workers then finish their current job and exit, abandoning whatever is
//! still queued.

use drainpool::CancellationToken;
use tokio::signal;

/// Waits for a termination signal and cancels `cancel` when one arrives.
///
/// Returns without cancelling if `cancel` fires first, so the task ends with
/// the run.
pub async fn listen_for_signals(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
        () = cancel.cancelled() => return,
    }

    tracing::info!("Shutdown signal received, cancelling outstanding work...");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[tokio::test]
    async fn returns_once_the_run_is_over() {
        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen_for_signals(cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), listener)
            .await
            .unwrap()
            .unwrap();
    }
}
