use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Waits for ctrl-c (or SIGTERM on unix, which is what `memtrail stop` sends) and cancels
/// the token.
///
/// On Windows detached processes can't detect signals sent to them, so `stop` ends up
/// terminating the process there.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => (),
                    _ = terminate.recv() => (),
                    _ = cancelation.cancelled() => return,
                }
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM {e:?}");
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => (),
                    _ = cancelation.cancelled() => return,
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => (),
            _ = cancelation.cancelled() => return,
        }
    }

    info!("Shutdown requested");
    cancelation.cancel();
}
