use tokio::select;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
async fn terminate_signal() {
    use tracing::warn;

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
        }
        Err(e) => {
            warn!("Couldn't listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

/// Cancels the session when the process is asked to stop. Inside the raw mode
/// terminal Ctrl+C arrives as a key press and is handled by the session loop,
/// this covers signals sent from outside. Ends as soon as the token cancels
/// for any reason so it never outlives the session.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = terminate_signal() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
