use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Process-wide shutdown via CancellationToken.
/// Listens for SIGTERM and SIGINT and cancels the token.
#[derive(Debug)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The token the HTTP server and the bootstrap wait on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn a background task that cancels the token on the first OS signal.
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use signal::unix::{SignalKind, signal as unix_signal};
                let (mut sigterm, mut sigint) =
                    match (unix_signal(SignalKind::terminate()), unix_signal(SignalKind::interrupt())) {
                        (Ok(term), Ok(int)) => (term, int),
                        (Err(e), _) | (_, Err(e)) => {
                            tracing::warn!(error = %e, "failed to register signal handlers");
                            return;
                        }
                    };
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, initiating shutdown"),
                    _ = sigint.recv() => tracing::info!("received SIGINT, initiating shutdown"),
                }
            }
            #[cfg(not(unix))]
            {
                let _ = signal::ctrl_c().await;
                tracing::info!("received Ctrl+C, initiating shutdown");
            }
            token.cancel();
        });
    }
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}
