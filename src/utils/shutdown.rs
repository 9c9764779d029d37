//! Process shutdown signals
//!
//! Listeners are registered when [`ShutdownSignal::install`] runs, so a
//! signal delivered before [`ShutdownSignal::recv`] is awaited is not lost.

use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// SIGTERM or SIGINT on unix, Ctrl+C elsewhere
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
}

impl ShutdownSignal {
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sigint: signal(SignalKind::interrupt())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolve on the first shutdown signal and return its name
    pub async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    "SIGTERM"
                }
                _ = self.sigint.recv() => {
                    info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                    "SIGINT"
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully");
            "CTRL_C"
        }
    }
}
