//! Small runtime helpers.

use std::any::Any;
use std::io;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::info;

/// Stop request raised by Ctrl-C, or SIGTERM on unix.
///
/// The signal handlers are registered when [`ShutdownSignal::install`]
/// returns, so a signal that arrives while the first cycle is still running
/// is recorded instead of killing the process.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Register the handlers and watch them from a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install() -> io::Result<Self> {
        let (tx, rx) = watch::channel(false);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut interrupt = signal(SignalKind::interrupt())?;
            let mut terminate = signal(SignalKind::terminate())?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = interrupt.recv() => info!("Interrupt received"),
                    _ = terminate.recv() => info!("Terminate received"),
                }
                tx.send_replace(true);
            });
        }

        #[cfg(not(unix))]
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received");
                    tx.send_replace(true);
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });

        Ok(Self { rx })
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop is requested. Never resolves if the listener
    /// task is gone without one.
    pub async fn wait(mut self) {
        let closed = self.rx.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    }
}

/// Current unix time in whole seconds.
pub fn unix_time() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Text of a caught panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}
