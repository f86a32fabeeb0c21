use snafu::{ResultExt, Snafu};
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::watch,
};

#[derive(Debug, Snafu)]
#[snafu(display("failed to construct signal watcher"))]
pub struct SignalError {
    source: std::io::Error,
}

/// Watches for an incoming signal and multiplies it by sending it to all acquired handles.
pub struct SignalWatcher {
    watch_rx: watch::Receiver<()>,
}

impl SignalWatcher {
    /// Resolves all handles once `signal` completes.
    pub fn new<F>(signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (watch_tx, watch_rx) = watch::channel(());

        tokio::spawn(async move {
            signal.await;
            watch_tx.send(())
        });

        Self { watch_rx }
    }

    /// Watches the `SIGTERM` signal and multiplies the signal by sending it to all acquired
    /// handles constructed through [`SignalWatcher::handle`].
    pub fn sigterm() -> Result<Self, SignalError> {
        let mut sigterm = signal(SignalKind::terminate()).context(SignalSnafu)?;

        Ok(Self::new(async move {
            sigterm.recv().await;
        }))
    }

    /// Acquire a new handle which will complete once the signal is received.
    ///
    /// Handles can be acquired repeatedly to shut down multiple concurrent tasks.
    pub fn handle(&self) -> impl Future<Output = ()> + use<> {
        let mut watch_rx = self.watch_rx.clone();

        async move {
            watch_rx.changed().await.ok();
        }
    }
}
