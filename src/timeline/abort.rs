//! Abort signalling
//!
//! The player owns a `watch` channel; handles raise it, in-flight steps
//! observe it at every suspension point.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle that stops a run.
///
/// Once raised the handle stays raised: every later `execute` on the same
/// player returns `Aborted` straight away.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side, one clone per in-flight step.
#[derive(Debug, Clone)]
pub(crate) struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub(crate) fn is_raised(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised. Never resolves if the sending
    /// side has gone away without raising it.
    pub(crate) async fn raised(&mut self) {
        let closed = self.rx.wait_for(|raised| *raised).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

pub(crate) fn channel() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
}
