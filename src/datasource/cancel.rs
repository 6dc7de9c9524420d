//! Cooperative cancellation signal
//!
//! A [`CancelHandle`] owns a `watch` channel that flips from `false` to
//! `true` once. Running stages hold receivers and stop at their next
//! suspension point after observing it.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raises the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the signal is raised. Never resolves if every handle is
/// dropped without cancelling.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Sends `item` unless the signal is raised first. Returns false when the
/// caller should stop: cancelled, or the receiving side is gone.
pub async fn send_unless_cancelled<T>(
    output: &mpsc::Sender<T>,
    cancel: &mut watch::Receiver<bool>,
    item: T,
) -> bool {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => false,
        sent = output.send(item) => sent.is_ok(),
    }
}

/// Receives the next item unless the signal is raised first
pub async fn recv_unless_cancelled<T>(
    input: &mut mpsc::Receiver<T>,
    cancel: &mut watch::Receiver<bool>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => None,
        item = input.recv() => item,
    }
}
