//! Start/stop handles for long-lived background loops.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Receiving side of a shutdown request.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been requested (or the handle was dropped).
    pub async fn requested(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether shutdown has been requested already.
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Handle to a spawned loop.
///
/// Dropping the handle without calling [`TaskHandle::stop`] also asks the
/// loop to stop at its next await point.
pub struct TaskHandle {
    name: String,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn `task` on the runtime, handing it a shutdown signal.
    pub fn spawn<F, Fut>(name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, rx) = watch::channel(false);
        let join = tokio::spawn(task(ShutdownSignal { rx }));

        Self {
            name: name.into(),
            shutdown,
            join,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Request shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        // The loop may already have exited and dropped its receiver.
        let _ = self.shutdown.send(true);

        match self.join.await {
            Ok(()) => info!(task = %self.name, "stopped"),
            Err(e) if e.is_panic() => error!(task = %self.name, "task panicked"),
            Err(_) => info!(task = %self.name, "task cancelled"),
        }
    }
}
