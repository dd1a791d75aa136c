use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Pending {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs only the last task scheduled within a quiescence window.
///
/// Scheduling cancels a task that is still waiting out its window. A task
/// whose window already elapsed runs to completion.
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.cancel_token.cancel();
            debug!("superseded pending debounced task");
        }

        let cancel_token = CancellationToken::new();
        let cancelled = cancel_token.clone();
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(window) => task.await,
            }
        });

        *pending = Some(Pending {
            cancel_token,
            handle,
        });
    }

    /// Waits for the latest scheduled task, if any, to finish.
    pub async fn flush(&self) {
        let pending = self.pending.lock().await.take();
        if let Some(pending) = pending {
            let _ = pending.handle.await;
        }
    }

    /// Drops the latest scheduled task if it has not started yet.
    pub async fn cancel(&self) {
        if let Some(pending) = self.pending.lock().await.take() {
            pending.cancel_token.cancel();
        }
    }
}
