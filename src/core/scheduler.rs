// Repeating task with cancellation

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Runs `step` once per `period` on the tokio runtime until the step returns
/// `Break`, `cancel` is called, or the handle is dropped. Missed periods are
/// skipped rather than replayed in a burst.
pub struct RepeatingTask {
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    pub fn spawn<F, Fut>(period: Duration, mut step: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    // Fires on cancel() and on drop of the sender alike
                    _ = &mut cancel_rx => {
                        debug!("Repeating task cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if step().await.is_break() {
                            debug!("Repeating task finished");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn signal(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stops the task and waits for it to exit.
    pub async fn cancel(mut self) {
        self.signal();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.signal();
    }
}
