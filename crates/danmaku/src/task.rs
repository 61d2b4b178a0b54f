//! Scoped background tasks.
//!
//! Playback screens run timers (comment feeding, viewer count refresh) that
//! must never outlive the screen. A [`ScopedTask`] ties a spawned tokio task to
//! a child [`CancellationToken`]: cancelling the parent, calling
//! [`ScopedTask::cancel`] or dropping the handle all stop the task.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Handle to a spawned task that is cancelled when dropped.
#[derive(Debug)]
pub struct ScopedTask {
    name: &'static str,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScopedTask {
    /// Spawn `f` on the current tokio runtime.
    ///
    /// `f` receives the task's own token; the future is also raced against it,
    /// so a task that never checks the token still stops at its next await.
    pub fn spawn<F, Fut>(name: &'static str, parent: &CancellationToken, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();
        let fut = f(token.clone());

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    trace!(task = name, "Task cancelled");
                }
                _ = fut => {
                    trace!(task = name, "Task finished");
                }
            }
        });
        debug!(task = name, "Task spawned");

        Self {
            name,
            token,
            handle: Some(handle),
        }
    }

    /// Spawn a task that calls `tick` every `period`, first at once.
    ///
    /// The task ends when `tick` returns `false` or the token is cancelled.
    /// Missed ticks are skipped rather than replayed.
    pub fn repeating<F>(
        name: &'static str,
        parent: &CancellationToken,
        period: Duration,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::spawn(name, parent, move |_| async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request cancellation. Takes effect at the task's next await point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the underlying task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_repeating_ticks_until_cancelled() {
        let parent = CancellationToken::new();
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        let task = ScopedTask::repeating("ticker", &parent, Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        // Ticks at 0s, 1s, 2s and 3s
        assert_eq!(count.load(Ordering::SeqCst), 4);

        task.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_stops_when_tick_returns_false() {
        let parent = CancellationToken::new();
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        let task = ScopedTask::repeating("bounded", &parent, Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst) < 2
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(task.is_finished());
        assert!(!task.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let parent = CancellationToken::new();
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        let task = ScopedTask::repeating("dropped", &parent, Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(task);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let task = ScopedTask::spawn("waiter", &parent, |token| async move {
            token.cancelled().await;
        });

        parent.cancel();
        assert!(task.is_cancelled());
        task.shutdown().await;
    }
}
