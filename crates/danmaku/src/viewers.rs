//! Simulated live audience counter.
//!
//! Live screens show a viewer count next to the stream description. Until a
//! real counter is wired in, the count takes a small random walk once per
//! period and is published through a watch channel.

use rand::Rng;
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::task::ScopedTask;

/// Count used when the random walk drops below zero.
pub const VIEWER_RESET: u64 = 1000;

/// One step of the random walk: `count + [-50, 50)`, reset when negative.
pub fn next_viewer_count<R: Rng + ?Sized>(count: u64, rng: &mut R) -> u64 {
    let delta = rng.random_range(0..100i64) - 50;
    let next = i64::try_from(count).unwrap_or(i64::MAX).saturating_add(delta);
    if next < 0 { VIEWER_RESET } else { next as u64 }
}

/// Format the description line shown on live screens.
pub fn viewer_label(description: &str, count: u64) -> String {
    format!("{description} | {count}人观看")
}

/// Background viewer-count ticker.
#[derive(Debug)]
pub struct ViewerTicker {
    task: ScopedTask,
    rx: watch::Receiver<u64>,
}

impl ViewerTicker {
    pub fn spawn(
        initial: u64,
        period: Duration,
        mut rng: StdRng,
        parent: &CancellationToken,
    ) -> Self {
        let (tx, rx) = watch::channel(initial);
        let task = ScopedTask::repeating("viewer-ticker", parent, period, move || {
            let next = next_viewer_count(*tx.borrow(), &mut rng);
            tx.send(next).is_ok()
        });
        Self { task, rx }
    }

    /// Latest published count.
    pub fn current(&self) -> u64 {
        *self.rx.borrow()
    }

    /// A receiver that observes every update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.rx.clone()
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_walk_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut count = 5_000;
        for _ in 0..1_000 {
            let next = next_viewer_count(count, &mut rng);
            let diff = next as i64 - count as i64;
            assert!((-50..50).contains(&diff));
            count = next;
        }
    }

    #[test]
    fn test_negative_resets() {
        let mut rng = StdRng::seed_from_u64(3);
        // From zero roughly half the steps go negative
        let resets = (0..200)
            .map(|_| next_viewer_count(0, &mut rng))
            .filter(|c| *c == VIEWER_RESET)
            .count();
        assert!(resets > 0);
    }

    #[test]
    fn test_label() {
        assert_eq!(viewer_label("LoL finals", 1234), "LoL finals | 1234人观看");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_publishes_updates() {
        let parent = CancellationToken::new();
        let ticker = ViewerTicker::spawn(
            10_000,
            Duration::from_secs(1),
            StdRng::seed_from_u64(11),
            &parent,
        );
        let mut rx = ticker.subscribe();

        let mut updates = 0;
        while updates < 3 {
            rx.changed().await.unwrap();
            updates += 1;
        }
        let current = ticker.current();
        assert!((9_850..10_150).contains(&current));

        ticker.cancel();
        assert!(ticker.is_cancelled());
    }
}
