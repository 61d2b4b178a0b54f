//! Comment feeder.
//!
//! Delivers comments to the UI thread on a schedule. The feeder runs as a
//! [`ScopedTask`] and only talks to the engine's thread through a channel; the
//! host drains it with [`CommentFeeder::try_next`] and calls `add_comment`.

use rand::Rng;
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::comment::Comment;
use crate::config::FeedConfig;
use crate::task::ScopedTask;

/// When the feeder releases comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSchedule {
    /// Each comment once, comment `i` at `i * interval` after start.
    Staggered { interval: Duration },
    /// Cycle through the list forever with a random gap in
    /// `[min_delay, min_delay + delay_span)` after each comment.
    Looping {
        min_delay: Duration,
        delay_span: Duration,
    },
}

impl FeedSchedule {
    /// One-shot schedule used by on-demand video screens.
    pub fn video(config: &FeedConfig) -> Self {
        Self::Staggered {
            interval: Duration::from_millis(config.video_interval_ms),
        }
    }

    /// Endless schedule used by live screens.
    pub fn live(config: &FeedConfig) -> Self {
        Self::Looping {
            min_delay: Duration::from_millis(config.live_min_delay_ms),
            delay_span: Duration::from_millis(config.live_delay_span_ms),
        }
    }
}

/// A running feeder and the receiving end of its channel.
#[derive(Debug)]
pub struct CommentFeeder {
    task: ScopedTask,
    rx: mpsc::UnboundedReceiver<Comment>,
}

impl CommentFeeder {
    /// Start feeding `comments` on the current tokio runtime.
    pub fn spawn(
        comments: Vec<Comment>,
        schedule: FeedSchedule,
        mut rng: StdRng,
        parent: &CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(count = comments.len(), ?schedule, "Starting comment feeder");

        let task = ScopedTask::spawn("comment-feeder", parent, move |_| async move {
            if comments.is_empty() {
                return;
            }
            match schedule {
                FeedSchedule::Staggered { interval } => {
                    let start = tokio::time::Instant::now();
                    for (i, comment) in comments.into_iter().enumerate() {
                        let offset = interval.saturating_mul(i as u32);
                        if !offset.is_zero() {
                            tokio::time::sleep_until(start + offset).await;
                        }
                        if tx.send(comment).is_err() {
                            return;
                        }
                    }
                }
                FeedSchedule::Looping {
                    min_delay,
                    delay_span,
                } => {
                    for comment in comments.iter().cycle() {
                        if tx.send(comment.clone()).is_err() {
                            return;
                        }
                        let delay = min_delay + random_below(&mut rng, delay_span);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        });

        Self { task, rx }
    }

    /// Next delivered comment, without waiting.
    pub fn try_next(&mut self) -> Option<Comment> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next comment. `None` once the feeder has ended and the
    /// channel is drained.
    pub async fn recv(&mut self) -> Option<Comment> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    /// Whether the feeding task has exited (schedule exhausted or cancelled).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn random_below<R: Rng + ?Sized>(rng: &mut R, span: Duration) -> Duration {
    let span_ms = u64::try_from(span.as_millis()).unwrap_or(u64::MAX);
    if span_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.random_range(0..span_ms))
}
