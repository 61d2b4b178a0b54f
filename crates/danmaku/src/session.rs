//! Playback session glue.
//!
//! A [`PlaybackSession`] is what a video or live screen holds for its
//! lifetime: the overlay engine, the comment feeder, and on live screens the
//! viewer ticker. It turns remote-control keys and player state changes into
//! engine lifecycle calls, and tears everything down exactly once.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::comment::Comment;
use crate::config::FeedConfig;
use crate::engine::DanmakuEngine;
use crate::feeder::{CommentFeeder, FeedSchedule};
use crate::source::DemoSource;
use crate::surface::{MemorySurface, RenderSurface};
use crate::viewers::ViewerTicker;

/// Kind of playback screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PlaybackKind {
    /// On-demand video: comments are fed once, staggered
    Video,
    /// Live stream: comments loop and a viewer count is shown
    Live,
}

/// Remote-control keys a playback screen reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RemoteKey {
    Back,
    Escape,
    DpadCenter,
    Enter,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    MediaPlayPause,
    MediaPlay,
    MediaPause,
    MediaStop,
    Menu,
}

impl RemoteKey {
    /// Map an Android key code.
    pub fn from_keycode(code: i32) -> Option<Self> {
        let key = match code {
            4 => Self::Back,
            19 => Self::DpadUp,
            20 => Self::DpadDown,
            21 => Self::DpadLeft,
            22 => Self::DpadRight,
            23 => Self::DpadCenter,
            66 => Self::Enter,
            82 => Self::Menu,
            85 => Self::MediaPlayPause,
            86 => Self::MediaStop,
            111 => Self::Escape,
            126 => Self::MediaPlay,
            127 => Self::MediaPause,
            _ => return None,
        };
        Some(key)
    }
}

/// What the screen should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Session destroyed; close the screen
    Exit,
    /// Playback state changed
    Playback { playing: bool },
    /// On-screen controls shown (or kept up); the key is not consumed
    ShowControls,
    /// Consumed without effect
    Handled,
}

/// How long the on-screen controls stay up after the last reveal.
pub const CONTROLS_HIDE_DELAY: Duration = Duration::from_secs(5);

/// Auto-hide timer for the on-screen controls, driven by frame timestamps.
///
/// The deadline is armed on the first frame after a reveal, so a reveal
/// between frames still gets the full delay.
#[derive(Debug, Clone, Copy)]
struct ControlsTimer {
    visible: bool,
    hide_at: Option<Duration>,
}

impl ControlsTimer {
    fn shown() -> Self {
        Self {
            visible: true,
            hide_at: None,
        }
    }

    fn show(&mut self) {
        self.visible = true;
        self.hide_at = None;
    }

    fn hide(&mut self) {
        self.visible = false;
        self.hide_at = None;
    }

    /// Returns `true` when the controls were hidden on this frame.
    fn tick(&mut self, now: Duration) -> bool {
        if !self.visible {
            return false;
        }
        match self.hide_at {
            None => {
                self.hide_at = Some(now.saturating_add(CONTROLS_HIDE_DELAY));
                false
            }
            Some(deadline) if now >= deadline => {
                self.hide();
                true
            }
            Some(_) => false,
        }
    }
}

/// Salt mixed into the engine seed for the background tasks' generators.
const TASK_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Overlay state owned by one playback screen.
pub struct PlaybackSession<S: RenderSurface = MemorySurface> {
    kind: PlaybackKind,
    engine: DanmakuEngine<S>,
    token: CancellationToken,
    feeder: Option<CommentFeeder>,
    viewers: Option<ViewerTicker>,
    controls: ControlsTimer,
    playing: bool,
    destroyed: bool,
}

impl<S: RenderSurface> PlaybackSession<S> {
    /// Open a session and start its background tasks.
    ///
    /// `source_id` is handed to the engine's comment source; when it is absent
    /// or yields nothing, the screen's demo list is used instead. Must be called
    /// from within a tokio runtime.
    pub fn open(
        kind: PlaybackKind,
        mut engine: DanmakuEngine<S>,
        source_id: Option<&str>,
        feed: &FeedConfig,
        parent: &CancellationToken,
    ) -> Self {
        let mut comments = Vec::new();
        if let Some(id) = source_id.filter(|id| !id.is_empty()) {
            engine.load_comments(id);
            comments = engine.take_buffered();
        }
        if comments.is_empty() {
            comments = match kind {
                PlaybackKind::Video => DemoSource::video().comments(),
                PlaybackKind::Live => DemoSource::live().comments(),
            };
        }

        let seed = engine.config().seed;
        let token = parent.child_token();
        let schedule = match kind {
            PlaybackKind::Video => FeedSchedule::video(feed),
            PlaybackKind::Live => FeedSchedule::live(feed),
        };
        let feeder = CommentFeeder::spawn(comments, schedule, task_rng(seed, 1), &token);
        let viewers = match kind {
            PlaybackKind::Live => Some(ViewerTicker::spawn(
                feed.initial_viewers,
                Duration::from_millis(feed.viewer_period_ms),
                task_rng(seed, 2),
                &token,
            )),
            PlaybackKind::Video => None,
        };

        engine.start();
        info!(%kind, "Playback session opened");

        Self {
            kind,
            engine,
            token,
            feeder: Some(feeder),
            viewers,
            controls: ControlsTimer::shown(),
            playing: true,
            destroyed: false,
        }
    }

    /// Hand every comment the feeder has delivered so far to the engine.
    ///
    /// Comments delivered while paused are dropped by the engine, matching a
    /// live stream where missed comments are not replayed.
    pub fn pump(&mut self) -> usize {
        let Some(feeder) = self.feeder.as_mut() else {
            return 0;
        };
        let mut delivered = 0;
        while let Some(comment) = feeder.try_next() {
            self.engine.push(&comment);
            delivered += 1;
        }
        delivered
    }

    /// Add a comment typed or received outside the feeder.
    pub fn add_comment(&mut self, comment: &Comment) {
        self.engine.push(comment);
    }

    /// Advance the overlay to the frame at `now`.
    pub fn on_frame(&mut self, now: Duration) {
        self.engine.on_frame(now);
        if self.controls.tick(now) {
            debug!(kind = %self.kind, "Controls hidden");
        }
    }

    /// React to a remote-control key.
    pub fn on_key(&mut self, key: RemoteKey) -> KeyOutcome {
        if self.destroyed {
            return KeyOutcome::Exit;
        }
        debug!(%key, "Remote key");
        match key {
            RemoteKey::Back | RemoteKey::Escape | RemoteKey::MediaStop => {
                self.destroy();
                KeyOutcome::Exit
            }
            RemoteKey::DpadCenter | RemoteKey::Enter | RemoteKey::MediaPlayPause => {
                let playing = !self.playing;
                self.on_playing_changed(playing);
                KeyOutcome::Playback { playing }
            }
            RemoteKey::MediaPlay => {
                self.on_playing_changed(true);
                KeyOutcome::Playback { playing: true }
            }
            RemoteKey::MediaPause => {
                self.on_playing_changed(false);
                KeyOutcome::Playback { playing: false }
            }
            RemoteKey::DpadUp | RemoteKey::DpadDown | RemoteKey::DpadLeft | RemoteKey::DpadRight => {
                self.controls.show();
                KeyOutcome::ShowControls
            }
            RemoteKey::Menu => KeyOutcome::Handled,
        }
    }

    /// The player started or stopped playing.
    pub fn on_playing_changed(&mut self, playing: bool) {
        if self.destroyed {
            return;
        }
        self.playing = playing;
        if playing {
            self.engine.start();
        } else {
            self.engine.pause();
        }
    }

    /// The screen went to the background.
    pub fn on_host_pause(&mut self) {
        self.on_playing_changed(false);
    }

    /// Release the engine and cancel background tasks. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.playing = false;
        self.controls.hide();
        self.engine.release();
        self.token.cancel();
        self.feeder = None;
        self.viewers = None;
        info!(kind = %self.kind, "Playback session destroyed");
    }

    pub fn kind(&self) -> PlaybackKind {
        self.kind
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether the on-screen controls are up. They start visible and hide
    /// [`CONTROLS_HIDE_DELAY`] after the last reveal.
    pub fn controls_visible(&self) -> bool {
        self.controls.visible
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Latest simulated viewer count on live screens.
    pub fn viewer_count(&self) -> Option<u64> {
        self.viewers.as_ref().map(ViewerTicker::current)
    }

    /// Whether the feeder has nothing more to deliver.
    pub fn feed_finished(&self) -> bool {
        self.feeder.as_ref().is_none_or(CommentFeeder::is_finished)
    }

    pub fn engine(&self) -> &DanmakuEngine<S> {
        &self.engine
    }
}

impl<S: RenderSurface> Drop for PlaybackSession<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn task_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ TASK_SEED_SALT.wrapping_mul(stream)),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayConfig;
    use crate::engine::EngineState;

    fn engine() -> DanmakuEngine {
        DanmakuEngine::with_config(
            MemorySurface::new(),
            1920,
            1080,
            OverlayConfig::default().with_seed(3),
        )
    }

    #[test]
    fn test_keycodes() {
        assert_eq!(RemoteKey::from_keycode(23), Some(RemoteKey::DpadCenter));
        assert_eq!(RemoteKey::from_keycode(127), Some(RemoteKey::MediaPause));
        assert_eq!(RemoteKey::from_keycode(4), Some(RemoteKey::Back));
        assert_eq!(RemoteKey::from_keycode(999), None);
        assert_eq!("dpad_center".parse::<RemoteKey>().unwrap(), RemoteKey::DpadCenter);
        assert_eq!("live".parse::<PlaybackKind>().unwrap(), PlaybackKind::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_feed_reaches_engine() {
        let parent = CancellationToken::new();
        let mut session = PlaybackSession::open(
            PlaybackKind::Video,
            engine(),
            None,
            &FeedConfig::default(),
            &parent,
        );

        // First demo comment is released immediately
        tokio::task::yield_now().await;
        assert_eq!(session.pump(), 1);
        assert_eq!(session.engine().len(), 1);

        tokio::time::sleep(Duration::from_millis(4_100)).await;
        assert_eq!(session.pump(), 2);
        assert_eq!(session.engine().surface().child_count(), 3);
        assert!(session.viewer_count().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_keys_pause_and_resume() {
        let parent = CancellationToken::new();
        let mut session = PlaybackSession::open(
            PlaybackKind::Video,
            engine(),
            None,
            &FeedConfig::default(),
            &parent,
        );

        assert_eq!(
            session.on_key(RemoteKey::DpadCenter),
            KeyOutcome::Playback { playing: false }
        );
        assert_eq!(session.engine().state(), EngineState::Paused);

        // Delivered while paused: dropped
        tokio::task::yield_now().await;
        assert_eq!(session.pump(), 1);
        assert_eq!(session.engine().len(), 0);

        assert_eq!(
            session.on_key(RemoteKey::MediaPlayPause),
            KeyOutcome::Playback { playing: true }
        );
        assert_eq!(session.engine().state(), EngineState::Running);
        assert_eq!(session.on_key(RemoteKey::DpadLeft), KeyOutcome::ShowControls);
        assert_eq!(session.on_key(RemoteKey::Menu), KeyOutcome::Handled);
        assert!(session.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_auto_hide() {
        let parent = CancellationToken::new();
        let mut session = PlaybackSession::open(
            PlaybackKind::Video,
            engine(),
            None,
            &FeedConfig::default(),
            &parent,
        );
        let secs = Duration::from_secs_f64;

        assert!(session.controls_visible());
        session.on_frame(secs(0.0));
        session.on_frame(secs(4.9));
        assert!(session.controls_visible());
        session.on_frame(secs(5.0));
        assert!(!session.controls_visible());

        assert_eq!(session.on_key(RemoteKey::DpadUp), KeyOutcome::ShowControls);
        assert!(session.controls_visible());
        session.on_frame(secs(6.0));
        session.on_frame(secs(10.0));

        // Another reveal restarts the delay
        session.on_key(RemoteKey::DpadDown);
        session.on_frame(secs(10.5));
        session.on_frame(secs(12.0));
        assert!(session.controls_visible());
        session.on_frame(secs(15.4));
        assert!(session.controls_visible());
        session.on_frame(secs(15.5));
        assert!(!session.controls_visible());

        // Other keys leave the controls alone
        session.on_key(RemoteKey::Menu);
        session.on_key(RemoteKey::MediaPause);
        assert!(!session.controls_visible());

        session.on_key(RemoteKey::DpadLeft);
        session.destroy();
        assert!(!session.controls_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_destroys_session() {
        let parent = CancellationToken::new();
        let mut session = PlaybackSession::open(
            PlaybackKind::Live,
            engine(),
            None,
            &FeedConfig::default(),
            &parent,
        );
        tokio::task::yield_now().await;
        session.pump();
        assert!(session.engine().len() > 0);
        assert!(session.viewer_count().is_some());

        assert_eq!(session.on_key(RemoteKey::Back), KeyOutcome::Exit);
        assert!(session.is_destroyed());
        assert!(session.engine().is_released());
        assert_eq!(session.engine().surface().child_count(), 0);
        assert!(session.viewer_count().is_none());

        // Further input is ignored
        assert_eq!(session.on_key(RemoteKey::MediaPlay), KeyOutcome::Exit);
        assert_eq!(session.pump(), 0);
        session.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_pause() {
        let parent = CancellationToken::new();
        let mut session = PlaybackSession::open(
            PlaybackKind::Live,
            engine(),
            None,
            &FeedConfig::default(),
            &parent,
        );
        session.on_host_pause();
        assert!(!session.is_playing());
        assert_eq!(session.engine().state(), EngineState::Paused);

        session.on_playing_changed(true);
        assert_eq!(session.engine().state(), EngineState::Running);
    }
}
