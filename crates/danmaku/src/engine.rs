//! The danmaku overlay engine.
//!
//! The engine owns every comment currently scrolling across a host surface.
//! Each admitted comment becomes a [`ScrollingElement`] record: the label is
//! attached at the right edge of a random lane, measured, and then moved left
//! by a linear animation until it has fully left the screen, at which point
//! it is detached and dropped.
//!
//! All methods are meant to be called from the host's UI thread. None of them
//! fail: bad input and calls in the wrong state are logged and ignored, so an
//! overlay problem can never take playback down with it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::animation::{FrameClock, LinearAnimation, Step};
use crate::comment::Comment;
use crate::config::{OverlayConfig, PauseMode};
use crate::lane::LaneLayout;
use crate::source::{CommentSource, DemoSource};
use crate::statistics::{EngineStats, Rejection};
use crate::surface::{ElementId, Label, MemorySurface, RenderSurface};

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Admitting new comments
    Running,
    /// Not admitting; in-flight elements keep moving unless the pause mode freezes them
    Paused,
    /// Not admitting; in-flight elements are left alone
    Stopped,
    /// Torn down; every call is a no-op
    Released,
}

/// A comment currently in flight.
#[derive(Debug, Clone)]
struct ScrollingElement {
    text: String,
    lane: u32,
    speed: Duration,
    width: u32,
    animation: LinearAnimation,
}

/// Read-only view of an in-flight element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub text: String,
    pub lane: u32,
    pub speed: Duration,
    pub width: u32,
    pub position: i32,
}

/// Scrolling comment overlay bound to one surface.
pub struct DanmakuEngine<S: RenderSurface = MemorySurface> {
    surface: S,
    width: u32,
    height: u32,
    config: OverlayConfig,
    lanes: LaneLayout,
    rng: StdRng,
    state: EngineState,
    elements: FxHashMap<ElementId, ScrollingElement>,
    next_id: u64,
    clock: FrameClock,
    buffer: Option<VecDeque<Comment>>,
    source: Box<dyn CommentSource>,
    stats: EngineStats,
    finished: Vec<ElementId>,
}

impl<S: RenderSurface> DanmakuEngine<S> {
    /// Create an engine for a `width` x `height` surface with default settings.
    pub fn new(surface: S, width: u32, height: u32) -> Self {
        Self::with_config(surface, width, height, OverlayConfig::default())
    }

    /// Create an engine with explicit settings.
    ///
    /// An invalid configuration is replaced by the defaults (keeping its seed).
    pub fn with_config(surface: S, width: u32, height: u32, config: OverlayConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "Invalid overlay configuration, using defaults");
                OverlayConfig {
                    seed: config.seed,
                    ..OverlayConfig::default()
                }
            }
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let lanes = LaneLayout::new(&config, height);
        debug!(
            width,
            height,
            lanes = lanes.lane_count(),
            "Danmaku engine created"
        );

        Self {
            surface,
            width,
            height,
            config,
            lanes,
            rng,
            state: EngineState::Running,
            elements: FxHashMap::default(),
            next_id: 1,
            clock: FrameClock::new(),
            buffer: Some(VecDeque::new()),
            source: Box::new(DemoSource::video()),
            stats: EngineStats::default(),
            finished: Vec::new(),
        }
    }

    /// Use `source` for [`load_comments`](Self::load_comments).
    pub fn with_source(mut self, source: Box<dyn CommentSource>) -> Self {
        self.source = source;
        self
    }

    /// Admit a comment.
    ///
    /// Absent or empty text, or an engine that is not running, makes this a
    /// no-op. Otherwise the label is attached just off the right edge of a
    /// random lane and starts moving on the next frame.
    pub fn add_comment(&mut self, text: Option<&str>) {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            self.reject(Rejection::EmptyText);
            return;
        };
        if self.state != EngineState::Running {
            self.reject(Rejection::Inactive);
            return;
        }
        let Some(lane) = self.lanes.pick(&mut self.rng) else {
            self.reject(Rejection::NoLanes);
            return;
        };
        let speed = self.pick_speed();

        let id = ElementId(self.next_id);
        self.next_id += 1;

        let start = self.start_position();
        let label = Label {
            text,
            left: start,
            top: self.lanes.top_of(lane),
            height: self.lanes.element_height(),
            font_size: self.config.font_size,
            padding: self.config.text_padding,
        };
        if !self.surface.attach(id, &label) {
            self.reject(Rejection::SurfaceRefused);
            return;
        }

        // Width depends on layout, so it is only known once attached.
        let Some(width) = self.surface.measure(id) else {
            self.surface.detach(id);
            self.reject(Rejection::SurfaceRefused);
            return;
        };
        let end = -i32::try_from(width).unwrap_or(i32::MAX);

        self.elements.insert(
            id,
            ScrollingElement {
                text: text.to_string(),
                lane,
                speed,
                width,
                animation: LinearAnimation::new(start, end, speed),
            },
        );
        self.stats.record_admitted(self.elements.len());
        trace!(%id, lane, speed_ms = speed.as_millis() as u64, width, "Comment admitted");
    }

    /// Admit a [`Comment`].
    pub fn push(&mut self, comment: &Comment) {
        self.add_comment(Some(comment.as_str()));
    }

    /// Advance every in-flight element to the frame at `now`.
    ///
    /// `now` is a monotonic timestamp from the host's frame scheduler.
    /// Elements that reach the left edge on this frame are detached.
    pub fn on_frame(&mut self, now: Duration) {
        let dt = self.clock.delta(now);
        if self.state == EngineState::Released || self.elements.is_empty() {
            return;
        }
        let dt = if self.is_frozen() { Duration::ZERO } else { dt };

        for (id, element) in self.elements.iter_mut() {
            match element.animation.advance(dt) {
                Step::Running(left) => self.surface.set_left(*id, left),
                Step::Finished(left) => {
                    self.surface.set_left(*id, left);
                    self.finished.push(*id);
                }
            }
        }

        if self.finished.is_empty() {
            return;
        }
        let completed = self.finished.len();
        for id in self.finished.drain(..) {
            self.elements.remove(&id);
            self.surface.detach(id);
            trace!(%id, "Comment finished");
        }
        self.stats.record_completed(completed);
    }

    /// Resume admitting comments.
    pub fn start(&mut self) {
        if self.state == EngineState::Released {
            trace!("start() on released engine ignored");
            return;
        }
        self.state = EngineState::Running;
        debug!("Danmaku started");
    }

    /// Stop admitting comments until [`start`](Self::start).
    pub fn pause(&mut self) {
        if self.state == EngineState::Released {
            return;
        }
        self.state = EngineState::Paused;
        debug!(mode = ?self.config.pause_mode, "Danmaku paused");
    }

    /// Stop admitting comments; elements already on screen are left alone.
    pub fn stop(&mut self) {
        if self.state == EngineState::Released {
            return;
        }
        self.state = EngineState::Stopped;
        debug!("Danmaku stopped");
    }

    /// Remove every element from the surface now. The state is unchanged.
    pub fn clear(&mut self) {
        let cleared = self.elements.len();
        for (id, _) in self.elements.drain() {
            self.surface.detach(id);
        }
        self.finished.clear();
        if cleared > 0 {
            self.stats.record_cleared(cleared);
            debug!(cleared, "Danmaku cleared");
        }
    }

    /// Clear the surface, drop buffered comments and retire the engine.
    ///
    /// Calling it again does nothing.
    pub fn release(&mut self) {
        if self.state == EngineState::Released {
            return;
        }
        self.clear();
        self.buffer = None;
        self.state = EngineState::Released;
        debug!("Danmaku released");
    }

    /// Load comments for `source_id` into the internal buffer.
    ///
    /// Failures are logged and leave the buffer as it was.
    pub fn load_comments(&mut self, source_id: &str) {
        let Some(buffer) = self.buffer.as_mut() else {
            trace!(source_id, "load_comments() on released engine ignored");
            return;
        };
        debug!(source = self.source.name(), source_id, "Loading danmaku");
        match self.source.load(source_id) {
            Ok(comments) => {
                let before = buffer.len();
                buffer.extend(comments.into_iter().filter(Comment::is_displayable));
                debug!(loaded = buffer.len() - before, "Danmaku loaded");
            }
            Err(e) => {
                warn!(source = self.source.name(), source_id, error = %e, "Failed to load danmaku");
            }
        }
    }

    /// Pop the next buffered comment.
    pub fn next_buffered(&mut self) -> Option<Comment> {
        self.buffer.as_mut()?.pop_front()
    }

    /// Take every buffered comment.
    pub fn take_buffered(&mut self) -> Vec<Comment> {
        self.buffer
            .as_mut()
            .map(|b| b.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.as_ref().map_or(0, VecDeque::len)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn is_released(&self) -> bool {
        self.state == EngineState::Released
    }

    /// Number of elements in flight.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn lane_count(&self) -> u32 {
        self.lanes.lane_count()
    }

    pub fn lanes(&self) -> &LaneLayout {
        &self.lanes
    }

    /// Surface size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Host access to the surface. Children the engine attached must only be
    /// detached through the engine.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// In-flight elements ordered by admission.
    pub fn snapshot(&self) -> Vec<ElementSnapshot> {
        let mut elements: Vec<_> = self
            .elements
            .iter()
            .map(|(id, e)| ElementSnapshot {
                id: *id,
                text: e.text.clone(),
                lane: e.lane,
                speed: e.speed,
                width: e.width,
                position: e.animation.value(),
            })
            .collect();
        elements.sort_by_key(|e| e.id);
        elements
    }

    fn start_position(&self) -> i32 {
        i32::try_from(self.width).unwrap_or(i32::MAX)
    }

    fn pick_speed(&mut self) -> Duration {
        let extra = if self.config.speed_variance_ms == 0 {
            0
        } else {
            self.rng.random_range(0..self.config.speed_variance_ms)
        };
        self.config.base_speed() + Duration::from_millis(extra)
    }

    fn is_frozen(&self) -> bool {
        self.state == EngineState::Paused && self.config.pause_mode == PauseMode::Freeze
    }

    fn reject(&mut self, reason: Rejection) {
        self.stats.record_rejected(reason);
        trace!(?reason, state = ?self.state, "Comment rejected");
    }
}

impl<S: RenderSurface> Drop for DanmakuEngine<S> {
    fn drop(&mut self) {
        self.release();
    }
}
