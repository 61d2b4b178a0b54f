//! Danmaku: scrolling comment overlay for TV playback screens.
//!
//! This crate renders live comments (danmu/弹幕) as labels that scroll from
//! right to left across a host-owned surface, one random lane and one random
//! speed per comment.
//!
//! ## Core Types
//!
//! - [`DanmakuEngine`] - Owns in-flight elements and their lifecycle
//! - [`RenderSurface`] - Trait for the host rendering container
//! - [`MemorySurface`] - In-memory container for headless hosts and tests
//! - [`LaneLayout`] - Lane geometry for one surface size
//! - [`LinearAnimation`] / [`FrameClock`] - Frame-driven interpolation
//!
//! ## Sources
//!
//! - [`CommentSource`] - Trait for comment providers
//! - [`DemoSource`] - Fixed demo lists for video and live screens
//! - [`XmlFileSource`] - Danmu XML files
//!
//! ## Playback
//!
//! - [`PlaybackSession`] - Engine, feeder and viewer ticker for one screen
//! - [`CommentFeeder`] - Scheduled comment delivery
//! - [`ViewerTicker`] - Simulated live audience count
//! - [`ScopedTask`] - Background task cancelled on drop

pub mod animation;
pub mod comment;
pub mod config;
pub mod engine;
pub mod error;
pub mod feeder;
pub mod lane;
pub mod session;
pub mod source;
pub mod statistics;
pub mod surface;
pub mod task;
pub mod viewers;

pub use animation::{FrameClock, LinearAnimation, Step};
pub use comment::Comment;
pub use config::{FeedConfig, MAX_TEXT_PADDING, OverlayConfig, PauseMode};
pub use engine::{DanmakuEngine, ElementSnapshot, EngineState};
pub use error::{DanmakuError, Result};
pub use feeder::{CommentFeeder, FeedSchedule};
pub use lane::LaneLayout;
pub use session::{CONTROLS_HIDE_DELAY, KeyOutcome, PlaybackKind, PlaybackSession, RemoteKey};
pub use source::{CommentSource, DemoSource, XmlFileSource, parse_danmu_xml};
pub use statistics::{EngineStats, Rejection};
pub use surface::{
    ColumnMeasure, ElementId, Label, MemorySurface, RenderSurface, SurfaceChild, TextMeasure,
};
pub use task::ScopedTask;
pub use viewers::{ViewerTicker, next_viewer_count, viewer_label};
