//! Overlay and feed configuration.
//!
//! Defaults match the values used by the TV client's playback screens.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DanmakuError, Result};

/// Largest accepted label padding, in pixels per side.
pub const MAX_TEXT_PADDING: u32 = 1_024;

/// What `pause()` does to elements that are already on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseMode {
    /// Stop admitting new elements; in-flight elements finish their traversal.
    #[default]
    Admission,
    /// Stop admitting and also hold in-flight elements in place until resumed.
    Freeze,
}

/// Configuration for the overlay engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Height of one lane in pixels
    pub element_height: u32,
    /// Offset added to each lane's top edge
    pub lane_padding: u32,
    /// Minimum traversal time in milliseconds
    pub base_speed_ms: u64,
    /// Random extra traversal time in milliseconds, exclusive upper bound
    pub speed_variance_ms: u64,
    /// Fraction of the surface height that lanes may occupy
    pub display_band: f64,
    /// Font size used when measuring text
    pub font_size: f32,
    /// Horizontal padding on each side of the label
    pub text_padding: u32,
    /// Pause behaviour for in-flight elements
    pub pause_mode: PauseMode,
    /// Seed for lane and speed selection; `None` seeds from the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            element_height: 48,
            lane_padding: 8,
            base_speed_ms: 10_000,
            speed_variance_ms: 5_000,
            display_band: 0.6,
            font_size: 24.0,
            text_padding: 16,
            pause_mode: PauseMode::Admission,
            seed: None,
        }
    }
}

impl OverlayConfig {
    /// Set a fixed seed for reproducible placement.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the pause mode.
    pub fn with_pause_mode(mut self, mode: PauseMode) -> Self {
        self.pause_mode = mode;
        self
    }

    /// Minimum traversal time.
    pub fn base_speed(&self) -> Duration {
        Duration::from_millis(self.base_speed_ms)
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.element_height == 0 {
            return Err(DanmakuError::config("element_height must be positive"));
        }
        if !(self.display_band > 0.0 && self.display_band <= 1.0) {
            return Err(DanmakuError::config(format!(
                "display_band must be in (0, 1], got {}",
                self.display_band
            )));
        }
        if self.base_speed_ms == 0 {
            return Err(DanmakuError::config("base_speed_ms must be positive"));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(DanmakuError::config("font_size must be a positive number"));
        }
        if self.text_padding > MAX_TEXT_PADDING {
            return Err(DanmakuError::config(format!(
                "text_padding must be at most {MAX_TEXT_PADDING}, got {}",
                self.text_padding
            )));
        }
        Ok(())
    }
}

/// Timing of the comment feeder and the live viewer ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Gap between consecutive comments on a video screen
    pub video_interval_ms: u64,
    /// Minimum gap between comments on a live screen
    pub live_min_delay_ms: u64,
    /// Random extra gap on a live screen, exclusive upper bound
    pub live_delay_span_ms: u64,
    /// Viewer count refresh period
    pub viewer_period_ms: u64,
    /// Viewer count shown before the first refresh
    pub initial_viewers: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            video_interval_ms: 2_000,
            live_min_delay_ms: 500,
            live_delay_span_ms: 1_500,
            viewer_period_ms: 1_000,
            initial_viewers: 0,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.viewer_period_ms == 0 {
            return Err(DanmakuError::config("viewer_period_ms must be positive"));
        }
        if self.live_min_delay_ms == 0 && self.live_delay_span_ms == 0 {
            return Err(DanmakuError::config(
                "live feed needs a non-zero delay between comments",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OverlayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_speed(), Duration::from_millis(10_000));
        assert!(FeedConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_band() {
        let config = OverlayConfig {
            display_band: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DanmakuError::Config(_))));

        let config = OverlayConfig {
            display_band: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_height_and_speed() {
        let config = OverlayConfig {
            element_height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OverlayConfig {
            base_speed_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_padding() {
        let config = OverlayConfig {
            text_padding: u32::MAX / 2 + 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DanmakuError::Config(_))));

        let config = OverlayConfig {
            text_padding: MAX_TEXT_PADDING,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: OverlayConfig =
            toml::from_str("element_height = 32\npause_mode = \"freeze\"\n").unwrap();
        assert_eq!(config.element_height, 32);
        assert_eq!(config.pause_mode, PauseMode::Freeze);
        assert_eq!(config.base_speed_ms, 10_000);
        assert!(config.seed.is_none());
    }
}
