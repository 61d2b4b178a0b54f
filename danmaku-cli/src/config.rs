use danmaku::{FeedConfig, OverlayConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Simulator configuration, stored as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frames per second of the simulated host
    pub fps: u32,
    pub overlay: OverlayConfig,
    pub feed: FeedConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            overlay: OverlayConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location. A missing file yields
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Write the defaults to `path` or the default location.
    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path().ok_or_else(|| {
                Error::InvalidArgument("no configuration directory on this platform".into())
            })?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default().show()?)?;
        Ok(path)
    }

    /// Render as TOML.
    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 || self.fps > 240 {
            return Err(Error::InvalidArgument(format!(
                "fps must be between 1 and 240, got {}",
                self.fps
            )));
        }
        self.overlay.validate()?;
        self.feed.validate()?;
        Ok(())
    }
}

/// `<config dir>/danmaku/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("danmaku").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_reset_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let written = AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(written, path);
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "fps = 30\n\n[overlay]\nbase_speed_ms = 8000\nseed = 5\n\n[feed]\nvideo_interval_ms = 500\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.fps, 30);
        assert_eq!(config.overlay.base_speed_ms, 8000);
        assert_eq!(config.overlay.seed, Some(5));
        assert_eq!(config.overlay.element_height, 48);
        assert_eq!(config.feed.video_interval_ms, 500);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "fps = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(Error::InvalidArgument(_))
        ));

        fs::write(&path, "[overlay]\ndisplay_band = 2.0\n").unwrap();
        assert!(matches!(AppConfig::load(Some(&path)), Err(Error::Danmaku(_))));

        fs::write(&path, "fps = \"fast\"\n").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(Error::ConfigParse(_))
        ));
    }
}
