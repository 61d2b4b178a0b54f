//! Lane layout.
//!
//! Lanes are fixed horizontal tracks stacked from the top of the surface. Only
//! the configured display band is used so the lower part of the screen stays
//! free for playback controls.

use rand::Rng;

use crate::config::OverlayConfig;

/// Lane geometry for one surface size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneLayout {
    element_height: u32,
    lane_padding: u32,
    lane_count: u32,
}

impl LaneLayout {
    /// Compute the lane layout for a surface of the given height.
    pub fn new(config: &OverlayConfig, surface_height: u32) -> Self {
        let lane_count = if config.element_height == 0 {
            0
        } else {
            let band = config.display_band * f64::from(surface_height);
            (band / f64::from(config.element_height)).floor() as u32
        };

        Self {
            element_height: config.element_height,
            lane_padding: config.lane_padding,
            lane_count,
        }
    }

    /// Number of usable lanes. Zero when the band is shorter than one element.
    pub fn lane_count(&self) -> u32 {
        self.lane_count
    }

    pub fn element_height(&self) -> u32 {
        self.element_height
    }

    /// Top edge of a lane in surface pixels.
    pub fn top_of(&self, lane: u32) -> i32 {
        let top = u64::from(lane) * u64::from(self.element_height) + u64::from(self.lane_padding);
        i32::try_from(top).unwrap_or(i32::MAX)
    }

    /// Pick a lane uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u32> {
        if self.lane_count == 0 {
            return None;
        }
        Some(rng.random_range(0..self.lane_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_lane_count_uses_display_band() {
        let layout = LaneLayout::new(&OverlayConfig::default(), 1080);
        // 0.6 * 1080 / 48 = 13.5
        assert_eq!(layout.lane_count(), 13);

        let layout = LaneLayout::new(&OverlayConfig::default(), 720);
        assert_eq!(layout.lane_count(), 9);
    }

    #[test]
    fn test_lane_top_offsets() {
        let layout = LaneLayout::new(&OverlayConfig::default(), 1080);
        assert_eq!(layout.top_of(0), 8);
        assert_eq!(layout.top_of(1), 56);
        assert_eq!(layout.top_of(12), 12 * 48 + 8);
    }

    #[test]
    fn test_short_surface_has_no_lanes() {
        let layout = LaneLayout::new(&OverlayConfig::default(), 60);
        assert_eq!(layout.lane_count(), 0);

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(layout.pick(&mut rng), None);
    }

    #[test]
    fn test_pick_stays_in_range() {
        let layout = LaneLayout::new(&OverlayConfig::default(), 1080);
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = [false; 13];
        for _ in 0..1000 {
            let lane = layout.pick(&mut rng).unwrap();
            assert!(lane < 13);
            seen[lane as usize] = true;
        }
        assert!(seen.iter().all(|s| *s), "every lane should be reachable");
    }
}
