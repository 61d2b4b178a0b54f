//! Overlay statistics.
//!
//! Counters the engine keeps about admissions and removals. They are purely
//! diagnostic and never influence engine behaviour.

use serde::{Deserialize, Serialize};

/// Why a comment was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Text was absent or empty
    EmptyText,
    /// Engine paused, stopped or released
    Inactive,
    /// Surface too short for a single lane
    NoLanes,
    /// Surface refused the element
    SurfaceRefused,
}

/// Counters for one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Elements attached to the surface
    pub admitted: u64,
    /// Comments dropped because their text was empty or absent
    pub rejected_empty: u64,
    /// Comments dropped because the engine was not running
    pub rejected_inactive: u64,
    /// Comments dropped because no lane or surface slot was available
    pub rejected_no_room: u64,
    /// Elements that finished their traversal
    pub completed: u64,
    /// Elements removed by `clear()` or `release()`
    pub cleared: u64,
    /// Largest number of elements on screen at once
    pub peak_on_screen: u64,
}

impl EngineStats {
    pub(crate) fn record_admitted(&mut self, on_screen: usize) {
        self.admitted += 1;
        self.peak_on_screen = self.peak_on_screen.max(on_screen as u64);
    }

    pub(crate) fn record_rejected(&mut self, reason: Rejection) {
        match reason {
            Rejection::EmptyText => self.rejected_empty += 1,
            Rejection::Inactive => self.rejected_inactive += 1,
            Rejection::NoLanes | Rejection::SurfaceRefused => self.rejected_no_room += 1,
        }
    }

    pub(crate) fn record_completed(&mut self, count: usize) {
        self.completed += count as u64;
    }

    pub(crate) fn record_cleared(&mut self, count: usize) {
        self.cleared += count as u64;
    }

    /// Total number of comments that were not admitted.
    pub fn rejected(&self) -> u64 {
        self.rejected_empty + self.rejected_inactive + self.rejected_no_room
    }

    /// Elements admitted but neither completed nor cleared yet.
    pub fn in_flight(&self) -> u64 {
        self.admitted
            .saturating_sub(self.completed)
            .saturating_sub(self.cleared)
    }
}
