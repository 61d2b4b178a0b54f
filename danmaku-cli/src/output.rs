use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use danmaku::{EngineStats, LaneLayout, PlaybackKind};
use serde::Serialize;
use std::time::Duration;

/// Lane geometry for one surface size.
#[derive(Debug, Clone, Serialize)]
pub struct LaneReport {
    pub width: u32,
    pub height: u32,
    pub element_height: u32,
    pub lane_count: u32,
    pub tops: Vec<i32>,
}

impl LaneReport {
    pub fn new(layout: &LaneLayout, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            element_height: layout.element_height(),
            lane_count: layout.lane_count(),
            tops: (0..layout.lane_count()).map(|l| layout.top_of(l)).collect(),
        }
    }
}

/// Outcome of a simulated playback session.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub kind: String,
    pub elapsed_ms: u64,
    pub frames: u64,
    pub on_screen: usize,
    pub viewers: Option<u64>,
    pub feed_finished: bool,
    pub exited_by_key: bool,
    pub stats: EngineStats,
}

/// One periodic progress line during a simulation.
#[derive(Debug, Clone)]
pub struct Progress {
    pub kind: PlaybackKind,
    pub elapsed: Duration,
    pub on_screen: usize,
    pub admitted: u64,
    pub playing: bool,
    pub viewers: Option<u64>,
}

pub struct OutputManager {
    colored: bool,
}

enum Color {
    Green,
    Yellow,
    Cyan,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_lanes(&self, report: &LaneReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let mut output = String::new();
                output.push_str(&self.colorize("Lane Layout:", &Color::Green, true));
                output.push('\n');
                output.push_str(&self.field(
                    "Surface",
                    &format!("{}x{}", report.width, report.height),
                ));
                output.push_str(&self.field("Element height", &report.element_height.to_string()));
                output.push_str(&self.field("Lanes", &report.lane_count.to_string()));
                for (lane, top) in report.tops.iter().enumerate() {
                    output.push_str(&format!(
                        "    {} {}\n",
                        self.colorize(&format!("#{lane:<3}"), &Color::Yellow, false),
                        self.colorize(&format!("top={top}px"), &Color::Cyan, false)
                    ));
                }
                Ok(output)
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(report)?),
        }
    }

    pub fn format_simulation(
        &self,
        report: &SimulationReport,
        format: OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let stats = &report.stats;
                let mut output = String::new();
                output.push_str(&self.colorize("Simulation Summary:", &Color::Green, true));
                output.push('\n');
                output.push_str(&self.field("Kind", &report.kind));
                output.push_str(&self.field(
                    "Elapsed",
                    &format!("{:.1}s ({} frames)", report.elapsed_ms as f64 / 1000.0, report.frames),
                ));
                output.push_str(&self.field("Admitted", &stats.admitted.to_string()));
                output.push_str(&self.field("Completed", &stats.completed.to_string()));
                output.push_str(&self.field("Cleared", &stats.cleared.to_string()));
                output.push_str(&self.field(
                    "Rejected",
                    &format!(
                        "{} (empty {}, inactive {}, no room {})",
                        stats.rejected(),
                        stats.rejected_empty,
                        stats.rejected_inactive,
                        stats.rejected_no_room
                    ),
                ));
                output.push_str(&self.field("Peak on screen", &stats.peak_on_screen.to_string()));
                output.push_str(&self.field("On screen at end", &report.on_screen.to_string()));
                if let Some(viewers) = report.viewers {
                    output.push_str(&self.field("Viewers", &viewers.to_string()));
                }
                if report.exited_by_key {
                    output.push_str(&self.field("Ended by", "remote key"));
                }
                Ok(output)
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(report)?),
        }
    }

    pub fn format_progress(&self, progress: &Progress) -> String {
        let state = if progress.playing { "playing" } else { "paused" };
        let mut line = format!(
            "[{:>6.1}s] {} on screen={} admitted={}",
            progress.elapsed.as_secs_f64(),
            self.colorize(state, &Color::Yellow, false),
            self.colorize(&progress.on_screen.to_string(), &Color::Cyan, false),
            self.colorize(&progress.admitted.to_string(), &Color::Cyan, false),
        );
        if let Some(viewers) = progress.viewers {
            line.push(' ');
            line.push_str(&danmaku::viewer_label(&progress.kind.to_string(), viewers));
        }
        line
    }

    fn field(&self, name: &str, value: &str) -> String {
        format!(
            "  {}: {}\n",
            self.colorize(name, &Color::Yellow, false),
            self.colorize(value, &Color::Cyan, false)
        )
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}
