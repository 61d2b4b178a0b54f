use crate::{
    cli::{KeyEvent, OutputFormat},
    config::AppConfig,
    error::{Error, Result},
    output::{LaneReport, OutputManager, Progress, SimulationReport},
};
use danmaku::{
    DanmakuEngine, KeyOutcome, LaneLayout, MemorySurface, PlaybackKind, PlaybackSession,
    XmlFileSource,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Options of one `simulate` run.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub kind: PlaybackKind,
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
    pub fps: Option<u32>,
    pub seed: Option<u64>,
    pub source: Option<PathBuf>,
    pub keys: Vec<KeyEvent>,
    pub output: OutputFormat,
}

pub struct CommandExecutor {
    config: AppConfig,
    output: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            output: OutputManager::new(cfg!(feature = "colored-output")),
        }
    }

    pub async fn simulate(&self, options: SimulateOptions, shutdown: CancellationToken) -> Result<()> {
        let output = options.output;
        let report = self.run_simulation(options, shutdown).await?;
        println!("{}", self.output.format_simulation(&report, output)?);
        Ok(())
    }

    /// Drive a playback session against an in-memory surface until the
    /// duration elapses, a scripted key exits, or `shutdown` fires.
    pub async fn run_simulation(
        &self,
        options: SimulateOptions,
        shutdown: CancellationToken,
    ) -> Result<SimulationReport> {
        if options.width == 0 || options.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "surface size must be non-zero, got {}x{}",
                options.width, options.height
            )));
        }

        let fps = options.fps.unwrap_or(self.config.fps);
        if fps == 0 || fps > 240 {
            return Err(Error::InvalidArgument(format!(
                "fps must be between 1 and 240, got {fps}"
            )));
        }

        let mut overlay = self.config.overlay.clone();
        if let Some(seed) = options.seed {
            overlay = overlay.with_seed(seed);
        }

        let mut engine =
            DanmakuEngine::with_config(MemorySurface::new(), options.width, options.height, overlay);
        let source_id = match &options.source {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::InvalidArgument(format!(
                        "source file not found: {}",
                        path.display()
                    )));
                }
                engine = engine.with_source(Box::new(XmlFileSource::new()));
                Some(path.to_str().ok_or_else(|| {
                    Error::InvalidArgument(format!("non UTF-8 path: {}", path.display()))
                })?)
            }
            None => None,
        };
        if engine.lane_count() == 0 {
            warn!(height = options.height, "Surface too short for a single lane");
        }

        let mut keys: VecDeque<KeyEvent> = {
            let mut keys = options.keys.clone();
            keys.sort_by_key(|event| event.at);
            keys.into()
        };

        let mut session = PlaybackSession::open(
            options.kind,
            engine,
            source_id,
            &self.config.feed,
            &shutdown,
        );
        info!(
            kind = %options.kind,
            width = options.width,
            height = options.height,
            fps,
            lanes = session.engine().lane_count(),
            "Simulation started"
        );

        let frame = Duration::from_secs_f64(1.0 / f64::from(fps));
        let mut ticker = tokio::time::interval(frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let start = Instant::now();
        let mut frames = 0u64;
        let mut next_progress = Duration::from_secs(1);
        let mut exited_by_key = false;
        let mut viewers = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Simulation interrupted");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let elapsed = start.elapsed();
            while keys.front().is_some_and(|event| event.at <= elapsed) {
                let Some(event) = keys.pop_front() else {
                    break;
                };
                let outcome = session.on_key(event.key);
                debug!(key = %event.key, ?outcome, "Scripted key");
                if outcome == KeyOutcome::Exit {
                    exited_by_key = true;
                    break;
                }
            }
            if exited_by_key {
                break;
            }

            session.pump();
            session.on_frame(elapsed);
            frames += 1;
            viewers = session.viewer_count().or(viewers);

            if elapsed >= next_progress {
                next_progress += Duration::from_secs(1);
                let progress = Progress {
                    kind: session.kind(),
                    elapsed,
                    on_screen: session.engine().len(),
                    admitted: session.engine().stats().admitted,
                    playing: session.is_playing(),
                    viewers: session.viewer_count(),
                };
                info!(
                    on_screen = progress.on_screen,
                    admitted = progress.admitted,
                    viewers = progress.viewers,
                    "Progress"
                );
                if output_is_pretty(options.output) {
                    println!("{}", self.output.format_progress(&progress));
                }
            }

            if elapsed >= options.duration {
                break;
            }
        }

        let report = SimulationReport {
            kind: session.kind().to_string(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            frames,
            on_screen: session.engine().len(),
            viewers,
            feed_finished: session.feed_finished(),
            exited_by_key,
            stats: session.engine().stats().clone(),
        };
        session.destroy();
        Ok(report)
    }

    pub fn lanes(&self, width: u32, height: u32, format: OutputFormat) -> Result<()> {
        let layout = LaneLayout::new(&self.config.overlay, height);
        let report = LaneReport::new(&layout, width, height);
        println!("{}", self.output.format_lanes(&report, format)?);
        Ok(())
    }
}

fn output_is_pretty(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Pretty)
}
