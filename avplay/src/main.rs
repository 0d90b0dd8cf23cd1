use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_present::{FrameSurface, PlaybackMode, SessionController};
use media_types::MediaEvent;

mod outputs;
mod settings;
mod source;

use outputs::Outputs;
use settings::Settings;
use source::{SourceSpec, SyntheticSource};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    AudioVideo,
    AudioOnly,
    VideoOnly,
    FastVideoOnly,
    Disabled,
}

impl From<Mode> for PlaybackMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::AudioVideo => PlaybackMode::AudioVideo,
            Mode::AudioOnly => PlaybackMode::AudioOnly,
            Mode::VideoOnly => PlaybackMode::VideoOnly,
            Mode::FastVideoOnly => PlaybackMode::FastVideoOnly,
            Mode::Disabled => PlaybackMode::Disabled,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "avplay")]
#[command(about = "Plays a synthetic audio/video source through the real-time presentation scheduler")]
struct Args {
    /// Which streams to present, and how
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Media each queue may buffer, in milliseconds
    #[arg(long)]
    capacity_ms: Option<u64>,

    /// How early an item may be presented, in milliseconds
    #[arg(long)]
    early_ms: Option<u64>,

    /// How late an item may be presented before it is dropped, in milliseconds
    #[arg(long)]
    late_ms: Option<u64>,

    /// Present media as fast as it is decoded
    #[arg(long)]
    no_pacing: bool,

    /// Audio output buffer, in milliseconds
    #[arg(long)]
    audio_buffer_ms: Option<u64>,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,

    /// Length of the synthetic source, in seconds
    #[arg(short, long, default_value = "5")]
    duration: u64,

    /// Video frame rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Number of video streams
    #[arg(short = 'n', long, default_value = "1")]
    video_streams: usize,

    /// Video frame width
    #[arg(long, default_value = "320")]
    width: u32,

    /// Video frame height
    #[arg(long, default_value = "180")]
    height: u32,

    /// Print per-stream statistics as JSON when done
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        let presenter = &mut settings.presenter;
        if let Some(mode) = self.mode {
            presenter.mode = mode.into();
        }
        if self.no_pacing {
            presenter.realtime = false;
        }
        for timing in [&mut presenter.video, &mut presenter.audio] {
            if let Some(ms) = self.capacity_ms {
                timing.capacity_ms = ms;
            }
            if let Some(ms) = self.early_ms {
                timing.early_window_ms = ms;
            }
            if let Some(ms) = self.late_ms {
                timing.late_window_ms = ms;
            }
        }
        if let Some(ms) = self.audio_buffer_ms {
            settings.audio.buffer_ms = ms;
        }
    }
}

/**
    Polls display surfaces the way a renderer would and logs progress.
*/
struct Monitor {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl Monitor {
    fn start(surfaces: Vec<(usize, FrameSurface)>) -> anyhow::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("monitor".into())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) =
                    stopped.recv_timeout(Duration::from_secs(1))
                {
                    for (index, surface) in &surfaces {
                        let shown = surface.latest().map(|s| s.timestamp / 1_000);
                        info!(
                            stream = *index,
                            frames = surface.generation(),
                            showing_ms = ?shown,
                            "display"
                        );
                    }
                }
            })
            .context("failed to start monitor thread")?;
        Ok(Self { stop, thread })
    }

    fn stop(self) {
        drop(self.stop);
        if self.thread.join().is_err() {
            warn!("monitor thread panicked");
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avplay=info,media_present=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings_path = args.config.clone().or_else(Settings::default_path);
    let mut settings = match &settings_path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => Settings::default(),
    };
    args.apply(&mut settings);

    if args.save_config {
        match &settings_path {
            Some(path) => {
                settings
                    .save_to(path)
                    .with_context(|| format!("failed to save settings to {}", path.display()))?;
                info!(path = %path.display(), "settings saved");
            }
            None => warn!("no config directory, settings not saved"),
        }
    }

    let outputs = Outputs::open(&settings.audio)?;
    let mode = settings.presenter.mode;
    let source = SyntheticSource::new(SourceSpec {
        video_streams: if mode.shows_video() { args.video_streams } else { 0 },
        fps: args.fps,
        width: args.width,
        height: args.height,
        duration: Duration::from_secs(args.duration),
        audio: mode.plays_audio().then(|| outputs.audio_format()),
    });
    info!(
        mode = ?mode,
        video_streams = args.video_streams,
        audio_stream = ?source.audio_index(),
        seconds = args.duration,
        "starting playback"
    );

    let started = Instant::now();
    let mut session = SessionController::new(settings.presenter.clone(), outputs);
    let mut monitor = None;
    for event in source {
        if monitor.is_none() && matches!(event, MediaEvent::Decoded { .. }) {
            monitor = Some(Monitor::start(session.factory().surfaces())?);
        }
        session.handle(event);
    }
    if let Some(monitor) = monitor {
        monitor.stop();
    }

    let reports = session.stats();
    for report in &reports {
        info!(
            stream = report.index,
            kind = %report.kind,
            offered = report.stats.offered,
            presented = report.stats.dispatched,
            dropped = report.stats.dropped,
            abandoned = report.stats.abandoned,
            failed = report.stats.failed,
            "stream finished"
        );
    }
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "playback finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let failed = session.failed_streams();
    if !failed.is_empty() {
        bail!("streams {failed:?} stopped after their output failed");
    }
    Ok(())
}
