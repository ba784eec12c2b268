//! # Tuner - Command Line Front End
//!
//! Drives the `tuner-core` frame pipeline from the microphone or from a WAV
//! file and prints one reading per analyzed window.
//!
//! ## Architecture
//! - **Audio Thread**: CPAL callback cuts the input into sample windows
//! - **Main Thread**: scheduler pulls windows over a crossbeam channel and
//!   analyzes them one at a time
//! - **Stop**: Enter, the `--duration` timer, or the input closing clears
//!   the shared listening flag

mod display;
mod wav;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpal::traits::StreamTrait;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tuner_core::pitch::FrequencyBand;
use tuner_core::{
    Analyzer, ChannelSource, ListeningFlag, Scheduler, TunerConfig, WINDOW_SIZE, audio,
};

use display::Display;

/// Windows buffered between the audio callback and the analysis loop.
const WINDOW_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "tuner", version, about = "Autocorrelation instrument tuner")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print one JSON object per reading instead of the text meter
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Tune live from the default input device
    Listen {
        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },
    /// Analyze a WAV file window by window
    Analyze {
        /// Path to a WAV file
        file: PathBuf,
    },
    /// Write the default configuration as JSON
    DefaultConfig {
        /// Output path; prints to stdout when omitted
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let display = Display::new(cli.json);

    match cli.command {
        Command::Listen { duration } => {
            let config = load_config(cli.config.as_deref())?;
            listen(&config, &display, duration)
        }
        Command::Analyze { file } => {
            let config = load_config(cli.config.as_deref())?;
            analyze_file(&config, &display, &file)
        }
        Command::DefaultConfig { output } => write_default_config(output.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<TunerConfig> {
    let config = TunerConfig::load_or_default(path).with_context(|| match path {
        Some(p) => format!("loading config from {}", p.display()),
        None => "building default config".to_string(),
    })?;
    info!(
        estimator = ?config.estimator,
        reference_hz = config.reference_hz,
        "configuration loaded"
    );
    Ok(config)
}

/// Runs a live session until the flag is cleared or capture stops.
fn listen(config: &TunerConfig, display: &Display, duration: Option<f64>) -> Result<()> {
    let analyzer = Analyzer::from_config(config)?;
    let flag = ListeningFlag::new(true);
    let duration = duration.map(session_duration).transpose()?;

    let (window_tx, window_rx) = crossbeam_channel::bounded(WINDOW_QUEUE_DEPTH);
    let (stream, sample_rate) = audio::start_audio_capture(window_tx, config.capture_sample_rate)
        .context("starting audio capture")?;
    warn_if_band_unreachable(config, sample_rate);
    info!(sample_rate, window = WINDOW_SIZE, "Listening... play a note (press Enter to stop)");

    if let Some(duration) = duration {
        let timer_flag = flag.clone();
        thread::spawn(move || {
            thread::sleep(duration);
            timer_flag.stop();
        });
    }

    let enter_flag = flag.clone();
    thread::spawn(move || {
        let mut line = String::new();
        // EOF on stdin also stops.
        let _ = std::io::stdin().lock().read_line(&mut line);
        enter_flag.stop();
    });

    let scheduler = Scheduler::with_flag(analyzer, flag.clone());
    let summary = scheduler.run(ChannelSource::new(window_rx, flag), |reading| {
        display.show(reading, None)
    });

    info!("Stopping stream...");
    if let Err(e) = stream.pause() {
        error!("Error pausing stream: {}", e);
    }
    drop(stream);
    info!(
        frames = summary.frames,
        readings = summary.readings,
        "Stopped listening"
    );
    Ok(())
}

fn analyze_file(config: &TunerConfig, display: &Display, path: &Path) -> Result<()> {
    let analyzer = Analyzer::from_config(config)?;
    let (sample_rate, windows) = wav::read_windows(path)?;
    info!(
        file = %path.display(),
        sample_rate,
        windows = windows.len(),
        "analyzing file"
    );
    warn_if_band_unreachable(config, sample_rate);

    let window_secs = WINDOW_SIZE as f32 / sample_rate as f32;
    let scheduler = Scheduler::new(analyzer);
    let mut readings = 0;
    for (index, result) in scheduler.frames(windows).enumerate() {
        let time_s = index as f32 * window_secs;
        match result {
            Ok(reading) => {
                readings += 1;
                display.show(&reading, Some(time_s));
            }
            Err(e) if !e.is_fatal() => display.show_silence(time_s),
            Err(e) => return Err(e.into()),
        }
    }
    info!(readings, "analysis finished");
    Ok(())
}

/// Converts `--duration` seconds, rejecting negative, NaN and overflowing values.
fn session_duration(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| {
        format!("invalid --duration {secs}: expected a finite, non-negative number")
    })
}

/// Lags are capped at half a window, so high sample rates raise the lowest
/// detectable fundamental above the configured band.
fn warn_if_band_unreachable(config: &TunerConfig, sample_rate: u32) {
    let reachable_hz = FrequencyBand::lowest_reachable_hz(sample_rate, WINDOW_SIZE);
    if config.band.min_hz < reachable_hz {
        warn!(
            min_hz = config.band.min_hz,
            reachable_hz,
            sample_rate,
            "tones below the reachable minimum will not be detected"
        );
    }
}

fn write_default_config(output: Option<&Path>) -> Result<()> {
    let config = TunerConfig::default();
    match output {
        Some(path) => {
            config
                .save(path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Default configuration written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
