//! Command-line parsing and validation helpers.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_WINDOW_MS: u64 = 100;
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 0.005;
pub const DEFAULT_MIN_SPEECH_MS: u64 = 200;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_OVERRUN_FACTOR: f64 = 3.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const MIN_WINDOW_MS: u64 = 10;
const MAX_WINDOW_MS: u64 = 5_000;

/// CLI options. Validated values keep the analyzer and the provider call
/// within sane bounds before any file or network I/O happens.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "Analyze a WAV file for speech and, only if some is found, transcribe it with a hosted model",
    author,
    version
)]
pub struct AppConfig {
    /// PCM WAV file to analyze (8/16/32-bit integer or 32-bit float, mono or stereo)
    pub wav_path: PathBuf,

    /// Model identifier sent to the provider
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Google Cloud project; when set, requests go to the Vertex endpoint
    #[arg(long)]
    pub project: Option<String>,

    /// Vertex region
    #[arg(long, default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// Analysis window length (milliseconds)
    #[arg(long = "window-ms", default_value_t = DEFAULT_WINDOW_MS)]
    pub window_ms: u64,

    /// RMS level below which a window counts as silence (normalized amplitude)
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    pub silence_threshold: f64,

    /// Minimum detected speech before transcription is attempted (milliseconds)
    #[arg(long = "min-speech-ms", default_value_t = DEFAULT_MIN_SPEECH_MS)]
    pub min_speech_ms: u64,

    /// Transcript entries below this confidence are dropped
    #[arg(long = "confidence-threshold", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f64,

    /// Warn when transcribed time exceeds detected speech time by this factor
    #[arg(long = "overrun-factor", default_value_t = DEFAULT_OVERRUN_FACTOR)]
    pub overrun_factor: f64,

    /// HTTP timeout for the provider call (seconds)
    #[arg(long = "timeout-secs", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Print the audio analysis and exit without contacting the provider
    #[arg(long = "analyze-only")]
    pub analyze_only: bool,
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before anything expensive runs.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WINDOW_MS..=MAX_WINDOW_MS).contains(&self.window_ms) {
            bail!(
                "--window-ms must be between {MIN_WINDOW_MS} and {MAX_WINDOW_MS}, got {}",
                self.window_ms
            );
        }

        if !(self.silence_threshold > 0.0 && self.silence_threshold < 1.0) {
            bail!(
                "--silence-threshold must be strictly between 0 and 1, got {}",
                self.silence_threshold
            );
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "--confidence-threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            );
        }

        if self.overrun_factor < 1.0 {
            bail!(
                "--overrun-factor must be at least 1, got {}",
                self.overrun_factor
            );
        }

        if self.timeout_secs == 0 {
            bail!("--timeout-secs must be positive");
        }

        if self.project.is_none() && self.location != DEFAULT_LOCATION {
            bail!("--location only applies to the Vertex endpoint; set --project as well");
        }

        if !self.wav_path.is_file() {
            bail!("audio file not found: {}", self.wav_path.display());
        }

        Ok(())
    }
}
