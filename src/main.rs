use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use speechgate::transcript::format_timestamp;
use speechgate::{
    analyze, audio, gatekeeper, ActivityReport, AnalyzerConfig, AppConfig, GateConfig, GateError,
    GateOutcome, GeminiConfig, GeminiProvider, TranscriptionProvider, ValidatedTranscript,
};
use std::env;
use std::fs;
use std::time::Instant;

#[cfg(not(test))]
fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .try_init();
    run_with_args(env::args_os())
}

#[cfg_attr(test, allow(dead_code))]
fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let config = AppConfig::parse_from(args);
    config.validate()?;

    let buffer = audio::decode_wav_file(&config.wav_path)
        .with_context(|| format!("failed to decode {}", config.wav_path.display()))?;
    let report = analyze(&buffer, &AnalyzerConfig::from(&config));
    print!("{}", render_report(&config.wav_path.display().to_string(), &report));

    if config.analyze_only {
        return Ok(());
    }

    // The provider gets the file's original bytes, not re-encoded samples.
    let audio_bytes = fs::read(&config.wav_path)
        .with_context(|| format!("failed to read {}", config.wav_path.display()))?;
    let provider = GeminiProvider::new(GeminiConfig::from(&config));
    debug!("provider model: {}", provider.name());

    let started = Instant::now();
    match gatekeeper::process(&report, &audio_bytes, &provider, &GateConfig::from(&config)) {
        Ok(GateOutcome::Skipped) => {
            println!();
            println!("No meaningful speech detected in the audio file.");
            println!("Skipping transcription to prevent hallucination.");
            Ok(())
        }
        Ok(GateOutcome::Transcribed(transcript)) => {
            println!();
            println!(
                "Provider round trip: {:.2}s",
                started.elapsed().as_secs_f64()
            );
            print!("{}", render_transcript(&transcript));
            Ok(())
        }
        Err(GateError::MalformedResponse { raw, source }) => {
            // The only locally recovered failure: show what the model said.
            println!();
            println!("--- Raw provider response (JSON parse failed: {source}) ---");
            println!("{raw}");
            Ok(())
        }
        Err(err) => Err(err).context("transcription failed"),
    }
}

fn render_report(path: &str, report: &ActivityReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Audio analysis for {path}:\n"));
    out.push_str(&format!(
        "  Duration:        {:.2}s\n",
        report.total_duration_seconds
    ));
    out.push_str(&format!("  RMS energy:      {:.4}\n", report.rms_energy));
    out.push_str(&format!(
        "  Speech duration: {:.2}s\n",
        report.estimated_speech_seconds
    ));
    out.push_str(&format!("  Silence ratio:   {:.2}\n", report.silence_ratio));
    out.push_str(&format!("  Has speech:      {}\n", report.has_speech));
    out
}

fn render_transcript(transcript: &ValidatedTranscript) -> String {
    let mut out = String::new();
    out.push_str("--- Transcript ---\n");

    if transcript.is_empty() {
        if transcript.filtered_low_confidence > 0 {
            out.push_str("No high-confidence speech detected after validation.\n");
        } else {
            out.push_str("No speech detected.\n");
        }
    }
    for entry in &transcript.entries {
        out.push_str(&format!(
            "[{} - {}] {}: {} [confidence: {:.2}]\n",
            format_timestamp(entry.start_time),
            format_timestamp(entry.end_time),
            entry.speaker,
            entry.text,
            entry.confidence,
        ));
    }

    if transcript.filtered_low_confidence > 0 {
        out.push_str(&format!(
            "Filtered {} low-confidence entr{}.\n",
            transcript.filtered_low_confidence,
            if transcript.filtered_low_confidence == 1 {
                "y"
            } else {
                "ies"
            }
        ));
    }
    if let Some(warning) = &transcript.overrun_warning {
        out.push_str(&format!("Warning: {warning}\n"));
    }
    out
}
