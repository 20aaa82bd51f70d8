//! Decides whether audio has earned a remote transcription call, and cleans
//! up what comes back. Silence never reaches the language model: a generative
//! model asked to transcribe nothing tends to invent something.

use crate::analyzer::ActivityReport;
use crate::config::{AppConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_OVERRUN_FACTOR};
use crate::provider::{ProviderError, TranscriptionProvider};
use crate::transcript::{filter_by_confidence, parse_entries, ValidatedTranscript};
use log::{debug, warn};
use thiserror::Error;

/// Extra seconds of transcript tolerated before the overrun advisory fires,
/// on top of the multiplicative factor. Keeps short clips from warning over
/// rounding noise.
const OVERRUN_SLACK_SECONDS: f64 = 1.0;

/// Tunables for response validation, mapped from CLI entries.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Entries below this confidence are dropped.
    pub confidence_threshold: f64,
    /// Advisory fires when transcribed time exceeds detected speech time by
    /// this factor. A heuristic overrun detector, not a correctness filter.
    pub overrun_factor: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            overrun_factor: DEFAULT_OVERRUN_FACTOR,
        }
    }
}

impl From<&AppConfig> for GateConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            confidence_threshold: cfg.confidence_threshold,
            overrun_factor: cfg.overrun_factor,
        }
    }
}

/// What the gatekeeper produced for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// The analyzer found no meaningful speech; no provider call was made.
    Skipped,
    Transcribed(ValidatedTranscript),
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The provider answered, but not with a transcript JSON array. The raw
    /// text is kept so the caller can fall back to displaying it.
    #[error("provider response is not a transcript array: {source}")]
    MalformedResponse {
        raw: String,
        source: serde_json::Error,
    },
}

impl GateError {
    /// Raw provider text, when this failure still carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            GateError::MalformedResponse { raw, .. } => Some(raw),
            GateError::Provider(_) => None,
        }
    }
}

/// The fixed instruction prompt. Deterministic apart from the embedded
/// analyzer numbers, which give the model an upper bound on how much speech
/// it should claim to have heard.
pub fn build_prompt(report: &ActivityReport) -> String {
    format!(
        "You are a careful transcriptionist. Transcribe ONLY speech that is clearly \
audible in the attached audio.\n\
\n\
Context from local signal analysis:\n\
- audio duration: {duration:.2} seconds\n\
- detected speech: {speech:.2} seconds\n\
- silence ratio: {silence:.2}\n\
\n\
Rules:\n\
1. Never invent words. If no speech is clearly audible, return an empty array [].\n\
2. Label voices \"Speaker 1\", \"Speaker 2\", ... only when distinct voices are \
acoustically evident; never guess who a speaker is.\n\
3. Produce no entries for silence, background noise, or unclear audio.\n\
4. Write a word once even if echo or stutter repeats it.\n\
5. When in doubt about specific words, leave them out.\n\
\n\
Respond with a JSON array only. Each element is an object with:\n\
- \"start_time\": number, seconds from the start of the audio\n\
- \"end_time\": number, seconds, never before start_time\n\
- \"speaker\": string\n\
- \"text\": string\n\
- \"confidence\": number from 0.0 to 1.0\n\
\n\
An empty array is always better than fabricated content.",
        duration = report.total_duration_seconds,
        speech = report.estimated_speech_seconds,
        silence = report.silence_ratio,
    )
}

/// Gate, call, parse, filter. The provider is only invoked when the analyzer
/// judged the audio to contain speech.
pub fn process(
    report: &ActivityReport,
    audio_wav: &[u8],
    provider: &dyn TranscriptionProvider,
    cfg: &GateConfig,
) -> Result<GateOutcome, GateError> {
    if !report.has_speech {
        debug!(
            "gate closed: {:.2}s of detected speech, rms {:.4}",
            report.estimated_speech_seconds, report.rms_energy
        );
        return Ok(GateOutcome::Skipped);
    }

    let prompt = build_prompt(report);
    let raw = provider.transcribe(audio_wav, &prompt)?;

    let entries = parse_entries(&raw).map_err(|source| GateError::MalformedResponse {
        raw: raw.clone(),
        source,
    })?;

    let total = entries.len();
    let (kept, filtered_low_confidence) = filter_by_confidence(entries, cfg.confidence_threshold);
    debug!(
        "confidence filter kept {}/{} entries at threshold {:.2}",
        kept.len(),
        total,
        cfg.confidence_threshold
    );

    let mut transcript = ValidatedTranscript {
        entries: kept,
        filtered_low_confidence,
        overrun_warning: None,
    };
    transcript.overrun_warning = overrun_advisory(&transcript, report, cfg);

    Ok(GateOutcome::Transcribed(transcript))
}

/// Compare transcript coverage against detected speech. Advisory only; data
/// is never discarded here.
fn overrun_advisory(
    transcript: &ValidatedTranscript,
    report: &ActivityReport,
    cfg: &GateConfig,
) -> Option<String> {
    let transcribed = transcript.transcribed_seconds();
    let budget = report.estimated_speech_seconds * cfg.overrun_factor + OVERRUN_SLACK_SECONDS;
    if transcribed <= budget {
        return None;
    }
    let message = format!(
        "transcript covers {transcribed:.2}s of speech but the analyzer only detected \
{detected:.2}s; some entries may be fabricated",
        detected = report.estimated_speech_seconds,
    );
    warn!("{message}");
    Some(message)
}
