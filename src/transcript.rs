//! Transcript entries as returned by the provider, plus the confidence filter
//! applied before anything is shown to the user.

use serde::{Deserialize, Serialize};

/// One timestamped utterance from the provider's JSON array. Missing fields
/// are tolerated: the provider is an LLM and occasionally drops keys, so
/// `speaker` falls back to "Unknown" and `confidence` to a neutral 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    #[serde(default = "default_speaker")]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_speaker() -> String {
    "Unknown".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

impl TranscriptEntry {
    /// Length of the utterance in seconds. Clamped at zero because the
    /// provider does not guarantee `end_time >= start_time`.
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// Entries that survived the confidence filter, in the order the provider
/// returned them, plus bookkeeping for the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTranscript {
    pub entries: Vec<TranscriptEntry>,
    /// How many entries the confidence filter dropped.
    pub filtered_low_confidence: usize,
    /// Advisory only: set when the transcript covers implausibly more time
    /// than the analyzer detected as speech.
    pub overrun_warning: Option<String>,
}

impl ValidatedTranscript {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total seconds of audio the surviving entries claim to cover.
    pub fn transcribed_seconds(&self) -> f64 {
        self.entries.iter().map(TranscriptEntry::duration_seconds).sum()
    }
}

/// Parse the provider's raw response as a JSON array of entries.
pub fn parse_entries(raw: &str) -> Result<Vec<TranscriptEntry>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Split entries into (kept, dropped-count) by confidence, preserving order.
pub fn filter_by_confidence(
    entries: Vec<TranscriptEntry>,
    threshold: f64,
) -> (Vec<TranscriptEntry>, usize) {
    let total = entries.len();
    let kept: Vec<TranscriptEntry> = entries
        .into_iter()
        .filter(|entry| entry.confidence >= threshold)
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Render seconds as `MM:SS` for console timestamps.
pub fn format_timestamp(seconds: f64) -> String {
    let clamped = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", clamped / 60, clamped % 60)
}
