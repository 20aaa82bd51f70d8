pub mod analyzer;
pub mod audio;
pub mod config;
pub mod gatekeeper;
pub mod provider;
pub mod transcript;

pub use analyzer::{analyze, ActivityReport, AnalyzerConfig};
pub use audio::{decode_wav_file, AudioBuffer, DecodeError};
pub use config::AppConfig;
pub use gatekeeper::{process, GateConfig, GateError, GateOutcome};
pub use provider::{GeminiConfig, GeminiProvider, ProviderError, TranscriptionProvider};
pub use transcript::{TranscriptEntry, ValidatedTranscript};
