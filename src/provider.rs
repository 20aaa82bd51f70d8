//! The remote transcription boundary: a narrow capability trait so tests can
//! substitute a deterministic stand-in, plus the Gemini HTTP implementation.

use crate::config::AppConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Developer API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable holding a short-lived OAuth token for the Vertex
/// endpoint (used when `--project` is set). Credential minting itself stays
/// outside this tool.
pub const ACCESS_TOKEN_ENV: &str = "GEMINI_ACCESS_TOKEN";

/// Failures from the remote provider. None of these are retried; the caller
/// sees them as fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no credentials found: set the {0} environment variable")]
    MissingCredentials(&'static str),
    #[error("transcription request failed: {0}")]
    Transport(Box<ureq::Error>),
    #[error("provider returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("provider response did not match the expected schema: {0}")]
    Schema(#[from] std::io::Error),
    #[error("provider returned no candidates")]
    EmptyResponse,
}

/// Anything that can turn WAV bytes plus an instruction prompt into a raw
/// text response. One call per invocation; no streaming.
pub trait TranscriptionProvider {
    fn transcribe(&self, audio_wav: &[u8], prompt: &str) -> Result<String, ProviderError>;
    fn name(&self) -> &str {
        "unknown_provider"
    }
}

/// Connection settings for [`GeminiProvider`], mapped from CLI entries.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    /// When set, requests go to the Vertex endpoint for this project.
    pub project: Option<String>,
    pub location: String,
    pub timeout: Duration,
}

impl From<&AppConfig> for GeminiConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            project: cfg.project.clone(),
            location: cfg.location.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
    data: String,
}

/// Deterministic generation: temperature zero and a JSON response type, so
/// repeated runs over the same audio stay comparable.
#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Blocking HTTP client for the Gemini `generateContent` endpoint. The whole
/// tool is one linear pass over one file, so a synchronous agent is enough.
pub struct GeminiProvider {
    agent: ureq::Agent,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout(config.timeout)
            .build();
        Self { agent, config }
    }

    fn endpoint(&self) -> String {
        match &self.config.project {
            Some(project) => format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent",
                location = self.config.location,
                model = self.config.model,
            ),
            None => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.config.model
            ),
        }
    }

    fn auth_header(&self) -> Result<(&'static str, String), ProviderError> {
        if self.config.project.is_some() {
            let token = env::var(ACCESS_TOKEN_ENV)
                .map_err(|_| ProviderError::MissingCredentials(ACCESS_TOKEN_ENV))?;
            Ok(("Authorization", format!("Bearer {token}")))
        } else {
            let key = env::var(API_KEY_ENV)
                .map_err(|_| ProviderError::MissingCredentials(API_KEY_ENV))?;
            Ok(("x-goog-api-key", key))
        }
    }
}

impl TranscriptionProvider for GeminiProvider {
    fn transcribe(&self, audio_wav: &[u8], prompt: &str) -> Result<String, ProviderError> {
        let (header, value) = self.auth_header()?;
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: "audio/wav",
                            data: BASE64.encode(audio_wav),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(prompt),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        let url = self.endpoint();
        debug!(
            "sending {} audio bytes to {} (prompt: {} chars)",
            audio_wav.len(),
            url,
            prompt.len()
        );

        let response = self
            .agent
            .post(&url)
            .set(header, &value)
            .send_json(&request)
            .map_err(|err| match err {
                ureq::Error::Status(code, resp) => ProviderError::Status {
                    code,
                    body: resp.into_string().unwrap_or_default(),
                },
                other => ProviderError::Transport(Box::new(other)),
            })?;

        let body: GenerateResponse = response.into_json()?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();

        debug!("provider returned {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
