//! Text-to-speech synthesis against the remote transcription service.
//!
//! The service is quirky: it answers with raw audio, with a JSON pointer
//! to a hosted file, or with something else entirely, and the HTTP status
//! code carries no signal. [`SynthesisResult`] models that honestly so the
//! delivery pipeline can react per shape instead of guessing.

pub mod client;
pub mod fetch;
pub mod voice;

pub use client::{classify_response, SynthesisResult, TtsClient};
pub use fetch::AudioFetcher;
pub use voice::{VoicePreference, VoiceTable, DEFAULT_FEMALE_VOICE, DEFAULT_MALE_VOICE};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// TTS errors
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0} fetching audio")]
    Status(u16),

    #[error("invalid audio url: {0}")]
    InvalidUrl(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type for TTS operations
pub type Result<T> = std::result::Result<T, TtsError>;

/// Turns text into audio, one way or another.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the given narrator model.
    ///
    /// The call itself does not error: every failure mode is a
    /// [`SynthesisResult`] variant, including transport failures.
    async fn synthesize(&self, voice_model: &str, text: &str) -> SynthesisResult;
}

/// Retrieves audio bytes referenced by URL.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}
