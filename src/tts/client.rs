//! HTTP client for the transcription endpoint.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header;

use super::{Result, TtsError};
use crate::config::TtsConfig;

/// How much of an unrecognized body is kept for diagnostics.
const BODY_PREFIX_CHARS: usize = 200;

/// User-Agent sent with every synthesis request.
const USER_AGENT: &str = concat!("ovozbot/", env!("CARGO_PKG_VERSION"));

/// Everything a synthesis attempt can produce.
///
/// The endpoint signals its answer through the `Content-Type` header, not
/// the status code, so classification happens on header plus body shape.
#[derive(Debug, Clone)]
pub enum SynthesisResult {
    /// The response body is the audio itself.
    InlineAudio { bytes: Bytes, content_type: String },
    /// The response is JSON pointing at a hosted audio file.
    RemoteAudioRef { url: String },
    /// Neither audio nor a usable JSON pointer. Carries a bounded body
    /// prefix for the logs, never the full payload.
    Unrecognized { body_prefix: String },
    /// The request itself failed before a response body was read.
    TransportFailure { cause: TtsError },
}

/// Client for the remote TTS service.
pub struct TtsClient {
    client: reqwest::Client,
    endpoint: String,
    url_field: String,
}

impl TtsClient {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            url_field: config.url_field.clone(),
        })
    }

    /// Request synthesis of `text` with the given narrator model.
    pub async fn synthesize(&self, voice_model: &str, text: &str) -> SynthesisResult {
        let payload = serde_json::json!({
            "userId": "public-access",
            "platform": "landing_demo",
            "ssml": ssml_envelope(text),
            "voice": voice_model,
            "narrationStyle": "regular",
        });

        tracing::debug!(
            voice_model,
            chars = text.chars().count(),
            "requesting synthesis"
        );

        let response = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => return SynthesisResult::TransportFailure { cause: e.into() },
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return SynthesisResult::TransportFailure { cause: e.into() },
        };

        classify_response(&content_type, body, &self.url_field)
    }
}

#[async_trait::async_trait]
impl super::Synthesizer for TtsClient {
    async fn synthesize(&self, voice_model: &str, text: &str) -> SynthesisResult {
        TtsClient::synthesize(self, voice_model, text).await
    }
}

/// Wrap raw text in the SSML envelope the service expects.
fn ssml_envelope(text: &str) -> String {
    format!("<speak><p>{text}</p></speak>")
}

/// Classify a service response by `Content-Type` and body shape.
///
/// A content type mentioning `audio` wins outright. JSON bodies must carry
/// a string under `url_field` to count as a remote reference; anything
/// else is unrecognized.
pub fn classify_response(content_type: &str, body: Bytes, url_field: &str) -> SynthesisResult {
    if content_type.contains("audio") {
        return SynthesisResult::InlineAudio {
            bytes: body,
            content_type: content_type.to_string(),
        };
    }

    if content_type.contains("application/json") {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) {
            if let Some(url) = value.get(url_field).and_then(|v| v.as_str()) {
                return SynthesisResult::RemoteAudioRef {
                    url: url.to_string(),
                };
            }
        }
    }

    SynthesisResult::Unrecognized {
        body_prefix: body_prefix(&body),
    }
}

fn body_prefix(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_PREFIX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssml_envelope_wraps_text() {
        assert_eq!(
            ssml_envelope("Salom dunyo"),
            "<speak><p>Salom dunyo</p></speak>"
        );
    }

    #[test]
    fn test_audio_content_type_is_inline_audio() {
        let body = Bytes::from_static(b"OggS\x00fake-audio");
        match classify_response("audio/ogg", body.clone(), "file") {
            SynthesisResult::InlineAudio {
                bytes,
                content_type,
            } => {
                assert_eq!(bytes, body);
                assert_eq!(content_type, "audio/ogg");
            }
            other => panic!("expected inline audio, got {other:?}"),
        }
    }

    #[test]
    fn test_audio_with_parameters_still_counts() {
        let body = Bytes::from_static(b"\x00\x01");
        assert!(matches!(
            classify_response("audio/mpeg; charset=binary", body, "file"),
            SynthesisResult::InlineAudio { .. }
        ));
    }

    #[test]
    fn test_json_with_url_field_is_remote_ref() {
        let body = Bytes::from_static(br#"{"file": "https://cdn.example/audio.ogg"}"#);
        match classify_response("application/json", body, "file") {
            SynthesisResult::RemoteAudioRef { url } => {
                assert_eq!(url, "https://cdn.example/audio.ogg");
            }
            other => panic!("expected remote ref, got {other:?}"),
        }
    }

    #[test]
    fn test_json_missing_url_field_is_unrecognized() {
        let body = Bytes::from_static(br#"{"error": "quota exceeded"}"#);
        assert!(matches!(
            classify_response("application/json", body, "file"),
            SynthesisResult::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_json_with_non_string_url_field_is_unrecognized() {
        let body = Bytes::from_static(br#"{"file": 42}"#);
        assert!(matches!(
            classify_response("application/json", body, "file"),
            SynthesisResult::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_malformed_json_is_unrecognized() {
        let body = Bytes::from_static(b"{not json");
        assert!(matches!(
            classify_response("application/json", body, "file"),
            SynthesisResult::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_url_field_name_is_honored() {
        let body =
            Bytes::from_static(br#"{"audioUrl": "https://cdn.example/a.ogg", "file": "decoy"}"#);
        match classify_response("application/json", body, "audioUrl") {
            SynthesisResult::RemoteAudioRef { url } => {
                assert_eq!(url, "https://cdn.example/a.ogg");
            }
            other => panic!("expected remote ref, got {other:?}"),
        }
    }

    #[test]
    fn test_html_error_page_is_unrecognized_with_bounded_prefix() {
        let page = format!("<html>{}</html>", "x".repeat(500));
        match classify_response("text/html", Bytes::from(page), "file") {
            SynthesisResult::Unrecognized { body_prefix } => {
                assert_eq!(body_prefix.chars().count(), BODY_PREFIX_CHARS);
                assert!(body_prefix.starts_with("<html>"));
            }
            other => panic!("expected unrecognized, got {other:?}"),
        }
    }

    #[test]
    fn test_prefix_survives_invalid_utf8() {
        let body = Bytes::from_static(&[0xff, 0xfe, b'o', b'k']);
        match classify_response("application/octet-stream", body, "file") {
            SynthesisResult::Unrecognized { body_prefix } => {
                assert!(body_prefix.contains("ok"));
            }
            other => panic!("expected unrecognized, got {other:?}"),
        }
    }
}
