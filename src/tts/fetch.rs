//! Downloader for audio hosted behind a URL reference.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::{AudioSource, Result, TtsError};
use crate::config::TtsConfig;

/// Fetches referenced audio over HTTP.
///
/// Unlike synthesis, a fetch is strict: anything but a 200 with a body is
/// a failure. The URL comes from a third-party response body, so only
/// http(s) schemes are accepted.
pub struct AudioFetcher {
    client: reqwest::Client,
}

impl AudioFetcher {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::Config(format!("http client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AudioSource for AudioFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let parsed = Url::parse(url).map_err(|e| TtsError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(TtsError::InvalidUrl(format!(
                "unsupported scheme {:?}",
                parsed.scheme()
            )));
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TtsError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        tracing::debug!(url, bytes = body.len(), "fetched referenced audio");
        Ok(body)
    }
}
