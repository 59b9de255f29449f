//! HTTP client for the speech-to-text endpoint
//!
//! Posts the staged audio as a multipart form with a single `audio` field
//! and returns the trimmed transcript. Transient failures (transport errors,
//! 5xx) are retried per the configured [`RetryPolicy`]; client errors are
//! returned immediately.

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::{with_retries, RetryPolicy, Transcribe, TranscriptionError, TranscriptionResult};

/// Default per-request timeout; long lecture uploads can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Shared HTTP client (avoids TLS handshake overhead across requests).
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .build()
        .expect("Failed to build HTTP client")
});

/// STT endpoint response body.
#[derive(Debug, Deserialize)]
struct SttResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

/// Client for the speech-to-text collaborator.
#[derive(Debug, Clone)]
pub struct SttClient {
    endpoint: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl SttClient {
    pub fn new(endpoint: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            endpoint: endpoint.into(),
            policy,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let form = Form::new().part("audio", part);

        let response = HTTP_CLIENT
            .post(&self.endpoint)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let body: SttResponse = response
                .json()
                .await
                .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

            let text = body.text.trim().to_string();
            if text.is_empty() {
                tracing::info!("STT returned empty text (no speech detected)");
            } else {
                tracing::info!("Transcription successful: {} chars", text.len());
            }

            Ok(TranscriptionResult {
                text,
                language: body.language,
            })
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("STT endpoint error ({}): {}", status.as_u16(), message);
            Err(TranscriptionError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl Transcribe for SttClient {
    async fn transcribe(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        tracing::info!(
            "Transcribing {} ({} bytes, {})",
            file_name,
            bytes.len(),
            mime_type
        );

        with_retries(&self.policy, |_attempt| {
            self.request(bytes, file_name, mime_type)
        })
        .await
    }
}
