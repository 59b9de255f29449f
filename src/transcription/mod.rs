//! Speech-to-text client types
//!
//! The transcription endpoint takes a multipart upload with a single `audio`
//! field and returns `{ text, language? }`. Empty text is a valid outcome
//! ("no speech detected"), not an error.

pub mod client;

pub use client::SttClient;

use std::future::Future;
use std::time::Duration;

/// Map a file extension to the MIME type sent with the upload.
/// Unknown extensions fall back to a generic audio MIME instead of failing.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/m4a",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        "mp4" => "audio/mp4",
        "mpeg" => "audio/mpeg",
        "mpga" => "audio/mpeg",
        _ => "audio/mpeg",
    }
}

/// Result of a successful transcription request.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Trimmed transcript; empty means no speech was detected.
    pub text: String,
    pub language: Option<String>,
}

/// Retry configuration for the transcription call.
///
/// One canonical policy replaces the per-screen drift in the original app:
/// retry `max_retries` times, waiting `base_delay_ms * attempt` before each
/// retry, so delays are monotonically non-decreasing (2s, 4s with defaults).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms * u64::from(attempt))
    }
}

/// Errors that can occur during transcription.
#[derive(Debug, Clone)]
pub enum TranscriptionError {
    /// Transport-level failure (connect, timeout, body read).
    Network(String),
    /// Well-formed non-2xx response from the endpoint.
    Api { status: u16, message: String },
    /// Response body did not parse.
    Parse(String),
}

impl TranscriptionError {
    /// Transport errors and server-side (>= 500) statuses are worth
    /// retrying; client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranscriptionError::Network(_) => true,
            TranscriptionError::Api { status, .. } => *status >= 500,
            TranscriptionError::Parse(_) => false,
        }
    }
}

impl std::fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionError::Network(e) => write!(f, "Network error: {}", e),
            TranscriptionError::Api { status, message } => {
                write!(f, "Transcription service error ({}): {}", status, message)
            }
            TranscriptionError::Parse(e) => write!(f, "Failed to parse STT response: {}", e),
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// Seam between the pipeline and the speech-to-text collaborator, so tests
/// can drive the pipeline with stub services.
pub trait Transcribe {
    fn transcribe(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> impl Future<Output = Result<TranscriptionResult, TranscriptionError>> + Send;
}

/// Run `op` with bounded retries per `policy`.
///
/// `op` receives the 0-based attempt number. At most `max_retries + 1`
/// attempts are issued; non-retryable errors short-circuit.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, TranscriptionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TranscriptionError>>,
{
    let mut last_err = TranscriptionError::Network("no attempts made".to_string());

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying");
            tokio::time::sleep(delay).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if err.is_retryable() && attempt < policy.max_retries {
                    tracing::warn!(attempt, error = %err, "Transient failure, will retry");
                    last_err = err;
                    continue;
                }
                return Err(err);
            }
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn mime_mapping_covers_all_supported_extensions() {
        for ext in crate::capture::SUPPORTED_EXTENSIONS {
            let mime = mime_for_extension(ext);
            assert!(!mime.is_empty());
            assert!(mime.starts_with("audio/"), "bad mime for {}: {}", ext, mime);
        }
    }

    #[test]
    fn unknown_extension_falls_back_without_panicking() {
        assert_eq!(mime_for_extension("xyz"), "audio/mpeg");
        assert_eq!(mime_for_extension(""), "audio/mpeg");
        assert_eq!(mime_for_extension("WAV"), "audio/wav");
    }

    #[test]
    fn backoff_delays_are_monotonically_non_decreasing() {
        let policy = RetryPolicy::default();
        let mut prev = Duration::ZERO;
        for attempt in 1..=policy.max_retries {
            let delay = policy.delay_for(attempt);
            assert!(delay >= prev);
            prev = delay;
        }
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn retries_are_bounded_by_max_plus_one() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
        };
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = with_retries(&policy, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TranscriptionError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), policy.max_retries + 1);
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 1,
        };
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = with_retries(&policy, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TranscriptionError::Api {
                    status: 400,
                    message: "bad audio".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_transient_failure() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
        };
        let attempts = AtomicU32::new(0);

        let result = with_retries(&policy, |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(TranscriptionError::Network("connection reset".to_string()))
                } else {
                    Ok("text".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "text");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
