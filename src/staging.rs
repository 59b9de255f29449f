//! Single-slot handoff for captured audio
//!
//! The capture flow and the processing flow are separated by a navigation
//! boundary that may not preserve in-memory handles; the staging store
//! bridges it. `put` overwrites any previous entry (last writer wins) and
//! eagerly materializes the source into bytes so the URI going stale later
//! cannot lose the capture. `get` is idempotent and side-effect-free; only
//! `put` performs I/O. `clear` is called unconditionally once the pipeline
//! finishes, success or failure.
//!
//! At most one capture is in flight per app instance, so a plain mutex over
//! an `Option` slot is all the synchronization needed.

use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::capture::CapturedAudio;

/// Payloads smaller than this are treated as empty/corrupt captures.
const MIN_STAGED_BYTES: usize = 100;

/// Bytes staged for the transcription client.
#[derive(Debug, Clone)]
pub struct StagedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Errors raised at `put` time. `get` never fails, it returns `None`.
#[derive(Debug)]
pub enum StagingError {
    Unreadable(String),
    InvalidDataUrl(String),
    TooSmall(usize),
}

impl std::fmt::Display for StagingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StagingError::Unreadable(e) => write!(f, "Could not read audio source: {}", e),
            StagingError::InvalidDataUrl(e) => write!(f, "Invalid data URL payload: {}", e),
            StagingError::TooSmall(n) => {
                write!(f, "Audio payload is too small or empty ({} bytes)", n)
            }
        }
    }
}

impl std::error::Error for StagingError {}

/// Process-wide single-slot staging store.
#[derive(Default)]
pub struct StagingStore {
    slot: Mutex<Option<StagedAudio>>,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a capture, replacing any previous entry.
    ///
    /// When `bytes` is not supplied the source URI is read now: a `data:`
    /// URL is base64-decoded, anything else is treated as a local file path.
    pub async fn put(
        &self,
        audio: &CapturedAudio,
        bytes: Option<Vec<u8>>,
    ) -> Result<(), StagingError> {
        let (bytes, mime_type) = match bytes {
            Some(b) => (b, audio.mime_type.clone()),
            None if audio.source_uri.starts_with("data:") => {
                let (b, mime) = decode_data_url(&audio.source_uri)?;
                (b, mime.unwrap_or_else(|| audio.mime_type.clone()))
            }
            None => {
                let b = tokio::fs::read(&audio.source_uri)
                    .await
                    .map_err(|e| StagingError::Unreadable(e.to_string()))?;
                (b, audio.mime_type.clone())
            }
        };

        if bytes.len() < MIN_STAGED_BYTES {
            return Err(StagingError::TooSmall(bytes.len()));
        }

        tracing::debug!(
            bytes = bytes.len(),
            mime = %mime_type,
            "Staged audio for processing"
        );

        let mut slot = self.slot.lock().unwrap();
        *slot = Some(StagedAudio {
            bytes,
            mime_type,
            file_name: audio.display_name.clone(),
        });
        Ok(())
    }

    /// Return the staged bytes, if any. Repeated calls return the same
    /// entry; nothing is consumed.
    pub fn get(&self) -> Option<StagedAudio> {
        self.slot.lock().unwrap().clone()
    }

    /// Whether an entry is staged, without cloning its byte buffer.
    pub fn is_staged(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Drop the staged entry.
    pub fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

/// Parse a `data:<mime>[;params];base64,<payload>` URL into bytes and the
/// declared MIME type.
fn decode_data_url(url: &str) -> Result<(Vec<u8>, Option<String>), StagingError> {
    let comma = url
        .find(',')
        .ok_or_else(|| StagingError::InvalidDataUrl("missing comma separator".to_string()))?;
    let header = &url[..comma];
    let payload = &url[comma + 1..];

    let mime = header
        .strip_prefix("data:")
        .and_then(|rest| rest.split([';', ',']).next())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string());

    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| StagingError::InvalidDataUrl(e.to_string()))?;

    Ok((bytes, mime))
}
