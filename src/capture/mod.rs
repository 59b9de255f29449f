//! Audio capture: microphone recording and file pick.
//!
//! A capture yields a [`CapturedAudio`] describing the raw asset. Live
//! recording goes through the session state machine in [`session`]; picked
//! files are validated against the supported extension allow-list here.

pub mod paths;
pub mod recorder;
pub mod session;

use std::path::Path;

use crate::transcription::mime_for_extension;

/// Audio formats accepted by the transcription endpoint.
pub const SUPPORTED_EXTENSIONS: [&str; 9] = [
    "mp3", "wav", "m4a", "mp4", "mpeg", "mpga", "webm", "ogg", "flac",
];

/// How a capture was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOrigin {
    Recording,
    Upload,
}

impl AudioOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioOrigin::Recording => "recording",
            AudioOrigin::Upload => "upload",
        }
    }
}

/// The result of a completed recording or file-pick action.
/// Immutable once produced; discarded when the pipeline finishes.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    /// Platform-local file reference (or a `data:` URL handed over from
    /// another capture surface).
    pub source_uri: String,
    pub display_name: String,
    pub mime_type: String,
    pub duration_secs: f64,
    pub origin: AudioOrigin,
}

impl CapturedAudio {
    /// Display name without its extension, used as the default note title.
    pub fn title_stem(&self) -> &str {
        match self.display_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.display_name,
        }
    }
}

/// Errors that can occur while obtaining audio.
#[derive(Debug, Clone)]
pub enum CaptureError {
    NoInputDevice,
    NoSupportedConfig,
    StreamCreationFailed(String),
    FileCreationFailed(String),
    WriteFailed(String),
    FileNotFound(String),
    UnsupportedFormat { extension: String },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoInputDevice => write!(f, "No audio input device found"),
            CaptureError::NoSupportedConfig => write!(f, "No supported audio configuration"),
            CaptureError::StreamCreationFailed(e) => {
                write!(f, "Failed to create audio stream: {}", e)
            }
            CaptureError::FileCreationFailed(e) => write!(f, "Failed to create WAV file: {}", e),
            CaptureError::WriteFailed(e) => write!(f, "Failed to write audio data: {}", e),
            CaptureError::FileNotFound(p) => write!(f, "Audio file not found: {}", p),
            CaptureError::UnsupportedFormat { extension } => write!(
                f,
                "Unsupported format \"{}\". Please use: {}",
                extension,
                SUPPORTED_EXTENSIONS.join(", ")
            ),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Extract a lowercase file extension, preferring the display name over the
/// URI. Query strings on the URI are stripped. Falls back to `m4a`, the
/// native recorder's container.
pub fn file_extension(name: &str, uri: &str) -> String {
    if let Some((_, ext)) = name.rsplit_once('.') {
        if !ext.is_empty() {
            return ext.to_ascii_lowercase();
        }
    }
    if let Some((_, ext)) = uri.rsplit_once('.') {
        let ext = ext.split('?').next().unwrap_or(ext);
        if !ext.is_empty() {
            return ext.to_ascii_lowercase();
        }
    }
    "m4a".to_string()
}

/// Validate a user-picked audio file and describe it as a [`CapturedAudio`].
///
/// Files outside the extension allow-list are rejected; the user has to
/// re-pick. No bytes are read here, staging does that.
pub fn pick_file(path: &Path) -> Result<CapturedAudio, CaptureError> {
    if !path.is_file() {
        return Err(CaptureError::FileNotFound(path.display().to_string()));
    }

    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Audio File".to_string());

    let extension = file_extension(&display_name, "");
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(CaptureError::UnsupportedFormat { extension });
    }

    Ok(CapturedAudio {
        source_uri: path.display().to_string(),
        display_name,
        mime_type: mime_for_extension(&extension).to_string(),
        duration_secs: 0.0,
        origin: AudioOrigin::Upload,
    })
}
