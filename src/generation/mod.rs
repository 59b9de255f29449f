//! Note generation via the text/object generation endpoints
//!
//! Free-form study notes come from the text endpoint (a role/content chat
//! request, full response, no streaming). The pasted-text flow uses the
//! structured-object endpoint, which additionally takes a declared JSON
//! schema and returns a conformant object.

pub mod client;
pub mod prompt;
pub mod template;

pub use client::ChatClient;

use std::future::Future;

use serde::Serialize;

/// Chat message sent to the generation endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Flow-specific framing for the prompt and the fallback templates.
#[derive(Debug, Clone)]
pub enum NoteFraming {
    /// Live microphone recording; the label is a human-readable duration.
    VoiceRecording { duration_label: String },
    /// User-picked audio file.
    UploadedAudio { file_name: String },
    /// Pasted text, no audio involved.
    PastedText,
}

/// Errors from the generation endpoints.
#[derive(Debug, Clone)]
pub enum GenerationError {
    Network(String),
    Api { status: u16, message: String },
    Parse(String),
    /// 2xx response with no usable content.
    Empty,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Network(e) => write!(f, "Network error: {}", e),
            GenerationError::Api { status, message } => {
                write!(f, "Generation service error ({}): {}", status, message)
            }
            GenerationError::Parse(e) => write!(f, "Failed to parse generation response: {}", e),
            GenerationError::Empty => write!(f, "Empty response from generation service"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Seam between the pipeline and the text-generation collaborator.
pub trait GenerateNotes {
    fn generate(
        &self,
        messages: &[ChatMessage],
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Seam for the structured-object collaborator (pasted-text flow).
pub trait GenerateObject {
    fn generate_object(
        &self,
        messages: &[ChatMessage],
        schema: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, GenerationError>> + Send;
}
