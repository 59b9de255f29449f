//! Feynman Notes: turn voice recordings, audio files and pasted text into
//! structured study notes.
//!
//! The library is organized around one pipeline: capture audio (microphone
//! or file), stage the raw bytes, transcribe them over HTTP, then generate
//! a study note from the transcript. Every capture that reaches the
//! pipeline ends with a saved note; failures downgrade the note's content
//! instead of aborting.

pub mod capture;
pub mod config;
pub mod generation;
pub mod notes;
pub mod pipeline;
pub mod progress;
pub mod staging;
pub mod transcription;

pub use notes::{GeneratedNote, NoteQuality, NotesStore};
pub use pipeline::{NotePipeline, PipelineOutcome};
pub use staging::StagingStore;
