//! End-to-end pipeline tests with stubbed network collaborators.
//!
//! The pipeline is generic over its transcription and generation seams, so
//! these tests drive full runs without any HTTP and assert the outcome
//! policy: every run saves exactly one note, failures degrade content
//! instead of aborting, and the staging slot is always cleared.

use std::sync::Mutex;

use feynman_notes::capture::{AudioOrigin, CapturedAudio};
use feynman_notes::generation::{ChatMessage, GenerateNotes, GenerationError};
use feynman_notes::notes::{NoteQuality, NotesStore};
use feynman_notes::progress::NullReporter;
use feynman_notes::transcription::{Transcribe, TranscriptionError, TranscriptionResult};
use feynman_notes::{NotePipeline, StagingStore};

const SAMPLE_TRANSCRIPT: &str = "Mitochondria is the powerhouse of the cell.";

struct StubTranscriber {
    result: Result<&'static str, TranscriptionError>,
    calls: Mutex<u32>,
}

impl StubTranscriber {
    fn ok(text: &'static str) -> Self {
        Self {
            result: Ok(text),
            calls: Mutex::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            result: Err(TranscriptionError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl Transcribe for StubTranscriber {
    async fn transcribe(
        &self,
        _bytes: &[u8],
        _file_name: &str,
        _mime_type: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        *self.calls.lock().unwrap() += 1;
        match &self.result {
            Ok(text) => Ok(TranscriptionResult {
                text: text.to_string(),
                language: None,
            }),
            Err(e) => Err(e.clone()),
        }
    }
}

struct StubGenerator {
    response: Result<&'static str, ()>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn ok(response: &'static str) -> Self {
        Self {
            response: Ok(response),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            response: Err(()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl GenerateNotes for StubGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap()
            .extend(messages.iter().map(|m| m.content.clone()));
        match self.response {
            Ok(text) => Ok(text.to_string()),
            Err(()) => Err(GenerationError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            }),
        }
    }
}

fn recording() -> CapturedAudio {
    CapturedAudio {
        source_uri: "/tmp/recording.wav".to_string(),
        display_name: "recording.wav".to_string(),
        mime_type: "audio/wav".to_string(),
        duration_secs: 5.0,
        origin: AudioOrigin::Recording,
    }
}

fn upload(name: &str) -> CapturedAudio {
    CapturedAudio {
        source_uri: format!("/tmp/{}", name),
        display_name: name.to_string(),
        mime_type: "audio/mpeg".to_string(),
        duration_secs: 0.0,
        origin: AudioOrigin::Upload,
    }
}

async fn staged_store(audio: &CapturedAudio) -> StagingStore {
    let store = StagingStore::new();
    store
        .put(audio, Some(vec![1u8; 512]))
        .await
        .expect("staging should accept the payload");
    store
}

#[tokio::test]
async fn silent_recording_still_produces_a_placeholder_note() {
    let audio = recording();
    let staging = staged_store(&audio).await;
    let stt = StubTranscriber::ok("");
    let generator = StubGenerator::ok("should never be called");
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    assert_eq!(notes.len(), 1);
    assert_eq!(outcome.note.quality, NoteQuality::Degraded);
    assert!(outcome.note.title.starts_with("Voice Note -"));
    assert!(outcome.note.body.contains("KEY POINTS"));
    assert!(outcome.note.body.contains("IMPORTANT DETAILS"));
    assert!(outcome.transcript.is_empty());

    // No usable transcript means the generation endpoint is never hit.
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn successful_run_titles_note_from_main_topic() {
    let audio = upload("lecture.mp3");
    let staging = staged_store(&audio).await;
    let stt = StubTranscriber::ok(SAMPLE_TRANSCRIPT);
    let generator = StubGenerator::ok(
        "MAIN TOPIC: Cell Biology\n\nSUMMARY:\nThe cell's energy factory.\n\nKEY CONCEPTS:\n- ATP",
    );
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    assert_eq!(notes.len(), 1);
    assert_eq!(outcome.note.quality, NoteQuality::Full);
    assert_eq!(outcome.note.title, "Cell Biology");
    assert_eq!(outcome.transcript, SAMPLE_TRANSCRIPT);

    // The transcript is embedded verbatim, in quotes, in the prompt.
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&format!("\"{}\"", SAMPLE_TRANSCRIPT)));

    assert_eq!(stt.calls(), 1);
}

#[tokio::test]
async fn too_short_transcript_gets_a_placeholder_note() {
    let audio = recording();
    let staging = staged_store(&audio).await;
    // Five chars or fewer is noise, not content.
    let stt = StubTranscriber::ok("uh hm");
    let generator = StubGenerator::ok("should never be called");
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    assert_eq!(notes.len(), 1);
    assert_eq!(outcome.note.quality, NoteQuality::Degraded);
    assert!(outcome.note.body.contains("KEY POINTS"));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn transcription_failure_degrades_instead_of_aborting() {
    let audio = recording();
    let staging = staged_store(&audio).await;
    let stt = StubTranscriber::failing();
    let generator = StubGenerator::ok("should never be called");
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    // Exactly one note, degraded, no panic, no generation attempt.
    assert_eq!(notes.len(), 1);
    assert_eq!(outcome.note.quality, NoteQuality::Degraded);
    assert!(outcome.transcript.is_empty());
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_keeps_the_transcript() {
    let audio = upload("lecture.mp3");
    let staging = staged_store(&audio).await;
    let stt = StubTranscriber::ok(SAMPLE_TRANSCRIPT);
    let generator = StubGenerator::failing();
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    assert_eq!(notes.len(), 1);
    assert_eq!(outcome.note.quality, NoteQuality::Degraded);
    // The transcript the user produced is not lost.
    assert!(outcome.note.body.contains(SAMPLE_TRANSCRIPT));
    // Upload flow falls back to the file stem for the title.
    assert_eq!(outcome.note.title, "lecture");
}

#[tokio::test]
async fn missing_main_topic_falls_back_to_file_stem_for_uploads() {
    let audio = upload("photosynthesis.m4a");
    let staging = staged_store(&audio).await;
    let stt = StubTranscriber::ok(SAMPLE_TRANSCRIPT);
    let generator = StubGenerator::ok("SUMMARY:\nNotes without the topic marker.");
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    assert_eq!(outcome.note.quality, NoteQuality::Full);
    assert_eq!(outcome.note.title, "photosynthesis");
}

#[tokio::test]
async fn staging_is_cleared_on_success_and_on_failure() {
    for (stt, generator) in [
        (StubTranscriber::ok(SAMPLE_TRANSCRIPT), StubGenerator::ok("MAIN TOPIC: X")),
        (StubTranscriber::failing(), StubGenerator::failing()),
    ] {
        let audio = recording();
        let staging = staged_store(&audio).await;
        let mut notes = NotesStore::in_memory();

        let pipeline = NotePipeline {
            stt: &stt,
            generator: &generator,
            reporter: &NullReporter,
            language: "Auto detect",
        };
        pipeline.run(&audio, &staging, &mut notes).await;

        assert!(staging.get().is_none(), "staging must be cleared after a run");
        assert_eq!(notes.len(), 1);
    }
}

#[tokio::test]
async fn pipeline_stages_audio_itself_when_slot_is_empty() {
    // An upload whose URI points at a real file gets materialized at the
    // upload stage rather than failing.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lecture.mp3");
    std::fs::write(&path, vec![3u8; 400]).unwrap();

    let audio = CapturedAudio {
        source_uri: path.display().to_string(),
        display_name: "lecture.mp3".to_string(),
        mime_type: "audio/mpeg".to_string(),
        duration_secs: 0.0,
        origin: AudioOrigin::Upload,
    };
    let staging = StagingStore::new();
    let stt = StubTranscriber::ok(SAMPLE_TRANSCRIPT);
    let generator = StubGenerator::ok("MAIN TOPIC: Lectures");
    let mut notes = NotesStore::in_memory();

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &NullReporter,
        language: "Auto detect",
    };
    let outcome = pipeline.run(&audio, &staging, &mut notes).await;

    assert_eq!(stt.calls(), 1);
    assert_eq!(outcome.note.title, "Lectures");
}
