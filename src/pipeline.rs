//! Capture → transcription → note-generation pipeline
//!
//! Strictly sequential: the upload stage settles before transcription
//! starts, transcription settles (or exhausts its retries) before
//! generation starts. The simulated progress animation and the real
//! transcription call run together and are joined before the stage
//! advances; that is the only intentional concurrency.
//!
//! Error policy ("always land softly"): transcription failure degrades to
//! an empty transcript, generation failure degrades to a templated note,
//! and exactly one note is appended to the store on every path. The staging
//! store is cleared unconditionally before returning.

use std::time::{Duration, Instant};

use chrono::Local;

use crate::capture::{AudioOrigin, CapturedAudio};
use crate::generation::{
    prompt, template, GenerateNotes, GenerationError, NoteFraming,
};
use crate::notes::{GeneratedNote, NoteQuality, NotesStore, SourceMetadata};
use crate::progress::{simulated_percent, ProgressReporter, Stage, StepStatus};
use crate::staging::StagingStore;
use crate::transcription::Transcribe;

/// Transcripts shorter than this are treated as "nothing usable" and get a
/// placeholder note instead of a generation call.
const MIN_TRANSCRIPT_CHARS: usize = 6;

const ANIMATION_TICK: Duration = Duration::from_millis(50);

/// What the pipeline produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub note: GeneratedNote,
    pub transcript: String,
}

/// One capture flow's worth of collaborators.
pub struct NotePipeline<'a, T, G> {
    pub stt: &'a T,
    pub generator: &'a G,
    pub reporter: &'a dyn ProgressReporter,
    pub language: &'a str,
}

impl<'a, T, G> NotePipeline<'a, T, G>
where
    T: Transcribe,
    G: GenerateNotes,
{
    /// Run the full pipeline for a capture. Never fails: a note is always
    /// appended, degraded if necessary.
    pub async fn run(
        &self,
        audio: &CapturedAudio,
        staging: &StagingStore,
        notes: &mut NotesStore,
    ) -> PipelineOutcome {
        let framing = framing_for(audio);

        // ---- Upload stage ------------------------------------------------
        self.reporter.step(Stage::Upload, StepStatus::InProgress, 0);

        if !staging.is_staged() {
            if let Err(e) = staging.put(audio, None).await {
                tracing::warn!("Staging failed, proceeding without audio bytes: {}", e);
            }
        }
        let staged = staging.get();

        self.animate_to(Stage::Upload, 100).await;
        self.reporter.step(Stage::Upload, StepStatus::Completed, 100);

        // ---- Transcribe stage --------------------------------------------
        self.reporter
            .step(Stage::Transcribe, StepStatus::InProgress, 0);

        let transcript = match &staged {
            Some(staged) => {
                // Joined with the cosmetic ramp: both settle before advancing.
                let (result, _) = tokio::join!(
                    self.stt
                        .transcribe(&staged.bytes, &staged.file_name, &staged.mime_type),
                    self.animate_to(Stage::Transcribe, 80),
                );
                match result {
                    Ok(r) => r.text,
                    Err(e) => {
                        // Retries are exhausted inside the client; degrade.
                        tracing::warn!("Transcription failed after retries: {}", e);
                        String::new()
                    }
                }
            }
            None => String::new(),
        };

        self.reporter
            .step(Stage::Transcribe, StepStatus::Completed, 100);

        // ---- Generate stage ----------------------------------------------
        self.reporter
            .step(Stage::Generate, StepStatus::InProgress, 0);

        let now = Local::now();
        let (title, body, quality) = if transcript.len() >= MIN_TRANSCRIPT_CHARS {
            let message = prompt::study_notes_prompt(&transcript, &framing, self.language);
            match self.generate_animated(&[message]).await {
                Ok(response) => {
                    let title = prompt::extract_main_topic(&response)
                        .unwrap_or_else(|| default_title(audio, &framing));
                    (title, response, NoteQuality::Full)
                }
                Err(e) => {
                    tracing::warn!("Note generation failed, using fallback template: {}", e);
                    (
                        default_title(audio, &framing),
                        template::generation_failed_body(&transcript, &framing, now),
                        NoteQuality::Degraded,
                    )
                }
            }
        } else {
            // No usable transcript: placeholder note the user fills in.
            (
                template::fallback_title(&framing, now),
                template::placeholder_body(&framing, now),
                NoteQuality::Degraded,
            )
        };

        self.reporter
            .step(Stage::Generate, StepStatus::Completed, 100);

        let note = notes.add(
            title,
            body,
            quality,
            Some(SourceMetadata {
                origin: audio.origin.as_str().to_string(),
                ..Default::default()
            }),
        );

        // Unconditional: stale bytes must never leak into the next capture.
        staging.clear();

        tracing::info!(
            note_id = %note.id,
            quality = ?note.quality,
            "Pipeline finished, note saved"
        );

        PipelineOutcome { note, transcript }
    }

    /// Drive the simulated percentage for `stage` until it reaches `cap`.
    async fn animate_to(&self, stage: Stage, cap: u8) {
        let start = Instant::now();
        loop {
            let percent = simulated_percent(stage, start.elapsed(), false);
            self.reporter.step(stage, StepStatus::InProgress, percent);
            if percent >= cap {
                return;
            }
            tokio::time::sleep(ANIMATION_TICK).await;
        }
    }

    /// Run the generation call with a timer-driven percentage alongside it.
    /// Unlike transcription there is no join: the ramp stops as soon as the
    /// call resolves.
    async fn generate_animated(
        &self,
        messages: &[crate::generation::ChatMessage],
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let fut = self.generator.generate(messages);
        tokio::pin!(fut);

        loop {
            tokio::select! {
                result = &mut fut => return result,
                _ = tokio::time::sleep(ANIMATION_TICK) => {
                    let percent = simulated_percent(Stage::Generate, start.elapsed(), false);
                    self.reporter.step(Stage::Generate, StepStatus::InProgress, percent);
                }
            }
        }
    }
}

fn framing_for(audio: &CapturedAudio) -> NoteFraming {
    match audio.origin {
        AudioOrigin::Recording => NoteFraming::VoiceRecording {
            duration_label: format_duration(audio.duration_secs),
        },
        AudioOrigin::Upload => NoteFraming::UploadedAudio {
            file_name: audio.display_name.clone(),
        },
    }
}

/// Title used when the response carries no `MAIN TOPIC:` line.
fn default_title(audio: &CapturedAudio, framing: &NoteFraming) -> String {
    match audio.origin {
        AudioOrigin::Upload => audio.title_stem().to_string(),
        AudioOrigin::Recording => template::fallback_title(framing, Local::now()),
    }
}

/// m:ss label for the recording duration.
fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_label_formats_minutes_and_seconds() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(5.4), "0:05");
        assert_eq!(format_duration(65.0), "1:05");
        assert_eq!(format_duration(-1.0), "0:00");
    }

    #[test]
    fn upload_framing_carries_file_name() {
        let audio = CapturedAudio {
            source_uri: "/tmp/lecture.mp3".to_string(),
            display_name: "lecture.mp3".to_string(),
            mime_type: "audio/mpeg".to_string(),
            duration_secs: 0.0,
            origin: AudioOrigin::Upload,
        };
        let NoteFraming::UploadedAudio { file_name } = framing_for(&audio) else {
            panic!("expected upload framing");
        };
        assert_eq!(file_name, "lecture.mp3");
    }
}
