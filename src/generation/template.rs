//! Deterministic fallback content
//!
//! Two degraded paths exist: no usable transcript (placeholder note the user
//! fills in by hand) and a failed generation call (raw transcript embedded
//! in a minimal wrapper). Both still produce a saved note; the pipeline
//! marks them as degraded.

use chrono::{DateTime, Local};

use super::NoteFraming;

/// Timestamped fallback title used when no topic could be extracted or no
/// transcript was available.
pub fn fallback_title(framing: &NoteFraming, now: DateTime<Local>) -> String {
    let date = now.format("%Y-%m-%d");
    match framing {
        NoteFraming::VoiceRecording { .. } => format!("Voice Note - {}", date),
        NoteFraming::UploadedAudio { .. } => format!("Audio Note - {}", date),
        NoteFraming::PastedText => format!("Text Note - {}", date),
    }
}

/// Placeholder note body for captures with no usable transcript.
pub fn placeholder_body(framing: &NoteFraming, now: DateTime<Local>) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M");
    match framing {
        NoteFraming::VoiceRecording { duration_label } => format!(
            "📝 Voice Recording Notes

Recording Duration: {duration_label}
Recorded on: {stamp}

---

⚠️ Unable to transcribe audio content. This could be due to:
• Audio quality or format issues
• No speech detected in the audio
• Background noise interference

✏️ WHAT I DISCUSSED:
Add your notes about what you talked about in this recording.

📌 KEY POINTS:
• Point 1
• Point 2
• Point 3

💡 IMPORTANT DETAILS:
Add any important details, examples, or definitions mentioned.

---

Tip: You can edit this note anytime to add more details from your recording."
        ),
        NoteFraming::UploadedAudio { file_name } => format!(
            "📝 Audio File Notes

File Name: {file_name}
Processed on: {stamp}

---

⚠️ Unable to transcribe audio content. This could be due to:
• Audio quality or format issues
• No speech detected in the audio
• Background noise interference

✏️ WHAT I LEARNED:
Add your notes about what was covered in this audio.

📌 KEY POINTS:
• Point 1
• Point 2
• Point 3

💡 IMPORTANT DETAILS:
Add any important details, examples, or definitions mentioned.

---

Tip: You can edit this note anytime to add more details from the audio."
        ),
        NoteFraming::PastedText => format!(
            "📝 Text Notes

Processed on: {stamp}

---

✏️ WHAT I LEARNED:
Add your notes here.

📌 KEY POINTS:
• Point 1
• Point 2
• Point 3

💡 IMPORTANT DETAILS:
Add any important details, examples, or definitions mentioned."
        ),
    }
}

/// Fallback body when the generation call itself failed but a transcript
/// exists: keep the user's content, note that generation failed.
pub fn generation_failed_body(
    transcript: &str,
    framing: &NoteFraming,
    now: DateTime<Local>,
) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M");
    let source = match framing {
        NoteFraming::VoiceRecording { duration_label } => {
            format!("Recording Duration: {duration_label}")
        }
        NoteFraming::UploadedAudio { file_name } => format!("File: {file_name}"),
        NoteFraming::PastedText => "Source: pasted text".to_string(),
    };

    format!(
        "📝 Audio Notes

Transcription:
{transcript}

---

{source}
Processed on: {stamp}

Note generation failed; your transcription has been saved."
    )
}
