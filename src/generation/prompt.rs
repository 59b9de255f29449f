//! Prompt construction and response parsing for study notes

use super::{ChatMessage, NoteFraming};

/// Section skeleton the generation endpoint is asked to follow. The
/// `MAIN TOPIC:` line doubles as the note title.
const OUTPUT_FORMAT: &str = "Format your response as follows:
MAIN TOPIC:
[Identified main topic]

SUMMARY:
[Your 2-3 sentence summary]

KEY CONCEPTS:
- [Concept 1]
- [Concept 2]
- [Concept 3]
- [Concept 4]

DETAILED EXPLANATION:
[Your organized explanation with proper structure]

REVIEW QUESTIONS:
1. [Question 1]
2. [Question 2]
3. [Question 3]";

/// Build the study-notes prompt, embedding the transcript verbatim.
pub fn study_notes_prompt(transcript: &str, framing: &NoteFraming, language: &str) -> ChatMessage {
    let source_line = match framing {
        NoteFraming::VoiceRecording { .. } => {
            "A user has just recorded an audio note and here is the transcription:"
        }
        NoteFraming::UploadedAudio { .. } => {
            "A user has uploaded an audio file and here is the transcription:"
        }
        NoteFraming::PastedText => "A user has provided the following text:",
    };

    let language = if language == "Auto detect" {
        "English"
    } else {
        language
    };

    ChatMessage::user(format!(
        r#"You are an AI learning assistant. {source_line}

"{transcript}"

Based on this transcribed content, create comprehensive study notes.

Please provide:
1. Main Topic: Identify the main topic discussed (this will be the title)
2. Summary: Write a 2-3 sentence summary of what was discussed
3. Key Concepts: Extract 4-6 key concepts or main points mentioned
4. Detailed Explanation: Provide a clear, organized explanation of the content
5. Review Questions: Create 2-3 review questions to test understanding

{OUTPUT_FORMAT}

Language: {language}"#
    ))
}

/// Analysis prompt for the pasted-text flow (structured-object endpoint).
pub fn text_analysis_prompt(text: &str) -> ChatMessage {
    ChatMessage::user(format!(
        r#"Analyze the following text and create comprehensive educational notes using the Feynman Technique.

TEXT TO ANALYZE:
"{text}"

Provide:
1. A concise title for the notes
2. A brief summary (2-3 sentences)
3. Detailed educational content with sections: The Big Picture, Breaking It Down Simply, Key Concepts, Why This Matters, and a Study Tip
4. 5 key learning points

Make the content engaging, educational, and easy to understand."#
    ))
}

/// JSON schema for the pasted-text analysis object.
pub fn text_analysis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "A concise, descriptive title for the learning notes (max 50 chars)"
            },
            "summary": {
                "type": "string",
                "description": "A 2-3 sentence summary explaining the main topic"
            },
            "content": {
                "type": "string",
                "description": "Detailed educational content explaining the topic using the Feynman Technique"
            },
            "keyPoints": {
                "type": "array",
                "items": { "type": "string" },
                "description": "5 key learning points, each as a complete sentence"
            }
        },
        "required": ["title", "summary", "content", "keyPoints"]
    })
}

/// Parse the topic name out of a generated response.
///
/// Accepts the topic on the `MAIN TOPIC:` line itself or on the next
/// non-empty line (models emit both). Returns `None` when the marker is
/// missing, in which case the caller falls back to a timestamped title.
pub fn extract_main_topic(response: &str) -> Option<String> {
    let mut lines = response.lines();

    while let Some(line) = lines.next() {
        let Some(rest) = line.trim_start().strip_prefix("MAIN TOPIC:") else {
            continue;
        };

        let same_line = rest.trim();
        if !same_line.is_empty() {
            return Some(same_line.to_string());
        }

        // Topic is on the following line per the requested format
        for next in lines.by_ref() {
            let next = next.trim();
            if !next.is_empty() {
                // Stop if we ran into the next section header instead
                if is_section_header(next) {
                    return None;
                }
                return Some(next.to_string());
            }
        }
        return None;
    }

    None
}

/// Section headers from the requested output format. Matching against the
/// known names keeps all-caps topics (e.g. "DNA") from being mistaken for
/// a header.
fn is_section_header(line: &str) -> bool {
    const SECTION_HEADERS: [&str; 4] = [
        "SUMMARY:",
        "KEY CONCEPTS:",
        "DETAILED EXPLANATION:",
        "REVIEW QUESTIONS:",
    ];
    SECTION_HEADERS.contains(&line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_transcript_in_quotes() {
        let transcript = "Mitochondria is the powerhouse of the cell.";
        let framing = NoteFraming::UploadedAudio {
            file_name: "lecture.mp3".to_string(),
        };
        let msg = study_notes_prompt(transcript, &framing, "Auto detect");

        assert_eq!(msg.role, "user");
        assert!(msg.content.contains(&format!("\"{}\"", transcript)));
        assert!(msg.content.contains("MAIN TOPIC:"));
        assert!(msg.content.contains("REVIEW QUESTIONS:"));
        assert!(msg.content.contains("Language: English"));
    }

    #[test]
    fn explicit_language_is_passed_through() {
        let msg = study_notes_prompt(
            "hola",
            &NoteFraming::VoiceRecording {
                duration_label: "0:05".to_string(),
            },
            "Spanish",
        );
        assert!(msg.content.contains("Language: Spanish"));
        assert!(msg.content.contains("recorded an audio note"));
    }

    #[test]
    fn main_topic_on_same_line() {
        let response = "MAIN TOPIC: Cellular Respiration\n\nSUMMARY:\nStuff.";
        assert_eq!(
            extract_main_topic(response).as_deref(),
            Some("Cellular Respiration")
        );
    }

    #[test]
    fn main_topic_on_next_line() {
        let response = "MAIN TOPIC:\nCellular Respiration\n\nSUMMARY:\nStuff.";
        assert_eq!(
            extract_main_topic(response).as_deref(),
            Some("Cellular Respiration")
        );
    }

    #[test]
    fn missing_topic_returns_none() {
        assert_eq!(extract_main_topic("SUMMARY:\nNo topic here."), None);
        assert_eq!(extract_main_topic("MAIN TOPIC:\n\nSUMMARY:\nEmpty."), None);
    }

    #[test]
    fn all_caps_topic_is_not_mistaken_for_a_header() {
        let response = "MAIN TOPIC:\nDNA\n\nSUMMARY:\nStuff.";
        assert_eq!(extract_main_topic(response).as_deref(), Some("DNA"));
    }

    #[test]
    fn analysis_schema_declares_required_fields() {
        let schema = text_analysis_schema();
        let required = schema["required"].as_array().unwrap();
        for field in ["title", "summary", "content", "keyPoints"] {
            assert!(required.iter().any(|v| v == field));
        }
    }
}
