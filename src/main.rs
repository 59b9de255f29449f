//! Command-line front end: record, upload or paste, then generate notes.

use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use feynman_notes::capture::recorder::{AudioRecorder, RecordingHandle};
use feynman_notes::capture::session::{reduce, SessionEffect, SessionEvent, SessionState};
use feynman_notes::capture::{self, CapturedAudio};
use feynman_notes::config::{load_settings, save_settings, AppSettings};
use feynman_notes::generation::{prompt, template, ChatClient, GenerateObject, NoteFraming};
use feynman_notes::notes::{NoteQuality, NotesStore, SourceMetadata};
use feynman_notes::progress::LogReporter;
use feynman_notes::transcription::client::SttClient;
use feynman_notes::{NotePipeline, StagingStore};

#[derive(Parser)]
#[command(name = "feynman", about = "Turn audio and text into study notes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone, then transcribe and generate a note.
    ///
    /// While recording: Enter stops, "p" pauses/resumes, "c" cancels.
    Record {
        /// Language hint for note generation (default from settings).
        #[arg(long)]
        language: Option<String>,
    },
    /// Transcribe an existing audio file and generate a note.
    Upload {
        /// Path to an audio file (mp3, wav, m4a, mp4, mpeg, mpga, webm, ogg, flac).
        file: PathBuf,
        #[arg(long)]
        language: Option<String>,
    },
    /// Generate a note from pasted text (no audio involved).
    Text {
        /// The text to analyze.
        input: String,
    },
    /// List saved notes.
    List,
    /// Delete a saved note by id.
    Delete {
        id: uuid::Uuid,
    },
    /// Show the effective settings and write them to the settings file.
    Config,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (for development convenience)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feynman_notes=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings().with_env_overrides();

    let exit_code = match cli.command {
        Command::Record { language } => run_record(&settings, language).await,
        Command::Upload { file, language } => run_upload(&settings, &file, language).await,
        Command::Text { input } => run_text(&settings, &input).await,
        Command::List => run_list(),
        Command::Delete { id } => run_delete(id),
        Command::Config => run_config(&settings),
    };

    std::process::exit(exit_code);
}

/// Keystroke commands read off stdin while recording.
enum Control {
    Stop,
    TogglePause,
    Cancel,
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<Control> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            if stdin.read_line(&mut line).unwrap_or(0) == 0 {
                let _ = tx.send(Control::Stop);
                return;
            }
            let control = match line.trim() {
                "" => Control::Stop,
                "p" | "P" => Control::TogglePause,
                "c" | "C" => Control::Cancel,
                other => {
                    eprintln!("Unknown command {:?} (Enter=stop, p=pause, c=cancel)", other);
                    continue;
                }
            };
            let done = matches!(control, Control::Stop | Control::Cancel);
            let _ = tx.send(control);
            if done {
                return;
            }
        }
    });
    rx
}

/// Drive the recording session state machine until it either produces a
/// capture or lands back in Idle (denied, failed or cancelled).
async fn record_interactively() -> Option<CapturedAudio> {
    let mut controls = spawn_stdin_reader();
    let mut tick = tokio::time::interval(std::time::Duration::from_millis(100));

    let mut state = SessionState::Idle;
    let mut handle: Option<RecordingHandle> = None;
    let mut captured: Option<CapturedAudio> = None;

    let mut pending = vec![SessionEvent::Begin];

    loop {
        // Drain events through the reducer, executing effects as they come.
        while let Some(event) = pending.pop() {
            let (next, effects) = reduce(&state, event);
            state = next;

            for effect in effects {
                match effect {
                    SessionEffect::StartRecorder { id } => {
                        let started = AudioRecorder::new().and_then(|r| r.start(id));
                        match started {
                            Ok((h, wav_path)) => {
                                handle = Some(h);
                                pending.push(SessionEvent::PermissionGranted { id, wav_path });
                            }
                            Err(e) => {
                                pending.push(SessionEvent::PermissionDenied {
                                    id,
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                    SessionEffect::PauseRecorder { .. } => {
                        if let Some(h) = &handle {
                            h.pause();
                        }
                    }
                    SessionEffect::ResumeRecorder { .. } => {
                        if let Some(h) = &handle {
                            h.resume();
                        }
                    }
                    SessionEffect::FinalizeRecorder { id } => {
                        if let Some(h) = handle.take() {
                            match h.stop() {
                                Ok(audio) => pending.push(SessionEvent::StopOk { id, audio }),
                                Err(e) => pending.push(SessionEvent::StopFail {
                                    id,
                                    err: e.to_string(),
                                }),
                            }
                        }
                    }
                    SessionEffect::DiscardRecorder { .. } => {
                        if let Some(h) = handle.take() {
                            h.discard();
                        }
                    }
                    SessionEffect::StageAudio { audio } => {
                        captured = Some(audio);
                    }
                    SessionEffect::SurfaceError { message } => {
                        eprintln!("\nError: {}", message);
                    }
                    SessionEffect::EmitUi => render_session(&state),
                }
            }
        }

        match &state {
            SessionState::Stopped { .. } => return captured,
            SessionState::Idle => return None,
            _ => {}
        }

        tokio::select! {
            _ = tick.tick() => {
                if let (SessionState::Recording { session_id, .. }, Some(h)) = (&state, &handle) {
                    pending.push(SessionEvent::Tick {
                        id: *session_id,
                        elapsed_secs: h.elapsed_secs(),
                        amplitude: h.amplitude(),
                    });
                }
            }
            control = controls.recv() => {
                match control {
                    Some(Control::Stop) => pending.push(SessionEvent::StopRequested),
                    Some(Control::Cancel) => pending.push(SessionEvent::Cancel),
                    Some(Control::TogglePause) => pending.push(
                        if matches!(state, SessionState::Paused { .. }) {
                            SessionEvent::Resume
                        } else {
                            SessionEvent::Pause
                        },
                    ),
                    None => pending.push(SessionEvent::Cancel),
                }
            }
        }
    }
}

fn render_session(state: &SessionState) {
    match state {
        SessionState::RequestingPermission { .. } => {
            println!("Opening microphone... (Enter=stop, p=pause, c=cancel)");
        }
        SessionState::Recording {
            elapsed_secs,
            amplitude,
            ..
        } => {
            let bar_len = (amplitude * 20.0).round() as usize;
            print!(
                "\rRecording {:>5.1}s [{:<20}]",
                elapsed_secs,
                "#".repeat(bar_len.min(20))
            );
            let _ = std::io::stdout().flush();
        }
        SessionState::Paused { elapsed_secs, .. } => {
            print!("\rPaused    {:>5.1}s [{:<20}]", elapsed_secs, "");
            let _ = std::io::stdout().flush();
        }
        SessionState::Stopping { .. } => {
            println!("\nFinalizing recording...");
        }
        SessionState::Stopped { .. } | SessionState::Idle => {}
    }
}

async fn run_record(settings: &AppSettings, language: Option<String>) -> i32 {
    let Some(audio) = record_interactively().await else {
        println!("No recording produced.");
        return 1;
    };

    if let Err(e) = capture::paths::cleanup_old_recordings() {
        tracing::debug!("Recording cleanup failed: {}", e);
    }

    process_audio(settings, &audio, language).await
}

async fn run_upload(settings: &AppSettings, file: &std::path::Path, language: Option<String>) -> i32 {
    let audio = match capture::pick_file(file) {
        Ok(audio) => audio,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    process_audio(settings, &audio, language).await
}

/// Stage the capture and run the full pipeline against the real endpoints.
async fn process_audio(
    settings: &AppSettings,
    audio: &CapturedAudio,
    language: Option<String>,
) -> i32 {
    let staging = StagingStore::new();
    if let Err(e) = staging.put(audio, None).await {
        eprintln!("Error: could not read audio: {}", e);
        return 1;
    }

    let stt = SttClient::new(&settings.stt_url, settings.retry_policy())
        .with_timeout(std::time::Duration::from_secs(settings.request_timeout_secs));
    let generator = ChatClient::new(&settings.text_url, &settings.object_url);
    let mut notes = NotesStore::open(NotesStore::default_path());

    let pipeline = NotePipeline {
        stt: &stt,
        generator: &generator,
        reporter: &LogReporter,
        language: language.as_deref().unwrap_or(&settings.language),
    };

    let outcome = pipeline.run(audio, &staging, &mut notes).await;

    println!("\nNote saved: {}", outcome.note.title);
    println!("  id:      {}", outcome.note.id);
    if outcome.note.quality == NoteQuality::Degraded {
        println!("  (saved with fallback content; edit it to fill in details)");
    }
    0
}

/// Pasted-text flow: structured-object generation, no transcription.
async fn run_text(settings: &AppSettings, input: &str) -> i32 {
    let text = input.trim();
    if text.is_empty() {
        eprintln!("Error: no text provided");
        return 1;
    }

    let generator = ChatClient::new(&settings.text_url, &settings.object_url);
    let mut notes = NotesStore::open(NotesStore::default_path());

    let messages = [prompt::text_analysis_prompt(text)];
    let result = generator
        .generate_object(&messages, prompt::text_analysis_schema())
        .await;

    let now = chrono::Local::now();
    let note = match result {
        Ok(object) => {
            let title = object["title"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| template::fallback_title(&NoteFraming::PastedText, now));
            let body = object["content"].as_str().unwrap_or_default().to_string();
            let summary = object["summary"].as_str().map(str::to_string);
            let key_points = object["keyPoints"]
                .as_array()
                .map(|points| {
                    points
                        .iter()
                        .filter_map(|p| p.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            if body.is_empty() {
                tracing::warn!("Text analysis returned no content, using fallback");
                notes.add(
                    title,
                    template::generation_failed_body(text, &NoteFraming::PastedText, now),
                    NoteQuality::Degraded,
                    Some(SourceMetadata {
                        origin: "text".to_string(),
                        ..Default::default()
                    }),
                )
            } else {
                notes.add(
                    title,
                    body,
                    NoteQuality::Full,
                    Some(SourceMetadata {
                        origin: "text".to_string(),
                        summary,
                        key_points,
                        image_uri: None,
                    }),
                )
            }
        }
        Err(e) => {
            tracing::warn!("Text analysis failed, using fallback: {}", e);
            notes.add(
                template::fallback_title(&NoteFraming::PastedText, now),
                template::generation_failed_body(text, &NoteFraming::PastedText, now),
                NoteQuality::Degraded,
                Some(SourceMetadata {
                    origin: "text".to_string(),
                    ..Default::default()
                }),
            )
        }
    };

    println!("Note saved: {}", note.title);
    println!("  id:      {}", note.id);
    0
}

/// Print the effective settings and persist them, so users get a file to
/// edit even before any customization.
fn run_config(settings: &AppSettings) -> i32 {
    match serde_json::to_string_pretty(settings) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: could not render settings: {}", e);
            return 1;
        }
    }

    match save_settings(settings) {
        Ok(path) => {
            println!("\nSaved to {}", path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: could not save settings: {}", e);
            1
        }
    }
}

fn run_delete(id: uuid::Uuid) -> i32 {
    let mut notes = NotesStore::open(NotesStore::default_path());
    if notes.remove(id) {
        println!("Deleted {}", id);
        0
    } else {
        eprintln!("No note with id {}", id);
        1
    }
}

fn run_list() -> i32 {
    let notes = NotesStore::open(NotesStore::default_path());
    if notes.is_empty() {
        println!("No notes yet.");
        return 0;
    }

    for note in notes.list() {
        let marker = match note.quality {
            NoteQuality::Full => " ",
            NoteQuality::Degraded => "!",
        };
        println!(
            "{} {} {} {}",
            note.created_at.format("%Y-%m-%d %H:%M"),
            marker,
            note.id,
            note.title
        );
    }
    0
}
