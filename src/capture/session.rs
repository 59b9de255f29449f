//! Recording session state machine
//!
//! Single-writer reducer for the live-capture sub-protocol:
//! `Idle → RequestingPermission → Recording ⇄ Paused → Stopping → Stopped`.
//! All transitions go through [`reduce`], which returns the next state and a
//! list of effects for the caller to execute. Events carry the session id so
//! late completions from an abandoned session are dropped.

use std::path::PathBuf;
use uuid::Uuid;

use super::CapturedAudio;

/// Internal state of the capture workflow.
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    RequestingPermission {
        session_id: Uuid,
    },
    Recording {
        session_id: Uuid,
        wav_path: PathBuf,
        elapsed_secs: f64,
        amplitude: f32,
    },
    Paused {
        session_id: Uuid,
        wav_path: PathBuf,
        elapsed_secs: f64,
    },
    Stopping {
        session_id: Uuid,
    },
    Stopped {
        session_id: Uuid,
        audio: CapturedAudio,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

/// Events that drive the capture workflow.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// User asked to start recording.
    Begin,
    /// Recorder acquired the input device and opened the WAV file.
    PermissionGranted { id: Uuid, wav_path: PathBuf },
    /// Device/permission acquisition failed. Terminal, no retry.
    PermissionDenied { id: Uuid, reason: String },
    /// Periodic tick (every 100ms) with elapsed time and a waveform sample.
    Tick {
        id: Uuid,
        elapsed_secs: f64,
        amplitude: f32,
    },
    Pause,
    Resume,
    /// User asked to stop and hand the capture to the pipeline.
    StopRequested,
    StopOk { id: Uuid, audio: CapturedAudio },
    StopFail { id: Uuid, err: String },
    /// User abandoned the capture; nothing is produced.
    Cancel,
}

/// Effects to be executed after a transition.
#[derive(Debug, Clone)]
pub enum SessionEffect {
    StartRecorder { id: Uuid },
    PauseRecorder { id: Uuid },
    ResumeRecorder { id: Uuid },
    FinalizeRecorder { id: Uuid },
    DiscardRecorder { id: Uuid },
    /// Hand the finished capture to the staging store.
    StageAudio { audio: CapturedAudio },
    /// Show a user-facing error; the flow has already returned to Idle.
    SurfaceError { message: String },
    EmitUi,
}

/// Reducer function: (state, event) -> (next_state, effects)
///
/// Key rules:
/// - Never mutate state directly
/// - Ignore events with stale session ids
/// - Emit EmitUi after observable state changes
pub fn reduce(state: &SessionState, event: SessionEvent) -> (SessionState, Vec<SessionEffect>) {
    use SessionEffect::*;
    use SessionEvent::*;
    use SessionState::*;

    let current_id: Option<Uuid> = match state {
        Idle => None,
        RequestingPermission { session_id } => Some(*session_id),
        Recording { session_id, .. } => Some(*session_id),
        Paused { session_id, .. } => Some(*session_id),
        Stopping { session_id } => Some(*session_id),
        Stopped { session_id, .. } => Some(*session_id),
    };

    let is_stale = |eid: Uuid| Some(eid) != current_id;

    match (state, event) {
        // -----------------
        // Idle
        // -----------------
        (Idle, Begin) => {
            let id = Uuid::new_v4();
            (
                RequestingPermission { session_id: id },
                vec![StartRecorder { id }, EmitUi],
            )
        }
        (Idle, Cancel) => (Idle, vec![]),

        // -----------------
        // RequestingPermission
        // -----------------
        (RequestingPermission { session_id }, PermissionGranted { id, wav_path })
            if *session_id == id =>
        {
            (
                Recording {
                    session_id: id,
                    wav_path,
                    elapsed_secs: 0.0,
                    amplitude: 0.0,
                },
                vec![EmitUi],
            )
        }
        (RequestingPermission { session_id }, PermissionDenied { id, reason })
            if *session_id == id =>
        {
            // Terminal for this flow: back to Idle with a surfaced error.
            (Idle, vec![SurfaceError { message: reason }, EmitUi])
        }
        (RequestingPermission { session_id }, Cancel) => (
            Idle,
            vec![
                DiscardRecorder { id: *session_id },
                EmitUi,
            ],
        ),

        // -----------------
        // Recording
        // -----------------
        (
            Recording {
                session_id,
                wav_path,
                ..
            },
            Tick {
                id,
                elapsed_secs,
                amplitude,
            },
        ) if *session_id == id => (
            Recording {
                session_id: id,
                wav_path: wav_path.clone(),
                elapsed_secs,
                amplitude,
            },
            vec![EmitUi],
        ),
        (
            Recording {
                session_id,
                wav_path,
                elapsed_secs,
                ..
            },
            Pause,
        ) => (
            Paused {
                session_id: *session_id,
                wav_path: wav_path.clone(),
                elapsed_secs: *elapsed_secs,
            },
            vec![PauseRecorder { id: *session_id }, EmitUi],
        ),
        (Recording { session_id, .. }, StopRequested) => (
            Stopping {
                session_id: *session_id,
            },
            vec![FinalizeRecorder { id: *session_id }, EmitUi],
        ),
        (Recording { session_id, .. }, Cancel) => (
            Idle,
            vec![DiscardRecorder { id: *session_id }, EmitUi],
        ),

        // -----------------
        // Paused
        // -----------------
        (
            Paused {
                session_id,
                wav_path,
                elapsed_secs,
            },
            Resume,
        ) => (
            Recording {
                session_id: *session_id,
                wav_path: wav_path.clone(),
                elapsed_secs: *elapsed_secs,
                amplitude: 0.0,
            },
            vec![ResumeRecorder { id: *session_id }, EmitUi],
        ),
        (Paused { session_id, .. }, StopRequested) => (
            Stopping {
                session_id: *session_id,
            },
            vec![FinalizeRecorder { id: *session_id }, EmitUi],
        ),
        (Paused { session_id, .. }, Cancel) => (
            Idle,
            vec![DiscardRecorder { id: *session_id }, EmitUi],
        ),

        // -----------------
        // Stopping
        // -----------------
        (Stopping { session_id }, StopOk { id, audio }) if *session_id == id => (
            Stopped {
                session_id: id,
                audio: audio.clone(),
            },
            vec![StageAudio { audio }, EmitUi],
        ),
        (Stopping { session_id }, StopFail { id, err }) if *session_id == id => (
            Idle,
            vec![SurfaceError { message: err }, EmitUi],
        ),

        // -----------------
        // Stale events (drop silently)
        // -----------------
        (_, PermissionGranted { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, PermissionDenied { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, Tick { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, StopOk { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, StopFail { id, .. }) if is_stale(id) => (state.clone(), vec![]),

        // -----------------
        // Unhandled: no transition
        // -----------------
        _ => (state.clone(), vec![]),
    }
}
