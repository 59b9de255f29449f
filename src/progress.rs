//! Three-stage progress presentation
//!
//! Purely cosmetic: percentages are a projection of elapsed time, capped
//! below 100 until the real call resolves. No recovery logic lives here;
//! the presenter only reflects transitions driven by the pipeline.

use std::time::Duration;

/// Pipeline stages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Transcribe,
    Generate,
}

impl Stage {
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Upload => "Audio is uploading",
            Stage::Transcribe => "Audio is transcribing",
            Stage::Generate => "Note is generating",
        }
    }
}

/// Per-stage status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

/// Simulated percentage for a stage after `elapsed` time.
///
/// The upload stage is pure animation and reaches 100 on its own; the
/// transcribe and generate stages ramp toward a cap and sit there until the
/// real network call completes.
pub fn simulated_percent(stage: Stage, elapsed: Duration, complete: bool) -> u8 {
    if complete {
        return 100;
    }

    let elapsed_ms = elapsed.as_millis() as u64;
    let percent = match stage {
        // 0..=100 over one second
        Stage::Upload => elapsed_ms / 10,
        // +10 every 200ms, capped at 80
        Stage::Transcribe => ((elapsed_ms / 200) * 10).min(80),
        // +5 every 300ms, capped at 90
        Stage::Generate => ((elapsed_ms / 300) * 5).min(90),
    };

    percent.min(100) as u8
}

/// Observer for stage transitions. The library ships a no-op implementation;
/// front ends provide their own.
pub trait ProgressReporter: Send + Sync {
    fn step(&self, stage: Stage, status: StepStatus, percent: u8);
}

/// Reporter that ignores everything.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn step(&self, _stage: Stage, _status: StepStatus, _percent: u8) {}
}

/// Reporter that logs transitions (used by the CLI).
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn step(&self, stage: Stage, status: StepStatus, percent: u8) {
        match status {
            StepStatus::InProgress => {
                tracing::debug!("{}: {}%", stage.title(), percent);
            }
            StepStatus::Completed => {
                tracing::info!("{}: done", stage.title());
            }
            StepStatus::Pending => {}
            StepStatus::Error => {
                tracing::warn!("{}: error", stage.title());
            }
        }
    }
}
