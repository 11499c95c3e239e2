use std::path::PathBuf;

use thiserror::Error;

/// Central error type for the audio-restore-core crate.
#[derive(Debug, Error)]
pub enum RestoreError {
    // Generic fallback (wraps anyhow)
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),

    // Domain-specific variants
    #[error("Failed to load audio from {path}: {reason}")]
    AudioLoad { path: PathBuf, reason: String },

    #[error("Unsupported channel layout: {channels} channel(s), expected mono or stereo")]
    UnsupportedChannelLayout { channels: usize },

    #[error("Restoration failed ({}): {diagnostic}", exit_label(*status))]
    RestorationFailed {
        status: Option<i32>,
        diagnostic: String,
    },

    #[error("Restorer exited successfully but wrote no output to {path}")]
    MissingOutputArtifact { path: PathBuf },

    /// Only the restorer process itself is killed. Children it spawned are
    /// not tracked and may outlive the run.
    #[error("Restorer did not finish within {secs}s and was killed")]
    RestorationTimedOut { secs: u64 },

    #[error(
        "Restored channels disagree: left {left_rate} Hz / {left_frames} frames, \
         right {right_rate} Hz / {right_frames} frames"
    )]
    ChannelMismatch {
        left_rate: u32,
        left_frames: usize,
        right_rate: u32,
        right_frames: usize,
    },

    #[error("Comparison analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Config error: {0}")]
    Config(String),
}

fn exit_label(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

impl RestoreError {
    /// Stable identifier for the failure, used by the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            RestoreError::Anyhow(_) => "INTERNAL",
            RestoreError::AudioLoad { .. } => "AUDIO_LOAD",
            RestoreError::UnsupportedChannelLayout { .. } => "UNSUPPORTED_CHANNEL_LAYOUT",
            RestoreError::RestorationFailed { .. } => "RESTORATION_FAILED",
            RestoreError::MissingOutputArtifact { .. } => "MISSING_OUTPUT_ARTIFACT",
            RestoreError::RestorationTimedOut { .. } => "RESTORATION_TIMED_OUT",
            RestoreError::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            RestoreError::AnalysisFailed(_) => "ANALYSIS_FAILED",
            RestoreError::InvalidParameter(_) => "INVALID_PARAMETER",
            RestoreError::Config(_) => "CONFIG",
        }
    }

    /// Whether the run that raised this error still produced restored audio.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RestoreError::AnalysisFailed(_))
    }
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for RestoreError {
    fn from(e: std::io::Error) -> Self {
        RestoreError::Anyhow(e.into())
    }
}

impl From<serde_json::Error> for RestoreError {
    fn from(e: serde_json::Error) -> Self {
        RestoreError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RestoreError>;
