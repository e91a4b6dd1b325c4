use std::path::PathBuf;
use std::process::ExitStatus;

use ffmpeg_next as ffmpeg;

#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    /// The decoder ran out of frames before the requested index.
    #[error("end of video or invalid frame")]
    EndOfStream,

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("{program} exited with {status}: {stderr}")]
    MuxProcess {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to attach cover to {path}: {reason}")]
    Mux { path: PathBuf, reason: String },

    #[error("{0}")]
    Input(String),

    #[error("audio output unavailable: {0}")]
    Audio(String),

    #[error(transparent)]
    Ffmpeg(#[from] ffmpeg::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoverError {
    pub fn input(message: impl Into<String>) -> Self {
        CoverError::Input(message.into())
    }

    /// Mux errors abort the session; everything else is either silent
    /// termination or a no-op for the current command.
    pub fn is_mux_failure(&self) -> bool {
        matches!(self, CoverError::MuxProcess { .. } | CoverError::Mux { .. })
    }
}

pub type Result<T, E = CoverError> = std::result::Result<T, E>;
