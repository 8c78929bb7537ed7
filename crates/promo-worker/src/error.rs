//! Worker error types.

use std::fmt;

use thiserror::Error;

use promo_media::MediaError;
use promo_models::ValidationError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Download,
    Trim,
    Concatenate,
    Script,
    Voice,
    AudioMux,
    TextOverlay,
    Upscale,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Trim => "trim",
            Stage::Concatenate => "concatenate",
            Stage::Script => "script",
            Stage::Voice => "voice",
            Stage::AudioMux => "audio_mux",
            Stage::TextOverlay => "text_overlay",
            Stage::Upscale => "upscale",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid video_data: {0}")]
    Validation(#[from] ValidationError),

    #[error("Stage {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: MediaError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] promo_storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] promo_db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workspace error: {0}")]
    Workspace(String),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    pub fn stage_failed(stage: Stage, source: impl Into<MediaError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    /// The record is not eligible and should be left alone.
    pub fn is_skip(&self) -> bool {
        matches!(self, WorkerError::Validation(_))
    }

    /// Pipeline stage that failed, if this is a stage failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkerError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Attach a [`Stage`] to media-level failures.
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> WorkerResult<T>;
}

impl<T, E> StageContext<T> for Result<T, E>
where
    E: Into<MediaError>,
{
    fn in_stage(self, stage: Stage) -> WorkerResult<T> {
        self.map_err(|e| WorkerError::stage_failed(stage, e))
    }
}
