//! Product promo video worker.
//!
//! This crate provides:
//! - Configuration from the environment
//! - The per-product media pipeline (download, trim, merge, voice-over, title, upscale)
//! - The poll loop that publishes results and marks products done

pub mod config;
pub mod error;
pub mod executor;
pub mod generators;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod workspace;

pub use config::{GeneratorSettings, PipelineVariant, WorkerConfig};
pub use error::{Stage, StageContext, WorkerError, WorkerResult};
pub use executor::{BatchExecutor, BatchSummary, Clock};
pub use generators::{
    CommandScriptGenerator, CommandVoiceSynthesizer, ScriptGenerator, ScriptRequest,
    VoiceSynthesizer,
};
pub use logging::ProductLogger;
pub use pipeline::{choose_title, StageOptions, StageRunner, DEFAULT_TITLE, FALLBACK_DURATION_SECS};
pub use processor::{log_failure, Capabilities, ProductProcessor, ResultArtifact};
pub use workspace::PipelineWorkspace;
