//! Per-product orchestration.
//!
//! Validates the `video_data` document, resets the workspace, downloads the
//! clips and drives the stage runner. [`ProductProcessor::process`] logs
//! failures and collapses them to `None`; [`ProductProcessor::try_process`]
//! keeps the typed error.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use promo_media::{DownloadConfig, Fetcher, Prober, RetryingDownloader, Transcoder};
use promo_models::{ProductId, VideoDataDocument};

use crate::error::{Stage, StageContext, WorkerError, WorkerResult};
use crate::generators::{ScriptGenerator, VoiceSynthesizer};
use crate::logging::ProductLogger;
use crate::pipeline::{StageOptions, StageRunner};
use crate::workspace::PipelineWorkspace;

/// External tools the pipeline depends on.
#[derive(Clone)]
pub struct Capabilities {
    pub prober: Arc<dyn Prober>,
    pub transcoder: Arc<dyn Transcoder>,
    pub fetcher: Arc<dyn Fetcher>,
    pub script_generator: Arc<dyn ScriptGenerator>,
    pub voice_synthesizer: Arc<dyn VoiceSynthesizer>,
}

/// Output of a fully successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultArtifact {
    pub product_id: ProductId,
    /// Upscaled final video
    pub path: PathBuf,
    /// Title burned into the video
    pub title: String,
    /// `productInfo.name`, used for the object key
    pub product_name: Option<String>,
}

/// Runs the whole pipeline for one product inside a workspace.
#[derive(Clone)]
pub struct ProductProcessor {
    runner: StageRunner,
    downloader: RetryingDownloader,
    workspace: PipelineWorkspace,
}

impl ProductProcessor {
    pub fn new(
        capabilities: Capabilities,
        options: StageOptions,
        download: DownloadConfig,
        workspace: PipelineWorkspace,
    ) -> Self {
        let downloader = RetryingDownloader::new(
            capabilities.fetcher,
            capabilities.prober.clone(),
            download,
        );
        let runner = StageRunner::new(
            capabilities.prober,
            capabilities.transcoder,
            capabilities.script_generator,
            capabilities.voice_synthesizer,
            options,
        );
        Self {
            runner,
            downloader,
            workspace,
        }
    }

    pub fn workspace(&self) -> &PipelineWorkspace {
        &self.workspace
    }

    /// Process one product, logging and swallowing any failure.
    pub async fn process(&self, product_id: ProductId, raw: &Value) -> Option<ResultArtifact> {
        let logger = ProductLogger::new(product_id, "promo_video");

        match self.try_process(product_id, raw, &logger).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                log_failure(&logger, &e);
                None
            }
        }
    }

    /// Process one product, returning the typed failure.
    ///
    /// The document is validated before the workspace is touched, so a
    /// [`WorkerError::is_skip`] failure leaves no side effects.
    pub async fn try_process(
        &self,
        product_id: ProductId,
        raw: &Value,
        logger: &ProductLogger,
    ) -> WorkerResult<ResultArtifact> {
        let span = logger.create_span();
        self.run(product_id, raw, logger).instrument(span).await
    }

    async fn run(
        &self,
        product_id: ProductId,
        raw: &Value,
        logger: &ProductLogger,
    ) -> WorkerResult<ResultArtifact> {
        let document = VideoDataDocument::from_value(raw)?;
        let product_name = document.product_name().map(str::to_string);
        logger.log_start(&format!(
            "{} videos, name: {}",
            document.videos.len(),
            product_name.as_deref().unwrap_or("<none>")
        ));

        let ws = &self.workspace;
        ws.reset().await?;
        ws.persist_document(raw).await?;

        logger.log_stage(
            Stage::Download,
            &format!("Downloading {} videos", document.videos.len()),
        );
        let jobs: Vec<(&str, PathBuf)> = document
            .urls()
            .enumerate()
            .map(|(i, url)| (url, ws.source_clip(i)))
            .collect();
        self.downloader
            .download_all(jobs)
            .await
            .in_stage(Stage::Download)?;

        let title = self
            .runner
            .run_all(ws, document.videos.len(), product_name.as_deref(), logger)
            .await?;

        let path = ws.final_video();
        logger.log_completion(&format!("Final video at {}", path.display()));

        Ok(ResultArtifact {
            product_id,
            path,
            title,
            product_name,
        })
    }
}

/// Log a failed run, with the tool's stderr tail when there is one.
pub fn log_failure(logger: &ProductLogger, error: &WorkerError) {
    match error {
        WorkerError::Stage { stage, source } => {
            logger.log_error(&format!("Stage {} failed: {}", stage, source));
            if let Some(stderr) = source.stderr() {
                logger.log_error(&format!("stderr:\n{}", stderr));
            }
        }
        other => logger.log_error(&other.to_string()),
    }
}
