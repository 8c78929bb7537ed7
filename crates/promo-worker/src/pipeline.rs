//! Ordered media stages for one product.
//!
//! Every stage reads the previous stage's file from the [`PipelineWorkspace`]
//! and writes its own; any failure stops the run and is reported with the
//! [`Stage`] it happened in.

use std::sync::Arc;

use promo_media::{
    concat_command, layout_title, mux_audio_command, normalize_audio_command, text_overlay_command,
    trim_command, upscale_command, write_concat_manifest, MediaError, OverlayStyle, Prober,
    Transcoder, TrimPlan,
};
use promo_models::{AudioNormalization, UpscaleTarget};

use crate::config::PipelineVariant;
use crate::error::{Stage, StageContext, WorkerResult};
use crate::generators::{ScriptGenerator, ScriptRequest, VoiceSynthesizer};
use crate::logging::ProductLogger;
use crate::workspace::PipelineWorkspace;

/// Used when the merged file cannot be probed before script generation.
pub const FALLBACK_DURATION_SECS: f64 = 60.0;

/// Overlay title when the product has no usable name.
pub const DEFAULT_TITLE: &str = "Product";

/// Options shared by every product in a run.
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    pub variant: PipelineVariant,
    pub overlay: OverlayStyle,
    pub upscale: UpscaleTarget,
    pub audio: AudioNormalization,
}

/// Runs the media stages against injected capabilities.
#[derive(Clone)]
pub struct StageRunner {
    prober: Arc<dyn Prober>,
    transcoder: Arc<dyn Transcoder>,
    script_generator: Arc<dyn ScriptGenerator>,
    voice_synthesizer: Arc<dyn VoiceSynthesizer>,
    options: StageOptions,
}

impl StageRunner {
    pub fn new(
        prober: Arc<dyn Prober>,
        transcoder: Arc<dyn Transcoder>,
        script_generator: Arc<dyn ScriptGenerator>,
        voice_synthesizer: Arc<dyn VoiceSynthesizer>,
        options: StageOptions,
    ) -> Self {
        Self {
            prober,
            transcoder,
            script_generator,
            voice_synthesizer,
            options,
        }
    }

    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    /// Run stages 1 through 7 over `clip_count` downloaded clips.
    ///
    /// Returns the overlay title that was burned in.
    pub async fn run_all(
        &self,
        ws: &PipelineWorkspace,
        clip_count: usize,
        product_name: Option<&str>,
        logger: &ProductLogger,
    ) -> WorkerResult<String> {
        self.trim_clips(ws, clip_count, logger).await?;
        self.concatenate(ws, clip_count, logger).await?;
        self.generate_script(ws, logger).await?;
        self.synthesize_voice(ws, logger).await?;
        self.mux_audio(ws, logger).await?;
        let title = self.overlay_title(ws, product_name, logger).await?;
        self.upscale(ws, logger).await?;
        Ok(title)
    }

    /// Stage 1: drop the first and last two seconds of every clip.
    pub async fn trim_clips(
        &self,
        ws: &PipelineWorkspace,
        clip_count: usize,
        logger: &ProductLogger,
    ) -> WorkerResult<()> {
        logger.log_stage(Stage::Trim, &format!("Trimming {} clips", clip_count));

        for index in 0..clip_count {
            let input = ws.source_clip(index);
            let output = ws.trimmed_clip(index);

            let size = tokio::fs::metadata(&input)
                .await
                .map_err(|_| MediaError::FileNotFound(input.clone()))
                .in_stage(Stage::Trim)?
                .len();
            if size == 0 {
                return Err(MediaError::EmptyFile(input)).in_stage(Stage::Trim);
            }

            let info = self.prober.probe(&input).await.in_stage(Stage::Trim)?;

            match TrimPlan::for_duration(info.duration) {
                TrimPlan::Cut { start, duration } => {
                    let cmd = trim_command(&input, &output, start, duration);
                    self.transcoder.transcode(&cmd).await.in_stage(Stage::Trim)?;
                    logger.log_progress(&format!(
                        "Trimmed video {}: {:.2}s -> {:.2}s",
                        index + 1,
                        info.duration,
                        duration
                    ));
                }
                TrimPlan::KeepOriginal => {
                    tokio::fs::copy(&input, &output).await.in_stage(Stage::Trim)?;
                    logger.log_warning(&format!(
                        "Video {} too short ({:.2}s), keeping original",
                        index + 1,
                        info.duration
                    ));
                }
            }
        }
        Ok(())
    }

    /// Stage 2: join trimmed clips in order.
    pub async fn concatenate(
        &self,
        ws: &PipelineWorkspace,
        clip_count: usize,
        logger: &ProductLogger,
    ) -> WorkerResult<()> {
        logger.log_stage(Stage::Concatenate, "Merging videos");

        let manifest = ws.concat_manifest();
        write_concat_manifest(&manifest, clip_count)
            .await
            .in_stage(Stage::Concatenate)?;

        let cmd = concat_command(&manifest, ws.merged());
        self.transcoder
            .transcode(&cmd)
            .await
            .in_stage(Stage::Concatenate)
    }

    /// Stage 3: ask the script generator for a voice-over script.
    pub async fn generate_script(
        &self,
        ws: &PipelineWorkspace,
        logger: &ProductLogger,
    ) -> WorkerResult<()> {
        let duration = match self.prober.probe(&ws.merged()).await {
            Ok(info) => info.duration,
            Err(e) => {
                logger.log_warning(&format!(
                    "Could not probe merged video ({}), assuming {:.0}s",
                    e, FALLBACK_DURATION_SECS
                ));
                FALLBACK_DURATION_SECS
            }
        };
        logger.log_stage(
            Stage::Script,
            &format!("Generating script for {:.2}s video", duration),
        );

        let request = ScriptRequest {
            document: ws.document_path(),
            duration: self.options.variant.passes_duration().then_some(duration),
            script_output: ws.script(),
            title_output: ws.short_title(),
            workdir: ws.root().to_path_buf(),
        };
        self.script_generator
            .generate(&request)
            .await
            .in_stage(Stage::Script)?;

        require_output(&request.script_output).in_stage(Stage::Script)
    }

    /// Stage 4: synthesize the voice-over.
    pub async fn synthesize_voice(
        &self,
        ws: &PipelineWorkspace,
        logger: &ProductLogger,
    ) -> WorkerResult<()> {
        logger.log_stage(Stage::Voice, "Generating audio");

        let output = ws.voiceover();
        self.voice_synthesizer
            .synthesize(&ws.script(), &output, ws.root())
            .await
            .in_stage(Stage::Voice)?;

        require_output(&output).in_stage(Stage::Voice)
    }

    /// Stage 5: normalize the voice-over and make it the video's audio.
    pub async fn mux_audio(&self, ws: &PipelineWorkspace, logger: &ProductLogger) -> WorkerResult<()> {
        logger.log_stage(Stage::AudioMux, "Adding audio to video");

        let normalize =
            normalize_audio_command(ws.voiceover(), ws.normalized_voiceover(), &self.options.audio);
        self.transcoder
            .transcode(&normalize)
            .await
            .in_stage(Stage::AudioMux)?;

        let mux = mux_audio_command(ws.merged(), ws.normalized_voiceover(), ws.with_audio());
        self.transcoder.transcode(&mux).await.in_stage(Stage::AudioMux)
    }

    /// Stage 6: burn the title into the video. Returns the title used.
    pub async fn overlay_title(
        &self,
        ws: &PipelineWorkspace,
        product_name: Option<&str>,
        logger: &ProductLogger,
    ) -> WorkerResult<String> {
        let input = ws.with_audio();
        let info = self.prober.probe(&input).await.in_stage(Stage::TextOverlay)?;
        logger.log_progress(&format!("Video dimensions: {}x{}", info.width, info.height));

        let short_title = if self.options.variant.uses_short_title() {
            read_short_title(ws).await
        } else {
            None
        };
        let title = choose_title(short_title.as_deref(), product_name);

        let layout = layout_title(&title, info.width, self.options.variant.layout_strategy());
        logger.log_stage(
            Stage::TextOverlay,
            &format!(
                "Adding title '{}': {} lines, font size {}",
                title, layout.lines, layout.fontsize
            ),
        );

        let cmd = text_overlay_command(&input, ws.titled(), &layout, &self.options.overlay);
        self.transcoder
            .transcode(&cmd)
            .await
            .in_stage(Stage::TextOverlay)?;
        Ok(title)
    }

    /// Stage 7: fit the video into the target frame.
    pub async fn upscale(&self, ws: &PipelineWorkspace, logger: &ProductLogger) -> WorkerResult<()> {
        let input = ws.titled();
        let info = self.prober.probe(&input).await.in_stage(Stage::Upscale)?;
        logger.log_stage(
            Stage::Upscale,
            &format!(
                "Upscaling {}x{} -> {}",
                info.width, info.height, self.options.upscale
            ),
        );

        let cmd = upscale_command(&input, ws.final_video(), self.options.upscale);
        self.transcoder.transcode(&cmd).await.in_stage(Stage::Upscale)
    }
}

fn require_output(path: &std::path::Path) -> Result<(), MediaError> {
    if path.exists() {
        Ok(())
    } else {
        Err(MediaError::MissingOutput(path.to_path_buf()))
    }
}

async fn read_short_title(ws: &PipelineWorkspace) -> Option<String> {
    let raw = tokio::fs::read_to_string(ws.short_title()).await.ok()?;
    let title = raw.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Short title if present, then product name, then [`DEFAULT_TITLE`].
pub fn choose_title(short_title: Option<&str>, product_name: Option<&str>) -> String {
    [short_title, product_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}
