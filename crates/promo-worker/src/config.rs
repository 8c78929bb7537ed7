//! Worker configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use promo_media::{DownloadConfig, LayoutStrategy};
use promo_models::UpscaleTarget;
use promo_storage::R2Config;

use crate::error::{WorkerError, WorkerResult};

const DEFAULT_BUCKET: &str = "yt-2-tiktok";
const DEFAULT_PUBLIC_URL: &str = "https://pub-09ecd227972848afb3d86c1f7f2b57b1.r2.dev";
const DEFAULT_HF_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
const DEFAULT_HF_MODEL: &str = "deepseek-ai/DeepSeek-V3.2-Exp";

/// Which flavour of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineVariant {
    /// Passes the merged duration to the script generator and prefers the
    /// generated short title for the overlay.
    #[default]
    DurationAware,
    /// No duration hint, product name as title, tiered layout.
    Classic,
}

impl PipelineVariant {
    pub fn layout_strategy(self) -> LayoutStrategy {
        match self {
            Self::DurationAware => LayoutStrategy::CharBudget,
            Self::Classic => LayoutStrategy::Tiered,
        }
    }

    pub fn passes_duration(self) -> bool {
        matches!(self, Self::DurationAware)
    }

    pub fn uses_short_title(self) -> bool {
        matches!(self, Self::DurationAware)
    }
}

impl FromStr for PipelineVariant {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duration-aware" | "duration_aware" => Ok(Self::DurationAware),
            "classic" => Ok(Self::Classic),
            other => Err(WorkerError::config_error(format!(
                "PIPELINE_VARIANT must be 'duration-aware' or 'classic', got '{}'",
                other
            ))),
        }
    }
}

/// Settings forwarded to the script and voice generators.
#[derive(Clone, Default)]
pub struct GeneratorSettings {
    pub huggingface_endpoint: String,
    pub huggingface_model: String,
    pub huggingface_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub zalo_api_key: Option<String>,
}

impl std::fmt::Debug for GeneratorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSettings")
            .field("huggingface_endpoint", &self.huggingface_endpoint)
            .field("huggingface_model", &self.huggingface_model)
            .field("huggingface_api_key", &self.huggingface_api_key.is_some())
            .field("gemini_api_key", &self.gemini_api_key.is_some())
            .field("zalo_api_key", &self.zalo_api_key.is_some())
            .finish()
    }
}

/// Worker configuration.
#[derive(Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub r2: R2Config,
    pub generators: GeneratorSettings,
    /// Root of the per-product workspace
    pub work_dir: PathBuf,
    pub script_generator_cmd: PathBuf,
    pub voice_synthesizer_cmd: PathBuf,
    pub variant: PipelineVariant,
    pub title_font_file: Option<PathBuf>,
    pub upscale: UpscaleTarget,
    pub download: DownloadConfig,
    /// Run continuously with this pause between cycles; single cycle when unset
    pub poll_interval: Option<Duration>,
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("r2_endpoint", &self.r2.endpoint_url)
            .field("r2_bucket", &self.r2.bucket_name)
            .field("r2_public_url", &self.r2.public_base_url)
            .field("generators", &self.generators)
            .field("work_dir", &self.work_dir)
            .field("script_generator_cmd", &self.script_generator_cmd)
            .field("voice_synthesizer_cmd", &self.voice_synthesizer_cmd)
            .field("variant", &self.variant)
            .field("title_font_file", &self.title_font_file)
            .field("upscale", &self.upscale)
            .field("download", &self.download)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let r2 = R2Config {
            endpoint_url: env.required("R2_ENDPOINT")?,
            access_key_id: env.required("R2_ACCESS_KEY_ID")?,
            secret_access_key: env.required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: env.or("R2_BUCKET_NAME", DEFAULT_BUCKET),
            region: env.or("R2_REGION", "auto"),
            public_base_url: env.or("R2_PUBLIC_URL", DEFAULT_PUBLIC_URL),
        };

        let generators = GeneratorSettings {
            huggingface_endpoint: env.or("HUGGINGFACE_ENDPOINT", DEFAULT_HF_ENDPOINT),
            huggingface_model: env.or("HUGGINGFACE_MODEL", DEFAULT_HF_MODEL),
            huggingface_api_key: env.optional("HUGGINGFACE_API_KEY"),
            gemini_api_key: env.optional("GEMINI_API_KEY"),
            zalo_api_key: env.optional("ZALO_API_KEY"),
        };

        let defaults = DownloadConfig::default();
        let download = DownloadConfig {
            connect_timeout: Duration::from_secs(env.parse_or(
                "DOWNLOAD_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            timeout: Duration::from_secs(
                env.parse_or("DOWNLOAD_TIMEOUT_SECS", defaults.timeout.as_secs())?,
            ),
            max_attempts: env.parse_or("DOWNLOAD_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_delay: defaults.retry_delay,
        };
        if download.max_attempts == 0 {
            return Err(WorkerError::config_error(
                "DOWNLOAD_MAX_ATTEMPTS must be at least 1",
            ));
        }

        let upscale_default = UpscaleTarget::default();
        let upscale = UpscaleTarget {
            width: env.parse_or("UPSCALE_WIDTH", upscale_default.width)?,
            height: env.parse_or("UPSCALE_HEIGHT", upscale_default.height)?,
        };

        let variant = match env.optional("PIPELINE_VARIANT") {
            Some(v) => v.parse()?,
            None => PipelineVariant::default(),
        };

        let poll_interval = match env.optional("WORKER_POLL_INTERVAL_SECS") {
            Some(_) => Some(Duration::from_secs(
                env.parse_or("WORKER_POLL_INTERVAL_SECS", 0u64)?,
            ))
            .filter(|d| !d.is_zero()),
            None => None,
        };

        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            r2,
            generators,
            work_dir: PathBuf::from(env.or("WORKER_WORK_DIR", "./work")),
            script_generator_cmd: PathBuf::from(
                env.or("SCRIPT_GENERATOR_CMD", "scripts/generate-script.sh"),
            ),
            voice_synthesizer_cmd: PathBuf::from(
                env.or("VOICE_SYNTHESIZER_CMD", "scripts/generate-audio.sh"),
            ),
            variant,
            title_font_file: env.optional("TITLE_FONT_FILE").map(PathBuf::from),
            upscale,
            download,
            poll_interval,
        })
    }

    /// Anchor relative paths at `base`.
    ///
    /// Generators run with the workspace as their working directory, so
    /// every path handed to them must be absolute.
    pub fn with_absolute_paths(mut self, base: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.work_dir = anchor(self.work_dir);
        self.script_generator_cmd = anchor(self.script_generator_cmd);
        self.voice_synthesizer_cmd = anchor(self.voice_synthesizer_cmd);
        self.title_font_file = self.title_font_file.map(anchor);
        self
    }
}

/// Thin accessor over a variable lookup; blank values count as unset.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> WorkerResult<String> {
        self.optional(name)
            .ok_or_else(|| WorkerError::config_error(format!("{} not set", name)))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, name: &str, default: T) -> WorkerResult<T> {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|_| {
                WorkerError::config_error(format!("{} has invalid value '{}'", name, raw))
            }),
            None => Ok(default),
        }
    }
}
