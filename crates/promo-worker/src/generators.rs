//! Script and voice-over generation through external executables.
//!
//! The generators are opaque tools: they receive file paths and settings and
//! write their results to the paths named in `PROMO_*_OUTPUT`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use promo_media::{tail_lines, MediaError, MediaResult};

use crate::config::GeneratorSettings;

/// Stderr lines kept when a tool fails.
const STDERR_TAIL_LINES: usize = 20;

/// Inputs and expected outputs of one script generation.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    /// Persisted `video_data` document
    pub document: PathBuf,
    /// Merged video duration, when the pipeline variant passes it
    pub duration: Option<f64>,
    pub script_output: PathBuf,
    pub title_output: PathBuf,
    /// Working directory for the tool
    pub workdir: PathBuf,
}

/// Capability: write a voice-over script (and optionally a short title).
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, request: &ScriptRequest) -> MediaResult<()>;
}

/// Capability: turn a script into a voice-over audio file.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(&self, script: &Path, output: &Path, workdir: &Path) -> MediaResult<()>;
}

/// [`ScriptGenerator`] that runs `<program> <document> [duration]`.
#[derive(Debug, Clone)]
pub struct CommandScriptGenerator {
    program: PathBuf,
    settings: GeneratorSettings,
}

impl CommandScriptGenerator {
    pub fn new(program: impl Into<PathBuf>, settings: GeneratorSettings) -> Self {
        Self {
            program: program.into(),
            settings,
        }
    }

    fn env(&self, request: &ScriptRequest) -> Vec<(String, String)> {
        let mut env = vec![
            (
                "HUGGINGFACE_ENDPOINT".to_string(),
                self.settings.huggingface_endpoint.clone(),
            ),
            (
                "HUGGINGFACE_MODEL".to_string(),
                self.settings.huggingface_model.clone(),
            ),
            (
                "PROMO_SCRIPT_OUTPUT".to_string(),
                request.script_output.to_string_lossy().to_string(),
            ),
            (
                "PROMO_TITLE_OUTPUT".to_string(),
                request.title_output.to_string_lossy().to_string(),
            ),
        ];
        if let Some(key) = &self.settings.huggingface_api_key {
            env.push(("HUGGINGFACE_API_KEY".to_string(), key.clone()));
        }
        if let Some(key) = &self.settings.gemini_api_key {
            env.push(("GEMINI_API_KEY".to_string(), key.clone()));
        }
        env
    }
}

#[async_trait]
impl ScriptGenerator for CommandScriptGenerator {
    async fn generate(&self, request: &ScriptRequest) -> MediaResult<()> {
        let mut args = vec![request.document.to_string_lossy().to_string()];
        if let Some(duration) = request.duration {
            args.push(format!("{:.2}", duration));
        }
        run_tool(
            "script generator",
            &self.program,
            &args,
            &self.env(request),
            &request.workdir,
        )
        .await
    }
}

/// [`VoiceSynthesizer`] that runs `<program> <script>`.
#[derive(Debug, Clone)]
pub struct CommandVoiceSynthesizer {
    program: PathBuf,
    zalo_api_key: Option<String>,
}

impl CommandVoiceSynthesizer {
    pub fn new(program: impl Into<PathBuf>, zalo_api_key: Option<String>) -> Self {
        Self {
            program: program.into(),
            zalo_api_key,
        }
    }
}

#[async_trait]
impl VoiceSynthesizer for CommandVoiceSynthesizer {
    async fn synthesize(&self, script: &Path, output: &Path, workdir: &Path) -> MediaResult<()> {
        let mut env = vec![(
            "PROMO_VOICE_OUTPUT".to_string(),
            output.to_string_lossy().to_string(),
        )];
        if let Some(key) = &self.zalo_api_key {
            env.push(("ZALO_API_KEY".to_string(), key.clone()));
        }

        let args = [script.to_string_lossy().to_string()];
        run_tool("voice synthesizer", &self.program, &args, &env, workdir).await
    }
}

/// Shell scripts are run through `bash`, anything else directly.
fn tool_command(program: &Path) -> Command {
    if program.extension().is_some_and(|ext| ext == "sh") {
        let mut cmd = Command::new("bash");
        cmd.arg(program);
        cmd
    } else {
        Command::new(program)
    }
}

async fn run_tool(
    name: &str,
    program: &Path,
    args: &[String],
    env: &[(String, String)],
    workdir: &Path,
) -> MediaResult<()> {
    debug!("Running {}: {} {}", name, program.display(), args.join(" "));

    let output = tool_command(program)
        .args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            let message = format!("failed to start {}: {}", program.display(), e);
            MediaError::tool_failed(name, message, None, None)
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::tool_failed(
            name,
            format!("exited with {}", output.status),
            Some(tail_lines(&stderr, STDERR_TAIL_LINES)),
            output.status.code(),
        ));
    }

    Ok(())
}
