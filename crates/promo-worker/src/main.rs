//! Promo video worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promo_db::PgProductStore;
use promo_media::{check_ffmpeg, check_ffprobe, FfmpegRunner, FfprobeProber, HttpFetcher, OverlayStyle};
use promo_storage::R2Client;
use promo_worker::{
    BatchExecutor, Capabilities, CommandScriptGenerator, CommandVoiceSynthesizer,
    PipelineWorkspace, ProductProcessor, StageOptions, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting promo-worker");

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to resolve current directory: {}", e);
            std::process::exit(1);
        }
    };
    let config = match WorkerConfig::from_env() {
        Ok(c) => c.with_absolute_paths(&cwd),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Worker config: {:?}", config);

    for check in [check_ffmpeg, check_ffprobe] {
        if let Err(e) = check() {
            error!("{}", e);
            std::process::exit(1);
        }
    }

    let store = match PgProductStore::connect(&config.database_url).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let objects = match R2Client::new(config.r2.clone()).await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create R2 client: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = objects.check_connectivity().await {
        warn!("R2 connectivity check failed: {}", e);
    }

    let fetcher = match HttpFetcher::new(&config.download) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let capabilities = Capabilities {
        prober: Arc::new(FfprobeProber::new()),
        transcoder: Arc::new(FfmpegRunner::new()),
        fetcher: Arc::new(fetcher),
        script_generator: Arc::new(CommandScriptGenerator::new(
            &config.script_generator_cmd,
            config.generators.clone(),
        )),
        voice_synthesizer: Arc::new(CommandVoiceSynthesizer::new(
            &config.voice_synthesizer_cmd,
            config.generators.zalo_api_key.clone(),
        )),
    };

    let mut overlay = OverlayStyle::default();
    if let Some(font) = &config.title_font_file {
        overlay = overlay.with_font_file(font);
    }
    let options = StageOptions {
        variant: config.variant,
        overlay,
        upscale: config.upscale,
        ..Default::default()
    };

    let processor = ProductProcessor::new(
        capabilities,
        options,
        config.download.clone(),
        PipelineWorkspace::new(&config.work_dir),
    );
    let executor = Arc::new(BatchExecutor::new(
        Arc::new(store),
        Arc::new(objects),
        processor,
    ));

    match config.poll_interval {
        Some(interval) => {
            let signal_executor = executor.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Received shutdown signal");
                signal_executor.shutdown();
            });
            executor.run_forever(interval).await;
        }
        None => {
            if let Err(e) = executor.run_once().await {
                error!("Processing failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("Worker shutdown complete");
}
