//! Pipeline and batch loop tests against in-memory capabilities.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use promo_db::{DbError, DbResult, ProductStore};
use promo_media::{
    DownloadConfig, FfmpegCommand, Fetcher, MediaError, MediaResult, Prober, Transcoder,
    VideoInfo,
};
use promo_models::{ProductId, ProductRecord};
use promo_storage::{ObjectStore, StorageResult};
use promo_worker::{
    BatchExecutor, Capabilities, PipelineVariant, PipelineWorkspace, ProductLogger,
    ProductProcessor, ScriptGenerator, ScriptRequest, Stage, StageOptions, VoiceSynthesizer,
    WorkerError, FALLBACK_DURATION_SECS,
};

// ============================================================================
// Fakes
// ============================================================================

/// Failures injected into the fakes, matched by output file name.
#[derive(Default, Clone, Copy)]
struct Faults {
    unprobeable: Option<&'static str>,
    failing_output: Option<&'static str>,
    silent_voice: bool,
}

fn named(path: &Path, name: Option<&str>) -> bool {
    name.is_some_and(|n| path.file_name().is_some_and(|f| f == n))
}

/// Reads `dur=<secs>` from the file; anything else probes as 13 seconds.
struct FileProber {
    unprobeable: Option<&'static str>,
}

#[async_trait]
impl Prober for FileProber {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        if named(path, self.unprobeable) {
            return Err(MediaError::invalid_video("corrupt container"));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let duration = content
            .trim()
            .strip_prefix("dur=")
            .and_then(|d| d.parse().ok())
            .unwrap_or(13.0);
        Ok(VideoInfo {
            duration,
            width: 720,
            height: 1280,
            fps: 30.0,
            codec: "h264".to_string(),
            size: content.len() as u64,
        })
    }
}

/// Writes every output as a 13 second video and records the arguments.
#[derive(Default)]
struct RecordingTranscoder {
    commands: Mutex<Vec<(PathBuf, Vec<String>)>>,
    failing_output: Option<&'static str>,
}

impl RecordingTranscoder {
    fn outputs(&self) -> Vec<PathBuf> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|(out, _)| out.clone())
            .collect()
    }

    fn args_for(&self, file_name: &str) -> Option<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .find(|(out, _)| out.file_name().is_some_and(|n| n == file_name))
            .map(|(_, args)| args.clone())
    }
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.commands
            .lock()
            .unwrap()
            .push((cmd.output().to_path_buf(), cmd.build_args()));
        if named(cmd.output(), self.failing_output) {
            return Err(MediaError::FfmpegFailed {
                message: "exited with 1".to_string(),
                stderr: Some("Invalid data found when processing input".to_string()),
                exit_code: Some(1),
            });
        }
        tokio::fs::write(cmd.output(), "dur=13.0").await?;
        Ok(())
    }
}

/// Serves fixed bodies per URL; unknown URLs fail.
#[derive(Default)]
struct MapFetcher {
    bodies: HashMap<String, String>,
    calls: AtomicU32,
}

impl MapFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| MediaError::FileNotFound(PathBuf::from(url)))?;
        tokio::fs::write(dest, body).await?;
        Ok(body.len() as u64)
    }
}

#[derive(Default)]
struct FakeScriptGenerator {
    durations: Mutex<Vec<Option<f64>>>,
}

#[async_trait]
impl ScriptGenerator for FakeScriptGenerator {
    async fn generate(&self, request: &ScriptRequest) -> MediaResult<()> {
        self.durations.lock().unwrap().push(request.duration);
        assert!(request.document.exists());
        tokio::fs::write(&request.script_output, "Xin chào các bạn").await?;
        tokio::fs::write(&request.title_output, "Áo đẹp\n").await?;
        Ok(())
    }
}

/// Exits cleanly; when `silent`, without writing anything.
struct FakeVoice {
    silent: bool,
}

#[async_trait]
impl VoiceSynthesizer for FakeVoice {
    async fn synthesize(&self, script: &Path, output: &Path, _workdir: &Path) -> MediaResult<()> {
        assert!(script.exists());
        if !self.silent {
            tokio::fs::write(output, "wav").await?;
        }
        Ok(())
    }
}

struct MemoryStore {
    pending: Vec<ProductRecord>,
    done: Mutex<Vec<(ProductId, String)>>,
    fail_mark: bool,
}

impl MemoryStore {
    fn new(pending: Vec<ProductRecord>) -> Self {
        Self {
            pending,
            done: Mutex::new(Vec::new()),
            fail_mark: false,
        }
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn fetch_pending(&self) -> DbResult<Vec<ProductRecord>> {
        Ok(self.pending.clone())
    }

    async fn mark_done(&self, id: ProductId, url: &str) -> DbResult<()> {
        if self.fail_mark {
            return Err(DbError::RowNotFound(id.get()));
        }
        self.done.lock().unwrap().push((id, url.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryObjects {
    puts: Mutex<Vec<(String, HashMap<String, String>)>>,
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put_file(
        &self,
        path: &Path,
        key: &str,
        _content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()> {
        assert!(path.exists());
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), metadata.clone()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.example.com/{}", key)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    _dir: TempDir,
    transcoder: Arc<RecordingTranscoder>,
    fetcher: Arc<MapFetcher>,
    script: Arc<FakeScriptGenerator>,
    processor: ProductProcessor,
}

fn harness(fetcher: MapFetcher, variant: PipelineVariant) -> Harness {
    harness_with(fetcher, variant, Faults::default())
}

fn harness_with(fetcher: MapFetcher, variant: PipelineVariant, faults: Faults) -> Harness {
    let dir = TempDir::new().unwrap();
    let transcoder = Arc::new(RecordingTranscoder {
        failing_output: faults.failing_output,
        ..Default::default()
    });
    let fetcher = Arc::new(fetcher);
    let script = Arc::new(FakeScriptGenerator::default());

    let capabilities = Capabilities {
        prober: Arc::new(FileProber {
            unprobeable: faults.unprobeable,
        }),
        transcoder: transcoder.clone(),
        fetcher: fetcher.clone(),
        script_generator: script.clone(),
        voice_synthesizer: Arc::new(FakeVoice {
            silent: faults.silent_voice,
        }),
    };
    let options = StageOptions {
        variant,
        ..Default::default()
    };
    let download = DownloadConfig {
        retry_delay: Duration::from_millis(1),
        ..Default::default()
    };
    let processor = ProductProcessor::new(
        capabilities,
        options,
        download,
        PipelineWorkspace::new(dir.path().join("work")),
    );

    Harness {
        _dir: dir,
        transcoder,
        fetcher,
        script,
        processor,
    }
}

fn two_clip_fetcher() -> MapFetcher {
    MapFetcher::default()
        .with("https://cdn.test/a.mp4", "dur=10.0")
        .with("https://cdn.test/b.mp4", "dur=3.0")
}

fn two_clip_document() -> Value {
    json!({
        "productInfo": { "name": "Áo Thun Nam" },
        "videos": [
            { "url": "https://cdn.test/a.mp4" },
            { "url": "https://cdn.test/b.mp4" }
        ]
    })
}

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn test_pipeline_runs_every_stage_in_order() {
    let h = harness(two_clip_fetcher(), PipelineVariant::DurationAware);
    let ws = h.processor.workspace().clone();
    ws.reset().await.unwrap();

    let logger = ProductLogger::new(ProductId(42), "promo_video");
    let artifact = h
        .processor
        .try_process(ProductId(42), &two_clip_document(), &logger)
        .await
        .unwrap();

    assert_eq!(artifact.path, ws.final_video());
    assert!(artifact.path.exists());
    assert_eq!(artifact.title, "Áo đẹp");
    assert_eq!(artifact.product_name.as_deref(), Some("Áo Thun Nam"));

    // Long clip is cut, short clip is copied untouched.
    let trim = h.transcoder.args_for("trimmed_0.mp4").unwrap();
    let ss = trim.iter().position(|a| a == "-ss").unwrap();
    assert_eq!(trim[ss + 1], "2.000");
    let t = trim.iter().position(|a| a == "-t").unwrap();
    assert_eq!(trim[t + 1], "6.000");
    assert!(h.transcoder.args_for("trimmed_1.mp4").is_none());
    assert_eq!(
        std::fs::read_to_string(ws.trimmed_clip(1)).unwrap(),
        "dur=3.0"
    );

    let manifest = std::fs::read_to_string(ws.concat_manifest()).unwrap();
    assert_eq!(manifest, "file 'trimmed_0.mp4'\nfile 'trimmed_1.mp4'\n");

    let outputs: Vec<String> = h
        .transcoder
        .outputs()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        outputs,
        vec![
            "trimmed_0.mp4",
            "merged_temp.mp4",
            "voiceover_normalized.aac",
            "merged_with_audio.mp4",
            "final_merged_video.mp4",
            "final_merged_video_1080p.mp4",
        ]
    );

    assert_eq!(*h.script.durations.lock().unwrap(), vec![Some(13.0)]);

    let mux = h.transcoder.args_for("merged_with_audio.mp4").unwrap();
    assert!(mux.contains(&"-shortest".to_string()));
    let overlay = h.transcoder.args_for("final_merged_video.mp4").unwrap();
    assert!(overlay.iter().any(|a| a.contains("drawtext") && a.contains("Áo đẹp")));
}

#[tokio::test]
async fn test_classic_variant_uses_product_name_and_no_duration() {
    let h = harness(two_clip_fetcher(), PipelineVariant::Classic);
    h.processor.workspace().reset().await.unwrap();

    let logger = ProductLogger::new(ProductId(7), "promo_video");
    let artifact = h
        .processor
        .try_process(ProductId(7), &two_clip_document(), &logger)
        .await
        .unwrap();

    assert_eq!(artifact.title, "Áo Thun Nam");
    assert_eq!(*h.script.durations.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_download_exhaustion_fails_in_download_stage() {
    let fetcher = MapFetcher::default().with("https://cdn.test/a.mp4", "dur=10.0");
    let h = harness(fetcher, PipelineVariant::default());
    h.processor.workspace().reset().await.unwrap();

    let logger = ProductLogger::new(ProductId(3), "promo_video");
    let err = h
        .processor
        .try_process(ProductId(3), &two_clip_document(), &logger)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Download));
    // One call for the good clip, three for the missing one.
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 4);
    assert!(!h.processor.workspace().source_clip(1).exists());
    assert!(h.transcoder.outputs().is_empty());
}

#[tokio::test]
async fn test_entry_without_url_is_rejected_before_download() {
    let h = harness(two_clip_fetcher(), PipelineVariant::default());
    h.processor.workspace().reset().await.unwrap();

    let logger = ProductLogger::new(ProductId(5), "promo_video");
    let err = h
        .processor
        .try_process(ProductId(5), &json!({ "videos": [{ "title": "x" }] }), &logger)
        .await
        .unwrap_err();

    assert!(err.is_skip());
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unprobeable_merge_falls_back_to_default_duration() {
    let faults = Faults {
        unprobeable: Some("merged_temp.mp4"),
        ..Default::default()
    };
    let h = harness_with(two_clip_fetcher(), PipelineVariant::DurationAware, faults);

    let logger = ProductLogger::new(ProductId(11), "promo_video");
    let artifact = h
        .processor
        .try_process(ProductId(11), &two_clip_document(), &logger)
        .await
        .unwrap();

    assert!(artifact.path.exists());
    assert_eq!(
        *h.script.durations.lock().unwrap(),
        vec![Some(FALLBACK_DURATION_SECS)]
    );
}

#[tokio::test]
async fn test_voice_without_output_fails_voice_stage() {
    let faults = Faults {
        silent_voice: true,
        ..Default::default()
    };
    let h = harness_with(two_clip_fetcher(), PipelineVariant::default(), faults);
    let ws = h.processor.workspace().clone();

    let logger = ProductLogger::new(ProductId(12), "promo_video");
    let err = h
        .processor
        .try_process(ProductId(12), &two_clip_document(), &logger)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Voice));
    assert!(matches!(
        err,
        WorkerError::Stage {
            source: MediaError::MissingOutput(_),
            ..
        }
    ));
    assert!(!ws.normalized_voiceover().exists());
    assert!(!ws.with_audio().exists());
    assert!(!ws.final_video().exists());
}

#[tokio::test]
async fn test_concat_failure_stops_later_stages() {
    let faults = Faults {
        failing_output: Some("merged_temp.mp4"),
        ..Default::default()
    };
    let h = harness_with(two_clip_fetcher(), PipelineVariant::default(), faults);
    let ws = h.processor.workspace().clone();

    let logger = ProductLogger::new(ProductId(13), "promo_video");
    let err = h
        .processor
        .try_process(ProductId(13), &two_clip_document(), &logger)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Concatenate));
    assert!(h.script.durations.lock().unwrap().is_empty());
    assert!(h
        .processor
        .process(ProductId(13), &two_clip_document())
        .await
        .is_none());
    assert!(h.transcoder.args_for("merged_with_audio.mp4").is_none());
    assert!(!ws.script().exists());
    assert!(!ws.final_video().exists());
}

// ============================================================================
// Batch loop
// ============================================================================

fn fixed_clock() -> promo_worker::Clock {
    Arc::new(|| Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn test_batch_publishes_and_marks_done() {
    let h = harness(two_clip_fetcher(), PipelineVariant::default());
    let store = Arc::new(MemoryStore::new(vec![ProductRecord::new(
        ProductId(42),
        Some(two_clip_document()),
    )]));
    let objects = Arc::new(MemoryObjects::default());

    let executor =
        BatchExecutor::new(store.clone(), objects.clone(), h.processor).with_clock(fixed_clock());
    let summary = executor.run_once().await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.success, 1);

    let key = "merged_videos/20250101_120000_product_42_o_Thun_Nam.mp4";
    let puts = objects.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, key);
    assert_eq!(puts[0].1.get("product_id").map(String::as_str), Some("42"));

    let done = store.done.lock().unwrap();
    assert_eq!(
        *done,
        vec![(ProductId(42), format!("https://cdn.example.com/{}", key))]
    );
}

#[tokio::test]
async fn test_batch_skips_records_without_videos() {
    let h = harness(two_clip_fetcher(), PipelineVariant::default());
    let store = Arc::new(MemoryStore::new(vec![
        ProductRecord::new(ProductId(1), None),
        ProductRecord::new(ProductId(2), Some(json!({ "videos": [] }))),
    ]));
    let objects = Arc::new(MemoryObjects::default());

    let executor = BatchExecutor::new(store.clone(), objects.clone(), h.processor);
    let summary = executor.run_once().await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.success, 0);
    assert!(objects.puts.lock().unwrap().is_empty());
    assert!(store.done.lock().unwrap().is_empty());
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_counts_mark_done_failure() {
    let h = harness(two_clip_fetcher(), PipelineVariant::default());
    let mut store = MemoryStore::new(vec![ProductRecord::new(
        ProductId(9),
        Some(two_clip_document()),
    )]);
    store.fail_mark = true;
    let objects = Arc::new(MemoryObjects::default());

    let executor = BatchExecutor::new(Arc::new(store), objects.clone(), h.processor);
    let summary = executor.run_once().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.success, 0);
    // The upload already happened; only the datastore write failed.
    assert_eq!(objects.puts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_continues_after_failed_product() {
    let fetcher = two_clip_fetcher();
    let h = harness(fetcher, PipelineVariant::default());
    let broken = json!({ "videos": [{ "url": "https://cdn.test/missing.mp4" }] });
    let store = Arc::new(MemoryStore::new(vec![
        ProductRecord::new(ProductId(1), Some(broken)),
        ProductRecord::new(ProductId(2), Some(two_clip_document())),
    ]));
    let objects = Arc::new(MemoryObjects::default());

    let executor = BatchExecutor::new(store.clone(), objects, h.processor);
    let summary = executor.run_once().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(store.done.lock().unwrap()[0].0, ProductId(2));
}

#[tokio::test]
async fn test_run_forever_stops_on_shutdown() {
    let h = harness(two_clip_fetcher(), PipelineVariant::default());
    let store = Arc::new(MemoryStore::new(Vec::new()));
    let executor = Arc::new(BatchExecutor::new(
        store,
        Arc::new(MemoryObjects::default()),
        h.processor,
    ));

    let runner = executor.clone();
    let handle = tokio::spawn(async move { runner.run_forever(Duration::from_secs(3600)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    executor.shutdown();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_batch_skips_entry_without_url() {
    let h = harness(two_clip_fetcher(), PipelineVariant::default());
    let store = Arc::new(MemoryStore::new(vec![ProductRecord::new(
        ProductId(4),
        Some(json!({ "videos": [{ "title": "no url" }] })),
    )]));
    let objects = Arc::new(MemoryObjects::default());
    let root = h.processor.workspace().root().to_path_buf();

    let executor = BatchExecutor::new(store.clone(), objects.clone(), h.processor);
    let summary = executor.run_once().await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(!root.exists());
    assert!(objects.puts.lock().unwrap().is_empty());
    assert!(store.done.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_concat_failure_publishes_nothing() {
    let faults = Faults {
        failing_output: Some("merged_temp.mp4"),
        ..Default::default()
    };
    let h = harness_with(two_clip_fetcher(), PipelineVariant::default(), faults);
    let store = Arc::new(MemoryStore::new(vec![ProductRecord::new(
        ProductId(14),
        Some(two_clip_document()),
    )]));
    let objects = Arc::new(MemoryObjects::default());

    let executor = BatchExecutor::new(store.clone(), objects.clone(), h.processor);
    let summary = executor.run_once().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(objects.puts.lock().unwrap().is_empty());
    assert!(store.done.lock().unwrap().is_empty());
}
