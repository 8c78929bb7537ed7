//! Source clip download with validation and bounded retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::probe::{Prober, VideoInfo};
use crate::retry::{retry_async, RetryConfig};

/// Files smaller than this are suspicious but still accepted.
const SMALL_FILE_WARN_BYTES: u64 = 1024;

/// Download tuning.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub connect_timeout: Duration,
    /// Overall request timeout, body included.
    pub timeout: Duration,
    /// Total attempts per clip.
    pub max_attempts: u32,
    /// Base backoff between attempts.
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(300),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Capability: fetch a remote resource into a local file.
///
/// Returns the number of bytes written.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64>;
}

/// [`Fetcher`] over HTTP(S), streaming the body to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// Downloads clips one at a time and validates each result.
#[derive(Clone)]
pub struct RetryingDownloader {
    fetcher: Arc<dyn Fetcher>,
    prober: Arc<dyn Prober>,
    config: DownloadConfig,
}

impl RetryingDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, prober: Arc<dyn Prober>, config: DownloadConfig) -> Self {
        Self {
            fetcher,
            prober,
            config,
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download `url` to `dest`, retrying up to `max_attempts` times in total.
    ///
    /// A partial or invalid file never survives a failed attempt.
    pub async fn download(&self, url: &str, dest: &Path) -> MediaResult<VideoInfo> {
        let retry = RetryConfig::new(format!("download {}", url))
            .with_max_attempts(self.config.max_attempts)
            .with_base_delay(self.config.retry_delay);

        retry_async(&retry, |attempt| self.attempt(url, dest, attempt))
            .await
            .into_result(|error, attempts| {
                MediaError::download_failed(format!("{}: {}", url, error), attempts)
            })
    }

    /// Download every `(url, dest)` pair in order, stopping at the first
    /// clip that exhausts its attempts.
    pub async fn download_all<'a, I>(&self, jobs: I) -> MediaResult<Vec<PathBuf>>
    where
        I: IntoIterator<Item = (&'a str, PathBuf)>,
    {
        let mut paths = Vec::new();
        for (index, (url, dest)) in jobs.into_iter().enumerate() {
            info!("Downloading video {}: {}", index + 1, url);
            let video = self.download(url, &dest).await?;
            info!(
                "Downloaded video {} ({:.2}s, {}x{})",
                index + 1,
                video.duration,
                video.width,
                video.height
            );
            paths.push(dest);
        }
        Ok(paths)
    }

    async fn attempt(&self, url: &str, dest: &Path, attempt: u32) -> MediaResult<VideoInfo> {
        debug!(
            "Fetching {} (attempt {}/{})",
            url, attempt, self.config.max_attempts
        );
        remove_if_exists(dest).await;

        let result = match self.fetcher.fetch(url, dest).await {
            Ok(_) => self.validate(dest).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            remove_if_exists(dest).await;
        }
        result
    }

    async fn validate(&self, path: &Path) -> MediaResult<VideoInfo> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(_) => return Err(MediaError::FileNotFound(path.to_path_buf())),
        };

        let size = metadata.len();
        if size == 0 {
            return Err(MediaError::EmptyFile(path.to_path_buf()));
        }
        if size < SMALL_FILE_WARN_BYTES {
            warn!(
                "Downloaded file is very small ({} bytes): {}",
                size,
                path.display()
            );
        }

        let info = self.prober.probe(path).await?;
        if info.duration.is_nan() || info.duration <= 0.0 {
            return Err(MediaError::invalid_video(format!(
                "non-positive duration for {}",
                path.display()
            )));
        }
        Ok(info)
    }
}

async fn remove_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
