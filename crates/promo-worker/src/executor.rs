//! Poll-and-publish loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use promo_db::ProductStore;
use promo_models::ProductRecord;
use promo_storage::{publish_product_video, ObjectStore};

use crate::error::WorkerResult;
use crate::logging::ProductLogger;
use crate::processor::{log_failure, ProductProcessor};

/// Source of the timestamp embedded in object keys.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Outcome counts of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

enum Outcome {
    Success,
    Failed,
    Skipped,
}

/// Fetches pending products and runs each through the pipeline in turn.
pub struct BatchExecutor {
    store: Arc<dyn ProductStore>,
    objects: Arc<dyn ObjectStore>,
    processor: ProductProcessor,
    clock: Clock,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl BatchExecutor {
    pub fn new(
        store: Arc<dyn ProductStore>,
        objects: Arc<dyn ObjectStore>,
        processor: ProductProcessor,
    ) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            store,
            objects,
            processor,
            clock: Arc::new(Utc::now),
            shutdown,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// One pass over all pending products.
    ///
    /// Only a failure to list pending products is returned as an error;
    /// per-product failures are counted in the summary.
    pub async fn run_once(&self) -> WorkerResult<BatchSummary> {
        let records = self.store.fetch_pending().await?;
        info!("Found {} products to process", records.len());

        let mut summary = BatchSummary {
            total: records.len(),
            ..Default::default()
        };

        for (index, record) in records.iter().enumerate() {
            info!(
                "Processing product {}/{} (id {})",
                index + 1,
                records.len(),
                record.id
            );
            match self.handle(record).await {
                Outcome::Success => summary.success += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }

        info!(
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            skipped = summary.skipped,
            "Processing complete"
        );
        Ok(summary)
    }

    async fn handle(&self, record: &ProductRecord) -> Outcome {
        let raw = match record.check_shape() {
            Ok(raw) => raw,
            Err(reason) => {
                warn!(product_id = %record.id, "Skipping product: {}", reason);
                return Outcome::Skipped;
            }
        };

        let logger = ProductLogger::new(record.id, "promo_video");
        let artifact = match self.processor.try_process(record.id, raw, &logger).await {
            Ok(artifact) => artifact,
            Err(e) if e.is_skip() => {
                logger.log_warning(&format!("Skipping product: {}", e));
                return Outcome::Skipped;
            }
            Err(e) => {
                log_failure(&logger, &e);
                return Outcome::Failed;
            }
        };

        let name = artifact.product_name.as_deref().unwrap_or("product");
        let published = match publish_product_video(
            self.objects.as_ref(),
            &artifact.path,
            record.id,
            name,
            (self.clock)(),
        )
        .await
        {
            Ok(published) => published,
            Err(e) => {
                error!(product_id = %record.id, "Upload failed: {}", e);
                return Outcome::Failed;
            }
        };

        if let Err(e) = self.store.mark_done(record.id, &published.url).await {
            error!(
                product_id = %record.id,
                orphaned_key = %published.key,
                "Uploaded but failed to mark product done: {}", e
            );
            return Outcome::Failed;
        }

        info!(product_id = %record.id, url = %published.url, "Product processed");
        Outcome::Success
    }

    /// Repeat [`run_once`](Self::run_once) every `interval` until shutdown.
    ///
    /// A failed cycle is logged and the loop keeps going.
    pub async fn run_forever(&self, interval: Duration) {
        let mut shutdown_rx = self.shutdown.subscribe();
        info!("Polling every {:?}", interval);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if let Err(e) = self.run_once().await {
                error!("Processing cycle failed: {}", e);
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Poll loop stopped");
    }

    /// Signal shutdown. Takes effect once the current cycle finishes.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
