//! Structured per-product logging.
//!
//! A [`ProductLogger`] is created for each product and handed down through
//! the orchestrator and stage runner, so every line carries the product id.

use tracing::{error, info, warn, Span};

use promo_models::ProductId;

use crate::error::Stage;

/// Product logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct ProductLogger {
    product_id: ProductId,
    operation: String,
}

impl ProductLogger {
    pub fn new(product_id: ProductId, operation: &str) -> Self {
        Self {
            product_id,
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Product started: {}", message
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: Stage, message: &str) {
        info!(
            product_id = %self.product_id,
            operation = %self.operation,
            stage = %stage,
            "{}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Product progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Product warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Product error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Product completed: {}", message
        );
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering all work done for this product.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "product",
            product_id = %self.product_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_logger_creation() {
        let logger = ProductLogger::new(ProductId(42), "promo_video");
        assert_eq!(logger.product_id(), ProductId(42));
        assert_eq!(logger.operation(), "promo_video");
    }

    #[test]
    fn test_logging_without_subscriber() {
        let logger = ProductLogger::new(ProductId(1), "promo_video");
        let _guard = logger.create_span().entered();
        logger.log_start("start");
        logger.log_stage(Stage::Trim, "trimming");
        logger.log_warning("warn");
        logger.log_error("error");
        logger.log_completion("done");
    }
}
