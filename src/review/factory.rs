use super::{
    InMemoryReviewQueue, JsonlReviewQueue, NoopReviewQueue, ReviewQueue, WebhookReviewQueue,
};
use crate::config::{ReviewBackend, ReviewConfig};
use crate::error::ConfigError;
use std::sync::Arc;
use std::time::Duration;

/// Build the review queue selected by `[review]`.
pub fn create_review_queue(config: &ReviewConfig) -> Result<Arc<dyn ReviewQueue>, ConfigError> {
    match config.backend {
        ReviewBackend::None => Ok(Arc::new(NoopReviewQueue)),
        ReviewBackend::Memory => Ok(Arc::new(InMemoryReviewQueue::with_max_tickets(
            config.max_tickets,
        ))),
        ReviewBackend::Jsonl => {
            let path = config.path.as_deref().ok_or_else(|| {
                ConfigError::Validation("review.backend = \"jsonl\" requires review.path".into())
            })?;
            Ok(Arc::new(JsonlReviewQueue::new(path)))
        }
        ReviewBackend::Webhook => {
            let url = config.url.as_deref().ok_or_else(|| {
                ConfigError::Validation("review.backend = \"webhook\" requires review.url".into())
            })?;
            let queue = WebhookReviewQueue::new(url, Duration::from_millis(config.timeout_ms))
                .map_err(|e| ConfigError::Validation(format!("review webhook: {e}")))?;
            Ok(Arc::new(queue))
        }
    }
}
