use super::{ReviewQueue, ReviewTicket};
use std::future::Future;
use std::pin::Pin;

/// Discards tickets. Quarantined requests are only visible in the logs.
pub struct NoopReviewQueue;

impl ReviewQueue for NoopReviewQueue {
    fn name(&self) -> &str {
        "none"
    }

    fn submit<'a>(
        &'a self,
        ticket: &'a ReviewTicket,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(request_id = %ticket.request_id, "review queue disabled; ticket dropped");
            Ok(())
        })
    }
}
