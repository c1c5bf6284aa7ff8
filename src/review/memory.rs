use super::{ReviewQueue, ReviewTicket};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Keeps the most recent tickets in process. Lost on restart.
pub struct InMemoryReviewQueue {
    tickets: Mutex<VecDeque<ReviewTicket>>,
    max_tickets: usize,
}

impl Default for InMemoryReviewQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReviewQueue {
    pub fn new() -> Self {
        Self::with_max_tickets(crate::config::ReviewConfig::default().max_tickets)
    }

    /// Bounded queue; a limit of zero is treated as one.
    pub fn with_max_tickets(max_tickets: usize) -> Self {
        Self {
            tickets: Mutex::new(VecDeque::new()),
            max_tickets: max_tickets.max(1),
        }
    }

    /// Retained tickets, oldest first.
    pub fn tickets(&self) -> Vec<ReviewTicket> {
        self.tickets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tickets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReviewQueue for InMemoryReviewQueue {
    fn name(&self) -> &str {
        "memory"
    }

    fn submit<'a>(
        &'a self,
        ticket: &'a ReviewTicket,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut tickets = self
                .tickets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            while tickets.len() >= self.max_tickets {
                if let Some(dropped) = tickets.pop_front() {
                    tracing::warn!(
                        ticket_id = %dropped.ticket_id,
                        request_id = %dropped.request_id,
                        "review queue full; dropping oldest ticket"
                    );
                }
            }
            tickets.push_back(ticket.clone());
            Ok(())
        })
    }
}
