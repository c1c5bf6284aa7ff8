mod factory;
mod jsonl;
mod memory;
mod none;
mod traits;
mod webhook;


pub use factory::create_review_queue;
pub use jsonl::JsonlReviewQueue;
pub use memory::InMemoryReviewQueue;
pub use none::NoopReviewQueue;
pub use traits::{ReviewQueue, ReviewTicket};
pub use webhook::WebhookReviewQueue;
