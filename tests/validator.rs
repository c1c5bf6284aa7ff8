#[path = "validator/concurrency.rs"]
mod concurrency;
#[path = "validator/lock_guard_flow.rs"]
mod lock_guard_flow;
