pub mod client;
pub mod retry;

pub use client::{ChatCompletion, LlmClient, LlmResponse};
pub use retry::{Backoff, RetryPolicy};
