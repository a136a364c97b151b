pub mod huggingface;
pub mod tts;

pub use huggingface::{ImageClient, RetryPolicy};
pub use tts::Narrator;
