//! Answer generation with model fallback and retry policy

pub mod generator;
pub mod prompt;
pub mod retry;

pub use generator::{AnswerGenerator, GenerationSettings};
pub use prompt::{build_context_blocks, PromptBuilder, SYSTEM_PROMPT};
pub use retry::{decide, RetryDecision};
