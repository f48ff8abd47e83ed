//! Prompt templates for document-grounded answers

use crate::providers::ChatMessage;
use crate::types::ScoredChunk;

/// Fixed system instruction
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using only \
the provided context. If the answer cannot be found in the context, say so clearly.";

/// Prompt builder for chat requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// One context block per retrieved chunk, in result order
    pub fn build_context_blocks(results: &[ScoredChunk]) -> Vec<String> {
        results
            .iter()
            .map(|r| format!("Content: {}\nSource: {}", r.metadata.content, r.metadata.filename))
            .collect()
    }

    /// User message carrying the context and the question
    pub fn build_user_message(context: &[String], question: &str) -> String {
        format!("Context:\n{}\n\nQuestion: {}", context.join("\n\n"), question)
    }

    /// System + user messages for one generation attempt
    pub fn build_messages(context: &[String], question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_user_message(context, question)),
        ]
    }
}

/// Shorthand for [`PromptBuilder::build_context_blocks`]
pub fn build_context_blocks(results: &[ScoredChunk]) -> Vec<String> {
    PromptBuilder::build_context_blocks(results)
}
