//! Answer generation with model fallback and rate-limit backoff

use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::{CompletionRequest, LlmProvider};

use super::prompt::PromptBuilder;
use super::retry::{decide, RetryDecision};

/// Model selection and retry budget for one answer
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model used for the first attempt
    pub primary_model: String,
    /// Model used for every later attempt
    pub fallback_model: String,
    /// Attempt budget
    pub max_retries: u32,
    /// Base backoff delay
    pub base_delay: Duration,
    /// Sampling temperature
    pub temperature: f32,
    /// Output length cap
    pub max_tokens: u32,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Produces an answer from context blocks and a question
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    /// Create a new generator
    pub fn new(llm: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { llm, settings }
    }

    /// Generate an answer, falling back and backing off per [`decide`]
    pub async fn generate(&self, context: &[String], question: &str) -> Result<String> {
        let messages = PromptBuilder::build_messages(context, question);
        let max_retries = self.settings.max_retries;
        let mut last_error = None;

        for attempt in 0..max_retries {
            let model = if attempt == 0 {
                &self.settings.primary_model
            } else {
                &self.settings.fallback_model
            };

            let request = CompletionRequest {
                model: model.clone(),
                messages: messages.clone(),
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
            };

            let error = match self.llm.chat(request).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            match decide(attempt, max_retries, self.settings.base_delay, &error) {
                RetryDecision::Continue => {
                    tracing::warn!(
                        "{} failed on model {} ({}), switching to {}",
                        self.llm.name(),
                        model,
                        error,
                        self.settings.fallback_model
                    );
                }
                RetryDecision::BackoffThen(delay) => {
                    tracing::warn!(
                        "Rate limited on attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Fail(e) => return Err(e),
            }

            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| Error::generation("No generation attempts were made")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// LLM that replays scripted outcomes and records the models it saw
    struct ScriptedLlm {
        outcomes: Mutex<VecDeque<Result<String>>>,
        models: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(outcomes: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                models: Mutex::new(Vec::new()),
            })
        }

        fn models(&self) -> Vec<String> {
            self.models.lock().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn chat(&self, request: CompletionRequest) -> Result<String> {
            self.models.lock().push(request.model);
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::generation("script exhausted")))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn settings(max_retries: u32) -> GenerationSettings {
        GenerationSettings {
            primary_model: "primary".to_string(),
            fallback_model: "fallback".to_string(),
            max_retries,
            base_delay: Duration::from_secs(1),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    fn context() -> Vec<String> {
        vec!["Content: The sky is blue.\nSource: sky.txt".to_string()]
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let llm = ScriptedLlm::new(vec![Ok("Blue.".to_string())]);
        let generator = AnswerGenerator::new(llm.clone(), settings(3));

        let answer = generator.generate(&context(), "What color is the sky?").await.unwrap();
        assert_eq!(answer, "Blue.");
        assert_eq!(llm.models(), vec!["primary"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backs_off_then_succeeds() {
        let llm = ScriptedLlm::new(vec![
            Err(Error::RateLimited("429".to_string())),
            Ok("Blue.".to_string()),
        ]);
        let generator = AnswerGenerator::new(llm.clone(), settings(3));

        let start = tokio::time::Instant::now();
        let answer = generator.generate(&context(), "Sky?").await.unwrap();
        let waited = start.elapsed();

        assert_eq!(answer, "Blue.");
        assert!(waited >= Duration::from_secs(1));
        assert!(waited < Duration::from_secs(2));
        assert_eq!(llm.models(), vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_quota_stops_after_two_attempts() {
        let llm = ScriptedLlm::new(vec![
            Err(Error::QuotaExceeded("primary".to_string())),
            Err(Error::QuotaExceeded("fallback".to_string())),
            Ok("never reached".to_string()),
        ]);
        let generator = AnswerGenerator::new(llm.clone(), settings(5));

        let err = generator.generate(&context(), "Sky?").await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded(ref m) if m == "quota exceeded for all models"));
        assert_eq!(llm.models(), vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn test_quota_then_fallback_succeeds() {
        let llm = ScriptedLlm::new(vec![
            Err(Error::QuotaExceeded("primary".to_string())),
            Ok("From fallback.".to_string()),
        ]);
        let generator = AnswerGenerator::new(llm.clone(), settings(3));

        let answer = generator.generate(&context(), "Sky?").await.unwrap();
        assert_eq!(answer, "From fallback.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausts_budget() {
        let llm = ScriptedLlm::new(vec![
            Err(Error::RateLimited("429".to_string())),
            Err(Error::RateLimited("429".to_string())),
            Err(Error::RateLimited("429".to_string())),
        ]);
        let generator = AnswerGenerator::new(llm.clone(), settings(3));

        let start = tokio::time::Instant::now();
        let err = generator.generate(&context(), "Sky?").await.unwrap_err();

        assert!(matches!(err, Error::RateLimited(_)));
        assert_eq!(llm.models().len(), 3);
        // 1s + 2s of backoff, none after the final attempt
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_other_error_fails_immediately() {
        let llm = ScriptedLlm::new(vec![Err(Error::generation("HTTP 400: bad request"))]);
        let generator = AnswerGenerator::new(llm.clone(), settings(3));

        let err = generator.generate(&context(), "Sky?").await.unwrap_err();
        match err {
            Error::Generation(msg) => assert!(msg.contains("bad request")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(llm.models().len(), 1);
    }
}
