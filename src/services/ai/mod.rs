pub mod extract;
pub mod fallback;
pub mod groq;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
        temperature: f32,
    ) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.llm_timeout_secs),
            max_retries: config.llm_max_retries,
            backoff: Duration::from_millis(500),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub async fn chat_with_retry(
    llm: &dyn LlmProvider,
    system_prompt: &str,
    messages: &[Message],
    temperature: f32,
    policy: RetryPolicy,
) -> anyhow::Result<String> {
    let mut attempt = 0;
    loop {
        let outcome = tokio::time::timeout(
            policy.timeout,
            llm.chat(system_prompt, messages, temperature),
        )
        .await;

        let err = match outcome {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => e,
            Err(_) => anyhow::anyhow!("LLM call timed out after {:?}", policy.timeout),
        };

        if attempt >= policy.max_retries {
            return Err(err.context(format!("LLM call failed after {} attempts", attempt + 1)));
        }

        attempt += 1;
        tracing::warn!(
            attempt,
            max_retries = policy.max_retries,
            error = %err,
            "LLM call failed, retrying"
        );
        tokio::time::sleep(policy.backoff).await;
    }
}
