use crate::models::reply::UPSTREAM_UNAVAILABLE;
use crate::models::{Action, ConversationMessage, ReplyEnvelope};

use super::{chat_with_retry, LlmProvider, Message, RetryPolicy};

pub const FALLBACK_PREAMBLE: &str =
    "You are Porter Saathi, a concise task-focused assistant for deliveries. \
     Reply briefly and politely. The driver may write in Hindi, English or a mix of both; answer in the same style.";

pub const DEGRADED_REPLY: &str = "Sorry, I couldn't process that right now.";

const FALLBACK_TEMPERATURE: f32 = 0.2;

pub async fn respond(
    llm: Option<&dyn LlmProvider>,
    history: &[ConversationMessage],
    utterance: &str,
    policy: RetryPolicy,
) -> ReplyEnvelope {
    let Some(llm) = llm else {
        return ReplyEnvelope::new(Action::Fallback, DEGRADED_REPLY);
    };

    let messages: Vec<Message> = history
        .iter()
        .map(|m| Message {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .chain(std::iter::once(Message::user(utterance)))
        .collect();

    match chat_with_retry(llm, FALLBACK_PREAMBLE, &messages, FALLBACK_TEMPERATURE, policy).await {
        Ok(text) => ReplyEnvelope::new(Action::LlmReply, text),
        Err(e) => {
            tracing::error!(error = ?e, "fallback responder unavailable");
            ReplyEnvelope::failure(UPSTREAM_UNAVAILABLE)
        }
    }
}
