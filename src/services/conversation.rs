use std::sync::Arc;

use crate::models::reply::{INTERNAL_ERROR, UPSTREAM_UNAVAILABLE};
use crate::models::{Conversation, Intent, PendingClarification, ReplyEnvelope, Role, Slot, Utterance};
use crate::services::ai::{fallback, RetryPolicy};
use crate::services::intents::{self, Turn};
use crate::services::nlu::{self, entities, Classification};
use crate::state::AppState;

// Runs the turn on its own task so that a panic still yields a reply.
pub async fn handle_turn(state: Arc<AppState>, utterance: Utterance) -> ReplyEnvelope {
    let user_id = utterance.user_id.clone();
    let task = tokio::spawn(async move { process_message(&state, utterance).await });

    match task.await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "turn task failed");
            ReplyEnvelope::failure(INTERNAL_ERROR)
        }
    }
}

pub async fn process_message(state: &Arc<AppState>, utterance: Utterance) -> ReplyEnvelope {
    let _turn_lock = state.sessions.acquire(&utterance.user_id).await;

    let now = utterance.local_now();
    let text = utterance.text.trim();
    let mut conv = state.sessions.load(&utterance.user_id, now);

    let (classification, effective_text, resumed) = match resume_pending(state, &conv, text, now) {
        Some((c, composed)) => (c, composed, true),
        None => (nlu::classify(text), text.to_string(), false),
    };
    let classification = classification.resolve_times(&effective_text, now);

    tracing::info!(
        user_id = %utterance.user_id,
        intent = %classification.intent,
        rule = classification.rule.unwrap_or("-"),
        state = conv.state().as_str(),
        resumed,
        "processing message"
    );

    let envelope = if classification.intent == Intent::General {
        fallback::respond(
            state.llm.as_deref(),
            conv.window(state.config.history_window),
            text,
            RetryPolicy::from_config(&state.config),
        )
        .await
    } else {
        let turn = Turn {
            state: state.as_ref(),
            user_id: &utterance.user_id,
            text: &effective_text,
            now,
        };
        match intents::dispatch(&turn, &classification).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    user_id = %utterance.user_id,
                    intent = %classification.intent,
                    error = ?e,
                    "intent handler failed"
                );
                ReplyEnvelope::failure(UPSTREAM_UNAVAILABLE)
            }
        }
    };

    conv.pending = pending_after(state, &classification, &effective_text, &envelope);

    tracing::info!(
        user_id = %utterance.user_id,
        action = %envelope.action,
        tracking_id = envelope.tracking_id.as_deref().unwrap_or("-"),
        awaiting = conv.pending.is_some(),
        "reply ready"
    );

    conv.push(Role::User, text);
    conv.push(Role::Assistant, &envelope.reply);
    state.sessions.save(&mut conv, now);

    envelope
}

fn resume_pending(
    state: &AppState,
    conv: &Conversation,
    text: &str,
    now: chrono::NaiveDateTime,
) -> Option<(Classification, String)> {
    if !state.config.resume_pending_clarification {
        return None;
    }
    let pending = conv.pending.as_ref()?;
    if nlu::classify(text).intent != Intent::General {
        return None;
    }

    let composed = compose_answer(pending, text, now)?;
    Some((nlu::classify_as(pending.intent, &composed), composed))
}

fn compose_answer(
    pending: &PendingClarification,
    answer: &str,
    now: chrono::NaiveDateTime,
) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    let original = &pending.utterance;
    match pending.slot {
        Slot::TrackingId => {
            entities::extract_tracking_id(answer).map(|id| format!("{original} {id}"))
        }
        Slot::Address => {
            (!is_question(answer)).then(|| format!("{original} {answer}"))
        }
        Slot::Assignee => {
            let name = answer
                .strip_prefix("to ")
                .or_else(|| answer.strip_prefix("To "))
                .unwrap_or(answer)
                .trim()
                .trim_end_matches('.');
            looks_like_name(name).then(|| format!("{original} to {name}"))
        }
        Slot::ReminderTime => entities::extract_clock_time(answer, now)
            .is_some()
            .then(|| format!("{original} at {answer}")),
    }
}

const MAX_NAME_WORDS: usize = 4;

// Openers of chit-chat and questions, never of an address or a name.
const CHATTER_OPENERS: &[&str] = &[
    "what", "how", "why", "who", "where", "when", "which", "tell", "can", "could", "would",
    "should", "is", "are", "do", "does", "will", "please", "hi", "hello", "hey", "thanks",
    "thank", "ok", "okay", "yes", "kya", "kaise", "kaun", "kab", "kahan", "kyun", "batao",
];

fn opens_with_chatter(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .is_some_and(|w| CHATTER_OPENERS.contains(&w.as_str()))
}

fn is_question(text: &str) -> bool {
    text.contains('?') || opens_with_chatter(text)
}

fn looks_like_name(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    !words.is_empty()
        && words.len() <= MAX_NAME_WORDS
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_alphabetic() || c == '.' || c == '\''))
        && !is_question(text)
}

fn pending_after(
    state: &AppState,
    classification: &Classification,
    effective_text: &str,
    envelope: &ReplyEnvelope,
) -> Option<PendingClarification> {
    if !state.config.resume_pending_clarification {
        return None;
    }
    envelope.action.awaited_slot().map(|slot| PendingClarification {
        intent: classification.intent,
        slot,
        utterance: effective_text.to_string(),
    })
}
