use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Intent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    AwaitingInput,
    NeedsClarification,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::AwaitingInput => "awaiting_input",
            ConversationState::NeedsClarification => "needs_clarification",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    TrackingId,
    Address,
    Assignee,
    ReminderTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingClarification {
    pub intent: Intent,
    pub slot: Slot,
    pub utterance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub user_id: String,
    pub messages: Vec<ConversationMessage>,
    pub pending: Option<PendingClarification>,
    pub last_activity: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl Conversation {
    pub fn new(user_id: &str, now: NaiveDateTime, ttl: chrono::Duration) -> Self {
        Self {
            user_id: user_id.to_string(),
            messages: vec![],
            pending: None,
            last_activity: now,
            expires_at: now + ttl,
        }
    }

    pub fn state(&self) -> ConversationState {
        if self.pending.is_some() {
            ConversationState::NeedsClarification
        } else {
            ConversationState::AwaitingInput
        }
    }

    pub fn push(&mut self, role: Role, content: &str) {
        self.messages.push(ConversationMessage {
            role,
            content: content.to_string(),
        });
    }

    pub fn window(&self, n: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn truncate_to(&mut self, max: usize) {
        if self.messages.len() > max {
            let excess = self.messages.len() - max;
            self.messages.drain(..excess);
        }
    }
}
