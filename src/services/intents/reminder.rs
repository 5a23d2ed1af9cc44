use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::models::{Action, Reminder, ReplyEnvelope};
use crate::services::nlu::entities;

static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bto\s+(.+?)\s*[.!?]*$").unwrap());

static TRAILING_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:at\s+)?\d{1,2}(?::\d{2})?\s*(?:am|pm)?$").unwrap()
});

pub fn set_reminder(text: &str, now: NaiveDateTime) -> ReplyEnvelope {
    let Some(fire_at) = entities::extract_reminder_time(text, now) else {
        return ReplyEnvelope::new(
            Action::AskForReminderTime,
            "What time should I remind you?",
        );
    };

    let task = reminder_task(text);
    let when = fire_at.format("%-I:%M %p");
    let reply = match &task {
        Some(task) => format!("Okay, I'll remind you at {when} to {task}."),
        None => format!("Okay, I'll remind you at {when}."),
    };

    ReplyEnvelope::new(Action::SetReminder, reply).with_reminder(Reminder {
        fire_at,
        text: task.unwrap_or_else(|| text.trim().to_string()),
    })
}

fn reminder_task(text: &str) -> Option<String> {
    let task = TASK_RE.captures(text)?.get(1)?.as_str();
    let task = TRAILING_TIME_RE.replace(task, "");
    let task = task.trim();
    (!task.is_empty()).then(|| task.to_string())
}
