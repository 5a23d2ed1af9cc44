use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::models::{ItemEdit, OrderStatus};

static TRACKING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bORD-[A-Z0-9]+\b").unwrap());

static ASSIGN_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bassign\b").unwrap());

static ASSIGNEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bassign(?:\s+to)?\s+([^\n.!?;,]+)").unwrap());

static NAME_STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:and\s+)?(?:add|remove|status|pick\s?up|with|at)\b|\s+and\s*$").unwrap()
});

static CLOCK_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").unwrap()
});

static PICKUP_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpick\s?up\b").unwrap());

static REMINDER_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:remind(?:er)?|schedule)\b").unwrap());

static ITEM_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(add|remove)\b").unwrap());

static ITEM_SENTINEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:add|remove|status|assign|pick\s?up)\b").unwrap());

static ITEM_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\s+and\s+").unwrap());

static LOCATION_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:in|at)\s+([a-z]+)").unwrap());

static LOCATION_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z]+)\s+(?:mein|me)\b").unwrap());

const NOT_A_PLACE: &[&str] = &[
    "for", "the", "to", "ka", "ki", "ke", "hai", "kya", "price", "rate", "daam", "petrol",
    "diesel", "fuel", "batao", "tell", "today", "aaj",
];

static ADDRESS_CONNECTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:(?:to|is)\b|:)\s*").unwrap());

pub fn extract_tracking_id(text: &str) -> Option<String> {
    TRACKING_ID_RE
        .find(text)
        .map(|m| m.as_str().to_uppercase())
}

// Containment test in a fixed order: delivered, then processing, then shipped.
pub fn extract_status(text: &str) -> Option<OrderStatus> {
    let lower = text.to_lowercase();
    [
        ("delivered", OrderStatus::Delivered),
        ("processing", OrderStatus::Processing),
        ("shipped", OrderStatus::Shipped),
    ]
    .into_iter()
    .find(|(word, _)| contains_word(&lower, word))
    .map(|(_, status)| status)
}

pub fn mentions_assign(text: &str) -> bool {
    ASSIGN_KEYWORD_RE.is_match(text)
}

pub fn extract_assignee(text: &str) -> Option<String> {
    let mut captured = ASSIGNEE_RE.captures(text)?.get(1)?.as_str().trim();
    // "assign ORD-1 to Priya"
    if let Some(id) = TRACKING_ID_RE.find(captured).filter(|m| m.start() == 0) {
        captured = strip_leading_word(captured[id.end()..].trim(), "to");
    }
    let name = match NAME_STOP_RE.find(captured) {
        Some(stop) => &captured[..stop.start()],
        None => captured,
    };
    let name = name.trim();
    // A tracking code is not a person.
    if name.is_empty() || TRACKING_ID_RE.is_match(name) {
        return None;
    }
    Some(name.to_string())
}

pub fn parse_clock_time(hour: u32, minute: u32, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour = match meridiem.map(|m| m.to_lowercase()) {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (m.as_str(), hour) {
                ("pm", 12) => 12,
                ("pm", h) => h + 12,
                ("am", 12) => 0,
                (_, h) => h,
            }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn resolve_clock_time(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let candidate = now.date().and_time(time);
    if candidate < now {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}

// Clock expression in `text`, resolved against `now`. The last one written
// with minutes or am/pm wins; otherwise the last bare number, so counts like
// "3 customers" before "at 6 pm" are not read as the time.
pub fn extract_clock_time(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let id_spans: Vec<(usize, usize)> = TRACKING_ID_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut qualified = None;
    let mut bare = None;
    for caps in CLOCK_TIME_RE.captures_iter(text) {
        let Some(hour_match) = caps.get(1) else {
            continue;
        };
        if id_spans
            .iter()
            .any(|(start, end)| (*start..*end).contains(&hour_match.start()))
        {
            continue;
        }
        let Ok(hour) = hour_match.as_str().parse::<u32>() else {
            continue;
        };
        let minute = match caps.get(2).map(|m| m.as_str().parse::<u32>()) {
            Some(Ok(m)) => m,
            Some(Err(_)) => continue,
            None => 0,
        };
        let meridiem = caps.get(3).map(|m| m.as_str());
        let Some(time) = parse_clock_time(hour, minute, meridiem) else {
            continue;
        };

        if caps.get(2).is_some() || meridiem.is_some() {
            qualified = Some(time);
        } else {
            bare = Some(time);
        }
    }

    qualified.or(bare).map(|time| resolve_clock_time(time, now))
}

pub fn mentions_pickup(text: &str) -> bool {
    PICKUP_KEYWORD_RE.is_match(text)
}

pub fn extract_pickup_time(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    match PICKUP_KEYWORD_RE.find(text) {
        Some(keyword) => extract_clock_time(&text[keyword.end()..], now),
        None => extract_clock_time(text, now),
    }
}

pub fn extract_reminder_time(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let keyword = REMINDER_KEYWORD_RE.find(text)?;
    extract_clock_time(&text[keyword.end()..], now)
}

pub fn extract_item_delta(text: &str) -> Vec<ItemEdit> {
    let mut edits = Vec::new();

    for caps in ITEM_KEYWORD_RE.captures_iter(text) {
        let (Some(keyword), Some(whole)) = (caps.get(1), caps.get(0)) else {
            continue;
        };
        let rest = &text[whole.end()..];
        let segment = match ITEM_SENTINEL_RE.find(rest) {
            Some(stop) => &rest[..stop.start()],
            None => rest,
        };

        let is_add = keyword.as_str().eq_ignore_ascii_case("add");
        for token in ITEM_SPLIT_RE.split(segment) {
            let token = token
                .trim()
                .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ';'))
                .trim();
            let token = strip_leading_word(token, "and");
            if token.is_empty() {
                continue;
            }
            edits.push(if is_add {
                ItemEdit::Add(token.to_string())
            } else {
                ItemEdit::Remove(token.to_string())
            });
        }
    }

    edits
}

pub fn apply_item_delta(current: &str, edits: &[ItemEdit]) -> String {
    let mut items: Vec<String> = current
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    for edit in edits {
        match edit {
            ItemEdit::Add(item) => items.push(item.clone()),
            ItemEdit::Remove(token) => {
                let token = token.to_lowercase();
                items.retain(|entry| {
                    let entry = entry.to_lowercase();
                    entry != token && !contains_word(&entry, &token)
                });
            }
        }
    }

    items.join(", ")
}

pub fn extract_location(text: &str) -> Option<String> {
    [&*LOCATION_BEFORE_RE, &*LOCATION_AFTER_RE]
        .into_iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|word| !NOT_A_PLACE.contains(&word.to_lowercase().as_str()))
        .map(capitalize)
}

pub fn extract_address_after_id(text: &str) -> Option<String> {
    let id = TRACKING_ID_RE.find(text)?;
    let mut rest = text[id.end()..].trim();
    // Connectors may stack, as in "to: MG Road".
    while let Some(connector) = ADDRESS_CONNECTOR_RE.find(rest) {
        rest = rest[connector.end()..].trim();
    }
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let pattern = format!(r"\b{}\b", regex::escape(word));
    Regex::new(&pattern)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

fn strip_leading_word<'a>(s: &'a str, word: &str) -> &'a str {
    match s.split_once(char::is_whitespace) {
        Some((first, rest)) if first.eq_ignore_ascii_case(word) => rest.trim(),
        None if s.eq_ignore_ascii_case(word) => "",
        _ => s,
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}
