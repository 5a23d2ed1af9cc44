use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::models::{EntitySet, Intent};

use super::entities;

pub struct Rule {
    pub name: &'static str,
    pub intent: Intent,
    test: fn(&str) -> bool,
}

impl Rule {
    pub fn matches(&self, normalized: &str) -> bool {
        (self.test)(normalized)
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static REMIND_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bremind(?:er)?\b|\bremind\s+me\b"));
static SCHEDULE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bschedule\b"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b\d{1,2}(?::\d{2})?\s*(?:am|pm)?\b"));
static TRACKING_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bord-[a-z0-9]+\b"));

static TOLL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"toll.*(?:cross|count|kitne|kitna|number|how many)|how many.*toll"));
static FUEL_BURNT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"fuel.*(?:burn|consum|kharch)|(?:burn|consum).*fuel"));
static FUEL_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?:petrol|diesel|fuel).*(?:price|daam|rate|kitna|kya)|(?:price|rate|daam).*(?:petrol|diesel|fuel)")
});
static FUEL_TODAY_RE: LazyLock<Regex> = LazyLock::new(|| re(r"fuel.*(?:kitna|kitne|aaj|today)"));
static TRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"trip.*(?:count|kitne|kitna|number|aaj|today|complete|kiye)|how many trips")
});
static EARNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?:earning|earned|kamai|income|paise|total|net).*(?:aaj|today)|(?:aaj|today).*(?:earning|earned|kamai|income|paise)")
});
static NET_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bnet\b"));
static CREATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"create (?:an |a )?order|place (?:an |a )?order|i want to order|new order|add order|book (?:an |a )?order")
});
static TRACK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\btrack\b|where is (?:my |the )?order|order kaha"));
static NEXT_PICKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"next pickup|next pick up|next delivery|next order|what'?s my next pickup|what is my next pickup")
});
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"list (?:my |all )?orders|show (?:my |all )?orders|recent orders"));
static CANCEL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\bcancel\b(?:\s+(?:my|the|this))?\s+(?:order\b|ord-)"));
static DELETE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(?:delete|remove)\b(?:\s+(?:my|the|this))?\s+(?:order\b|ord-)"));
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?:add|update|change|new) address|address (?:update|change)")
});
static UPDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(?:update|modify|change|mark)\b|\bassign\b"));

fn is_reminder(t: &str) -> bool {
    if REMIND_RE.is_match(t) {
        return true;
    }
    // "schedule pickup for ORD-1 at 5pm" is about the order.
    !TRACKING_RE.is_match(t) && SCHEDULE_RE.is_match(t) && TIME_RE.is_match(t)
}

fn is_net_earning(t: &str) -> bool {
    EARNING_RE.is_match(t) && NET_RE.is_match(t)
}

// Priority order. Narrower patterns must precede broader ones.
pub static RULES: &[Rule] = &[
    Rule { name: "reminder", intent: Intent::Reminder, test: is_reminder },
    Rule { name: "toll", intent: Intent::TollTaxCount, test: |t| TOLL_RE.is_match(t) },
    Rule { name: "fuel_burnt", intent: Intent::FuelBurntToday, test: |t| FUEL_BURNT_RE.is_match(t) },
    Rule { name: "fuel_price", intent: Intent::FuelPriceQuery, test: |t| FUEL_PRICE_RE.is_match(t) },
    Rule { name: "fuel_today", intent: Intent::FuelBurntToday, test: |t| FUEL_TODAY_RE.is_match(t) },
    Rule { name: "trips", intent: Intent::TripCountToday, test: |t| TRIP_RE.is_match(t) },
    Rule { name: "net_earning", intent: Intent::NetEarningToday, test: is_net_earning },
    Rule { name: "total_earning", intent: Intent::TotalEarningToday, test: |t| EARNING_RE.is_match(t) },
    Rule { name: "create", intent: Intent::CreateOrder, test: |t| CREATE_RE.is_match(t) },
    Rule { name: "track", intent: Intent::TrackOrder, test: |t| TRACK_RE.is_match(t) },
    Rule { name: "next_pickup", intent: Intent::NextPickup, test: |t| NEXT_PICKUP_RE.is_match(t) },
    Rule { name: "list", intent: Intent::ListOrders, test: |t| LIST_RE.is_match(t) },
    Rule { name: "cancel", intent: Intent::CancelOrder, test: |t| CANCEL_RE.is_match(t) },
    Rule { name: "delete", intent: Intent::DeleteOrder, test: |t| DELETE_RE.is_match(t) },
    Rule { name: "address", intent: Intent::UpdateAddress, test: |t| ADDRESS_RE.is_match(t) },
    Rule { name: "update", intent: Intent::UpdateOrder, test: |t| UPDATE_RE.is_match(t) },
];

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub rule: Option<&'static str>,
    pub entities: EntitySet,
}

impl Classification {
    // Clock-relative entities need the turn's "now".
    pub fn resolve_times(mut self, text: &str, now: NaiveDateTime) -> Self {
        if matches!(self.intent, Intent::CreateOrder | Intent::UpdateOrder)
            && entities::mentions_pickup(text)
        {
            self.entities.pickup_time = entities::extract_pickup_time(text, now);
        }
        self
    }
}

pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn classify(text: &str) -> Classification {
    let normalized = normalize(text);

    let (intent, rule) = RULES
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map(|rule| (rule.intent, Some(rule.name)))
        .unwrap_or((Intent::General, None));

    Classification {
        intent,
        rule,
        entities: inline_entities(intent, text),
    }
}

pub fn classify_as(intent: Intent, text: &str) -> Classification {
    Classification {
        intent,
        rule: None,
        entities: inline_entities(intent, text),
    }
}

// Entities that need no clock; see `resolve_times` for the rest.
fn inline_entities(intent: Intent, text: &str) -> EntitySet {
    let mut entities = EntitySet {
        tracking_id: entities::extract_tracking_id(text),
        ..Default::default()
    };
    match intent {
        Intent::UpdateOrder => {
            entities.status = entities::extract_status(text);
            entities.assignee_name = entities::extract_assignee(text);
            entities.item_delta = entities::extract_item_delta(text);
        }
        Intent::FuelPriceQuery => {
            entities.location = entities::extract_location(text);
        }
        _ => {}
    }
    entities
}
