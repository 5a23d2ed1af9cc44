use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Order, Slot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreatedOrder,
    TrackOrder,
    OrderNotFound,
    NextPickup,
    NoPickups,
    ListOrders,
    CancelOrder,
    DeleteOrder,
    UpdateOrder,
    UpdateAddress,
    AskForOrderId,
    AskForAddress,
    AskForAssignee,
    AskForUpdateFields,
    AskForReminderTime,
    SetReminder,
    TollTaxCount,
    FuelPriceQuery,
    TripCountToday,
    FuelBurntToday,
    TotalEarningToday,
    NetEarningToday,
    LlmReply,
    Fallback,
    Error,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreatedOrder => "created_order",
            Action::TrackOrder => "track_order",
            Action::OrderNotFound => "order_not_found",
            Action::NextPickup => "next_pickup",
            Action::NoPickups => "no_pickups",
            Action::ListOrders => "list_orders",
            Action::CancelOrder => "cancel_order",
            Action::DeleteOrder => "delete_order",
            Action::UpdateOrder => "update_order",
            Action::UpdateAddress => "update_address",
            Action::AskForOrderId => "ask_for_order_id",
            Action::AskForAddress => "ask_for_address",
            Action::AskForAssignee => "ask_for_assignee",
            Action::AskForUpdateFields => "ask_for_update_fields",
            Action::AskForReminderTime => "ask_for_reminder_time",
            Action::SetReminder => "set_reminder",
            Action::TollTaxCount => "toll_tax_count",
            Action::FuelPriceQuery => "fuel_price_query",
            Action::TripCountToday => "trip_count_today",
            Action::FuelBurntToday => "fuel_burnt_today",
            Action::TotalEarningToday => "total_earning_today",
            Action::NetEarningToday => "net_earning_today",
            Action::LlmReply => "llm_reply",
            Action::Fallback => "fallback",
            Action::Error => "error",
        }
    }

    pub fn awaited_slot(&self) -> Option<Slot> {
        match self {
            Action::AskForOrderId => Some(Slot::TrackingId),
            Action::AskForAddress => Some(Slot::Address),
            Action::AskForAssignee => Some(Slot::Assignee),
            Action::AskForReminderTime => Some(Slot::ReminderTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub fire_at: NaiveDateTime,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    pub reply: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
pub const INTERNAL_ERROR: &str = "internal_error";

const APOLOGY: &str = "Sorry, I'm having trouble right now. Please try again in a moment.";

impl ReplyEnvelope {
    pub fn new(action: Action, reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            action,
            order: None,
            orders: None,
            tracking_id: None,
            reminder: None,
            data: None,
            error: None,
        }
    }

    // Safe reply for a turn that failed; `code` never carries collaborator text.
    pub fn failure(code: &str) -> Self {
        Self::new(Action::Error, APOLOGY).with_error(code)
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.tracking_id = Some(order.tracking_id.clone());
        self.order = Some(order);
        self
    }

    pub fn with_orders(mut self, orders: Vec<Order>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = Some(tracking_id.into());
        self
    }

    pub fn with_reminder(mut self, reminder: Reminder) -> Self {
        self.reminder = Some(reminder);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, code: &str) -> Self {
        self.error = Some(code.to_string());
        self
    }
}
