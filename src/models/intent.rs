use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateOrder,
    TrackOrder,
    UpdateOrder,
    CancelOrder,
    DeleteOrder,
    UpdateAddress,
    NextPickup,
    ListOrders,
    TollTaxCount,
    FuelPriceQuery,
    TripCountToday,
    FuelBurntToday,
    TotalEarningToday,
    NetEarningToday,
    Reminder,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CreateOrder => "create_order",
            Intent::TrackOrder => "track_order",
            Intent::UpdateOrder => "update_order",
            Intent::CancelOrder => "cancel_order",
            Intent::DeleteOrder => "delete_order",
            Intent::UpdateAddress => "update_address",
            Intent::NextPickup => "next_pickup",
            Intent::ListOrders => "list_orders",
            Intent::TollTaxCount => "toll_tax_count",
            Intent::FuelPriceQuery => "fuel_price_query",
            Intent::TripCountToday => "trip_count_today",
            Intent::FuelBurntToday => "fuel_burnt_today",
            Intent::TotalEarningToday => "total_earning_today",
            Intent::NetEarningToday => "net_earning_today",
            Intent::Reminder => "reminder",
            Intent::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "op", content = "item")]
pub enum ItemEdit {
    Add(String),
    Remove(String),
}

// Best-effort entities; `None` means "not mentioned", never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntitySet {
    pub tracking_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub assignee_name: Option<String>,
    pub pickup_time: Option<NaiveDateTime>,
    pub item_delta: Vec<ItemEdit>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub text: String,
    pub user_id: String,
    pub received_at: DateTime<Utc>,
}

impl Utterance {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: user_id.into(),
            received_at: Utc::now(),
        }
    }

    pub fn local_now(&self) -> NaiveDateTime {
        self.received_at.with_timezone(&Local).naive_local()
    }
}
