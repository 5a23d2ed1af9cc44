use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub tracking_id: String,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub item: String,
    pub qty: i64,
    pub status: OrderStatus,
    pub pickup_time: Option<NaiveDateTime>,
    pub assigned_to: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Assigned,
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "assigned" => OrderStatus::Assigned,
            "pending" => OrderStatus::Pending,
            "processing" => OrderStatus::Processing,
            "shipped" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Created,
        }
    }

    pub fn awaiting_pickup() -> [OrderStatus; 3] {
        [OrderStatus::Created, OrderStatus::Assigned, OrderStatus::Pending]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub tracking_id: String,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub item: String,
    pub qty: i64,
    pub status: OrderStatus,
    pub pickup_time: Option<NaiveDateTime>,
    pub assigned_to: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub item: Option<String>,
    pub qty: Option<i64>,
    pub status: Option<OrderStatus>,
    pub pickup_time: Option<NaiveDateTime>,
    pub assigned_to: Option<String>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.address.is_none()
            && self.item.is_none()
            && self.qty.is_none()
            && self.status.is_none()
            && self.pickup_time.is_none()
            && self.assigned_to.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub customer_name: Option<String>,
    pub assigned_to: Option<String>,
}

const TRACKING_SUFFIX_LEN: usize = 6;

pub fn generate_tracking_id(now_millis: i64) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TRACKING_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("ORD-{}{}", to_base36(now_millis.max(0) as u64), suffix).to_uppercase()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_tracking_id_format() {
        let id = generate_tracking_id(1_700_000_000_000);
        assert!(id.starts_with("ORD-LOYW3V28"));
        assert_eq!(id.len(), "ORD-".len() + 8 + TRACKING_SUFFIX_LEN);
        assert_eq!(id, id.to_uppercase());
        assert!(id[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_status_round_trip_names() {
        for s in ["created", "assigned", "pending", "processing", "shipped", "delivered", "cancelled"] {
            assert_eq!(OrderStatus::parse(s).as_str(), s);
        }
        assert_eq!(OrderStatus::parse("garbage"), OrderStatus::Created);
    }

    #[test]
    fn test_empty_update() {
        assert!(OrderUpdate::default().is_empty());
        let update = OrderUpdate {
            status: Some(OrderStatus::Shipped),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
