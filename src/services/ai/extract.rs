use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::Value;

use super::{chat_with_retry, LlmProvider, Message, RetryPolicy};

const EXTRACTOR_PROMPT: &str = r#"You turn a delivery request into order fields.

Return ONLY valid JSON (no markdown, no explanation) with exactly these keys:
{
  "customerName": "name or null",
  "address": "delivery address or null",
  "item": "what is being shipped",
  "qty": 1,
  "pickupTime": "ISO 8601 date-time or null"
}

Use null for anything the message does not say. qty is an integer."#;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedOrderFields {
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub item: String,
    pub qty: i64,
    pub pickup_time: Option<NaiveDateTime>,
}

impl ExtractedOrderFields {
    pub fn echo(text: &str) -> Self {
        Self {
            customer_name: None,
            address: None,
            item: text.to_string(),
            qty: 1,
            pickup_time: None,
        }
    }
}

// Never fails: any collaborator problem degrades to the echo.
pub async fn extract_order_fields(
    llm: Option<&dyn LlmProvider>,
    text: &str,
    policy: RetryPolicy,
) -> ExtractedOrderFields {
    let Some(llm) = llm else {
        return ExtractedOrderFields::echo(text);
    };

    let prompt = format!("Extract order details from this message: \"\"\"{text}\"\"\"");
    match chat_with_retry(llm, EXTRACTOR_PROMPT, &[Message::user(prompt)], 0.0, policy).await {
        Ok(response) => parse_extractor_response(&response, text),
        Err(e) => {
            tracing::warn!(error = %e, "order field extraction failed, echoing input");
            ExtractedOrderFields::echo(text)
        }
    }
}

fn parse_extractor_response(response: &str, text: &str) -> ExtractedOrderFields {
    let Some(value) = find_json_object(response) else {
        tracing::warn!("extractor reply was not JSON, echoing input");
        return ExtractedOrderFields::echo(text);
    };

    ExtractedOrderFields {
        customer_name: non_empty_str(&value["customerName"]),
        address: non_empty_str(&value["address"]),
        item: non_empty_str(&value["item"]).unwrap_or_else(|| text.to_string()),
        qty: parse_qty(&value["qty"]).unwrap_or(1),
        pickup_time: non_empty_str(&value["pickupTime"]).and_then(|s| parse_datetime(&s)),
    }
}

fn find_json_object(response: &str) -> Option<Value> {
    let cleaned = response.trim();
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return Some(v);
    }

    // Models like to wrap JSON in a fenced block.
    let unfenced = cleaned
        .strip_prefix("```json")
        .or_else(|| cleaned.strip_prefix("```"))
        .unwrap_or(cleaned);
    let unfenced = unfenced.strip_suffix("```").unwrap_or(unfenced).trim();
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(unfenced) {
        return Some(v);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&unfenced[start..=end]) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn parse_qty(value: &Value) -> Option<i64> {
    let qty = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (qty > 0).then_some(qty)
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
