use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Conversation, NewOrder, Order, OrderFilter, OrderStatus, OrderUpdate, PendingClarification,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ORDER_COLUMNS: &str = "id, tracking_id, customer_name, address, item, qty, status, pickup_time, assigned_to, metadata, created_at, updated_at";

fn ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).ok()
}

// ── Conversations ──

pub fn get_conversation(
    conn: &Connection,
    user_id: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<Conversation>> {
    let row = conn
        .query_row(
            "SELECT user_id, data, last_activity, expires_at FROM conversations WHERE user_id = ?1 AND expires_at > ?2",
            params![user_id, ts(now)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((user_id, data_json, last_activity_str, expires_at_str)) = row else {
        return Ok(None);
    };

    let data: serde_json::Value =
        serde_json::from_str(&data_json).unwrap_or(serde_json::json!({}));
    let messages = data
        .get("messages")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let pending: Option<PendingClarification> = data
        .get("pending")
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    Ok(Some(Conversation {
        user_id,
        messages,
        pending,
        last_activity: parse_ts(&last_activity_str).unwrap_or(*now),
        expires_at: parse_ts(&expires_at_str).unwrap_or(*now),
    }))
}

pub fn save_conversation(conn: &Connection, conv: &Conversation) -> anyhow::Result<()> {
    let data = serde_json::json!({
        "messages": conv.messages,
        "pending": conv.pending,
    });
    let data_json = serde_json::to_string(&data)?;

    conn.execute(
        "INSERT INTO conversations (user_id, data, state, last_activity, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
           data = excluded.data,
           state = excluded.state,
           last_activity = excluded.last_activity,
           expires_at = excluded.expires_at",
        params![
            conv.user_id,
            data_json,
            conv.state().as_str(),
            ts(&conv.last_activity),
            ts(&conv.expires_at),
        ],
    )?;
    Ok(())
}

pub fn expire_old_conversations(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM conversations WHERE expires_at <= ?1",
        params![ts(now)],
    )?;
    Ok(count)
}

// ── Orders ──

pub fn insert_order(conn: &Connection, id: &str, order: &NewOrder) -> anyhow::Result<()> {
    let now = ts(&Utc::now().naive_utc());
    let metadata = order
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO orders (id, tracking_id, customer_name, address, item, qty, status, pickup_time, assigned_to, metadata, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            id,
            order.tracking_id,
            order.customer_name,
            order.address,
            order.item,
            order.qty,
            order.status.as_str(),
            order.pickup_time.as_ref().map(ts),
            order.assigned_to,
            metadata,
            now,
        ],
    )?;
    Ok(())
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let order = conn
        .query_row(&sql, params![id], |row| Ok(parse_order_row(row)))
        .optional()?;
    order.transpose()
}

pub fn get_order_by_tracking_id(
    conn: &Connection,
    tracking_id: &str,
) -> anyhow::Result<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE tracking_id = ?1");
    let order = conn
        .query_row(&sql, params![tracking_id], |row| Ok(parse_order_row(row)))
        .optional()?;
    order.transpose()
}

pub fn update_order(conn: &Connection, id: &str, update: &OrderUpdate) -> anyhow::Result<bool> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(v) = &update.customer_name {
        sets.push("customer_name");
        values.push(Box::new(v.clone()));
    }
    if let Some(v) = &update.address {
        sets.push("address");
        values.push(Box::new(v.clone()));
    }
    if let Some(v) = &update.item {
        sets.push("item");
        values.push(Box::new(v.clone()));
    }
    if let Some(v) = update.qty {
        sets.push("qty");
        values.push(Box::new(v));
    }
    if let Some(v) = update.status {
        sets.push("status");
        values.push(Box::new(v.as_str()));
    }
    if let Some(v) = &update.pickup_time {
        sets.push("pickup_time");
        values.push(Box::new(ts(v)));
    }
    if let Some(v) = &update.assigned_to {
        sets.push("assigned_to");
        values.push(Box::new(v.clone()));
    }

    sets.push("updated_at");
    values.push(Box::new(ts(&Utc::now().naive_utc())));

    let assignments = sets
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{col} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE orders SET {assignments} WHERE id = ?{}",
        values.len() + 1
    );
    values.push(Box::new(id.to_string()));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let count = conn.execute(&sql, params_refs.as_slice())?;
    Ok(count > 0)
}

pub fn delete_order(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// Earliest pickup among orders still waiting for one; unset pickup times sort last.
pub fn get_next_pickup(conn: &Connection) -> anyhow::Result<Option<Order>> {
    let statuses = OrderStatus::awaiting_pickup();
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE status IN (?1, ?2, ?3)
         ORDER BY pickup_time IS NULL, pickup_time ASC, created_at ASC, rowid ASC
         LIMIT 1"
    );
    let order = conn
        .query_row(
            &sql,
            params![statuses[0].as_str(), statuses[1].as_str(), statuses[2].as_str()],
            |row| Ok(parse_order_row(row)),
        )
        .optional()?;
    order.transpose()
}

pub fn get_recent_orders(
    conn: &Connection,
    filter: &OrderFilter,
    limit: i64,
) -> anyhow::Result<Vec<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE (?1 IS NULL OR customer_name = ?1) AND (?2 IS NULL OR assigned_to = ?2)
         ORDER BY created_at DESC, rowid DESC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![filter.customer_name, filter.assigned_to, limit],
        |row| Ok(parse_order_row(row)),
    )?;

    let mut orders = vec![];
    for row in rows {
        orders.push(row??);
    }
    Ok(orders)
}

fn parse_order_row(row: &rusqlite::Row) -> anyhow::Result<Order> {
    let pickup_time: Option<String> = row.get(7)?;
    let metadata: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    let now = Utc::now().naive_utc();

    Ok(Order {
        id: row.get(0)?,
        tracking_id: row.get(1)?,
        customer_name: row.get(2)?,
        address: row.get(3)?,
        item: row.get(4)?,
        qty: row.get(5)?,
        status: OrderStatus::parse(&row.get::<_, String>(6)?),
        pickup_time: pickup_time.as_deref().and_then(parse_ts),
        assigned_to: row.get(8)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: parse_ts(&created_at).unwrap_or(now),
        updated_at: parse_ts(&updated_at).unwrap_or(now),
    })
}
