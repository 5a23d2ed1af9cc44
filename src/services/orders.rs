use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{NewOrder, Order, OrderFilter, OrderUpdate};

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_tracking_id(&self, tracking_id: &str) -> anyhow::Result<Option<Order>>;
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Order>>;
    // Writes the present fields and returns the resulting order; `None` when `id` is unknown.
    async fn apply_update(&self, id: &str, update: &OrderUpdate) -> anyhow::Result<Option<Order>>;
    async fn create(&self, order: NewOrder) -> anyhow::Result<Order>;
    async fn delete(&self, id: &str) -> anyhow::Result<bool>;
    async fn next_pending_pickup(&self) -> anyhow::Result<Option<Order>>;
    async fn recent(&self, filter: &OrderFilter, limit: i64) -> anyhow::Result<Vec<Order>>;
}

pub struct SqliteOrderStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteOrderStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn find_by_tracking_id(&self, tracking_id: &str) -> anyhow::Result<Option<Order>> {
        let db = self.conn()?;
        queries::get_order_by_tracking_id(&db, tracking_id)
            .with_context(|| format!("failed to look up order {tracking_id}"))
    }

    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Order>> {
        let db = self.conn()?;
        queries::get_order_by_id(&db, id)
    }

    async fn apply_update(&self, id: &str, update: &OrderUpdate) -> anyhow::Result<Option<Order>> {
        let db = self.conn()?;
        if !queries::update_order(&db, id, update).context("failed to update order")? {
            return Ok(None);
        }
        queries::get_order_by_id(&db, id)
    }

    async fn create(&self, order: NewOrder) -> anyhow::Result<Order> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.conn()?;
        queries::insert_order(&db, &id, &order).context("failed to insert order")?;
        queries::get_order_by_id(&db, &id)?
            .ok_or_else(|| anyhow::anyhow!("order {id} missing right after insert"))
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let db = self.conn()?;
        queries::delete_order(&db, id)
    }

    async fn next_pending_pickup(&self) -> anyhow::Result<Option<Order>> {
        let db = self.conn()?;
        queries::get_next_pickup(&db)
    }

    async fn recent(&self, filter: &OrderFilter, limit: i64) -> anyhow::Result<Vec<Order>> {
        let db = self.conn()?;
        queries::get_recent_orders(&db, filter, limit)
    }
}
