use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use tokio::sync::OwnedMutexGuard;

use crate::config::AppConfig;
use crate::db::queries;
use crate::models::Conversation;

pub struct SessionStore {
    db: Arc<Mutex<Connection>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    ttl: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(db: Arc<Mutex<Connection>>, config: &AppConfig) -> Self {
        Self {
            db,
            locks: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(config.session_ttl_minutes),
            max_turns: config.max_stored_turns,
        }
    }

    // Waits for exclusive use of `user_id`'s conversation. Other users are unaffected.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on can go.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub fn load(&self, user_id: &str, now: NaiveDateTime) -> Conversation {
        let loaded = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
            .and_then(|db| queries::get_conversation(&db, user_id, &now));

        match loaded {
            Ok(Some(conv)) => conv,
            Ok(None) => Conversation::new(user_id, now, self.ttl),
            Err(e) => {
                tracing::warn!(user_id, error = ?e, "failed to load conversation, starting fresh");
                Conversation::new(user_id, now, self.ttl)
            }
        }
    }

    pub fn save(&self, conv: &mut Conversation, now: NaiveDateTime) {
        conv.truncate_to(self.max_turns);
        conv.last_activity = now;
        conv.expires_at = now + self.ttl;

        let saved = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
            .and_then(|db| queries::save_conversation(&db, conv));

        if let Err(e) = saved {
            tracing::error!(user_id = %conv.user_id, error = ?e, "failed to save conversation");
        }
    }

    pub fn purge_expired(&self, now: NaiveDateTime) -> anyhow::Result<usize> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))?;
        queries::expire_old_conversations(&db, &now)
    }
}
