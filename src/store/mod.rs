//! Persisted key-value cache behind a trait, so the reconciler's merge logic
//! stays testable against an in-memory store. The layout is one JSON value
//! per key, with no multi-key transaction guarantee.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::error::AppError;
use crate::models::UserSnapshot;

/// Storage keys for the cached user snapshot.
pub mod keys {
    pub const USER_INFO: &str = "user_info";
    pub const FRIENDS: &str = "friends";
    pub const FRIEND_REQUESTS_IN: &str = "friend_requests_in";
    pub const FRIEND_REQUESTS_OUT: &str = "friend_requests_out";
    pub const FRIEND_COURSES_TAKEN: &str = "friend_courses_taken";
    pub const FRIEND_INTERESTED_SECTIONS: &str = "friend_interested_sections";
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put_raw(&self, key: &str, value: String) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
    /// Change notifications: receives the key of every write.
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

pub async fn get_json<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, AppError> {
    match store.get_raw(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn put_json<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    store.put_raw(key, serde_json::to_string(value)?).await
}

/// Assembles the snapshot from its storage keys. Missing or unreadable
/// sections default to empty: absence is a valid state, not a failure.
pub async fn load_snapshot(store: &dyn CacheStore) -> Result<UserSnapshot, AppError> {
    Ok(UserSnapshot {
        user_info: get_json(store, keys::USER_INFO).await?.unwrap_or_default(),
        friends: get_json(store, keys::FRIENDS).await?.unwrap_or_default(),
        friend_requests_in: get_json(store, keys::FRIEND_REQUESTS_IN)
            .await?
            .unwrap_or_default(),
        friend_requests_out: get_json(store, keys::FRIEND_REQUESTS_OUT)
            .await?
            .unwrap_or_default(),
        friend_courses_taken: get_json(store, keys::FRIEND_COURSES_TAKEN)
            .await?
            .unwrap_or_default(),
        friend_interested_sections: get_json(store, keys::FRIEND_INTERESTED_SECTIONS)
            .await?
            .unwrap_or_default(),
    })
}

pub async fn save_snapshot(store: &dyn CacheStore, snapshot: &UserSnapshot) -> Result<(), AppError> {
    put_json(store, keys::USER_INFO, &snapshot.user_info).await?;
    put_json(store, keys::FRIENDS, &snapshot.friends).await?;
    put_json(store, keys::FRIEND_REQUESTS_IN, &snapshot.friend_requests_in).await?;
    put_json(store, keys::FRIEND_REQUESTS_OUT, &snapshot.friend_requests_out).await?;
    put_json(store, keys::FRIEND_COURSES_TAKEN, &snapshot.friend_courses_taken).await?;
    put_json(
        store,
        keys::FRIEND_INTERESTED_SECTIONS,
        &snapshot.friend_interested_sections,
    )
    .await?;
    Ok(())
}

pub struct SqliteCacheStore {
    db: SqlitePool,
    changes: broadcast::Sender<String>,
}

impl SqliteCacheStore {
    pub fn new(db: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { db, changes }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_cache WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(value)
    }

    async fn put_raw(&self, key: &str, value: String) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO kv_cache (key, value, updated_at) VALUES (?1, ?2, datetime('now')) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_cache WHERE key = ?1")
            .bind(key)
            .execute(&self.db)
            .await?;
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

/// In-memory store for tests and ephemeral sessions.
pub struct MemoryCacheStore {
    map: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            map: Mutex::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.map.lock().expect("store poisoned").get(key).cloned())
    }

    async fn put_raw(&self, key: &str, value: String) -> Result<(), AppError> {
        self.map
            .lock()
            .expect("store poisoned")
            .insert(key.to_string(), value);
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.map.lock().expect("store poisoned").remove(key);
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserInfo;

    #[tokio::test]
    async fn memory_store_round_trips_json() {
        let store = MemoryCacheStore::new();
        let info = UserInfo {
            id: "u1".to_string(),
            name: "Test".to_string(),
            ..UserInfo::default()
        };
        put_json(&store, keys::USER_INFO, &info).await.unwrap();
        let loaded: Option<UserInfo> = get_json(&store, keys::USER_INFO).await.unwrap();
        assert_eq!(loaded, Some(info));
    }

    #[tokio::test]
    async fn missing_keys_load_as_empty_snapshot() {
        let store = MemoryCacheStore::new();
        let snapshot = load_snapshot(&store).await.unwrap();
        assert_eq!(snapshot, UserSnapshot::default());
    }

    #[tokio::test]
    async fn writes_notify_subscribers() {
        let store = MemoryCacheStore::new();
        let mut rx = store.subscribe();
        store.put_raw(keys::FRIENDS, "{}".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), keys::FRIENDS);
    }
}
