use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use super::KeyValueStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Slot {
    Text(String),
    Window { start_ms: i64, count: u32 },
}

#[derive(Debug, Clone)]
struct StoredValue {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(slot: Slot, ttl: Duration) -> Self {
        Self {
            slot,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 单进程内存存储
///
/// 与 Redis 实现保持相同的原子语义：每个复合操作都在 DashMap 分片锁内完成。
/// 过期时间基于 `tokio::time::Instant`，测试中可以暂停和推进时钟。
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储不可达
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn live(&self, key: &str) -> Option<StoredValue> {
        let now = Instant::now();
        let value = self.entries.get(key).map(|entry| entry.value().clone())?;
        if value.is_expired(now) {
            self.entries.remove_if(key, |_, v| v.is_expired(now));
            return None;
        }
        Some(value)
    }

    fn reject_zero_ttl(ttl: Duration) -> StoreResult<()> {
        if ttl.is_zero() {
            return Err(StoreError::Command("invalid expire time".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.ensure_online()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_online()?;
        match self.live(key) {
            Some(StoredValue {
                slot: Slot::Text(text),
                ..
            }) => Ok(Some(text)),
            Some(_) => Err(StoreError::Command(format!(
                "WRONGTYPE value at {key} is not a string"
            ))),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.ensure_online()?;
        Self::reject_zero_ttl(ttl)?;
        self.entries.insert(
            key.to_string(),
            StoredValue::new(Slot::Text(value.to_string()), ttl),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ensure_online()?;
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, value)| !value.is_expired(now)))
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        self.ensure_online()?;
        let now = Instant::now();
        Ok(self
            .live(key)
            .and_then(|value| value.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.ensure_online()?;
        Self::reject_zero_ttl(ttl)?;
        let now = Instant::now();
        let fresh = StoredValue::new(Slot::Text(value.to_string()), ttl);

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> StoreResult<bool> {
        self.ensure_online()?;
        let now = Instant::now();
        let removed = self.entries.remove_if(key, |_, value| {
            !value.is_expired(now) && matches!(&value.slot, Slot::Text(text) if text == expected)
        });
        Ok(removed.is_some())
    }

    async fn admit_in_window(
        &self,
        key: &str,
        window_ms: u64,
        limit: u32,
        now_ms: Option<i64>,
    ) -> StoreResult<bool> {
        self.ensure_online()?;
        if limit == 0 {
            return Ok(false);
        }
        let now_ms = now_ms.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        let now = Instant::now();
        let window = Duration::from_millis(window_ms.max(1));
        let reset = StoredValue::new(
            Slot::Window {
                start_ms: now_ms,
                count: 1,
            },
            window,
        );

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let value = occupied.get_mut();
                if value.is_expired(now) {
                    *value = reset;
                    return Ok(true);
                }
                let Slot::Window { start_ms, count } = value.slot else {
                    return Err(StoreError::Command(format!(
                        "WRONGTYPE value at {key} is not a hash"
                    )));
                };
                if now_ms - start_ms >= window_ms as i64 {
                    *value = reset;
                    Ok(true)
                } else if count >= limit {
                    Ok(false)
                } else {
                    value.slot = Slot::Window {
                        start_ms,
                        count: count + 1,
                    };
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(reset);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.ttl("k").await.unwrap(), Some(Duration::from_secs(2)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn set_if_absent_only_creates_once() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(5);
        assert!(store.set_if_absent("lock", "a", ttl).await.unwrap());
        assert!(!store.set_if_absent("lock", "b", ttl).await.unwrap());
        assert_eq!(store.get("lock").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn delete_if_equals_checks_value() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("lock", "a", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!store.delete_if_equals("lock", "b").await.unwrap());
        assert!(store.delete_if_equals("lock", "a").await.unwrap());
        assert!(!store.delete_if_equals("lock", "a").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .set_with_ttl("k", "v", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn window_state_is_not_readable_as_text() {
        let store = MemoryStore::new();
        assert!(store.admit_in_window("w", 1000, 2, Some(0)).await.unwrap());
        assert!(matches!(store.get("w").await, Err(StoreError::Command(_))));
    }
}
