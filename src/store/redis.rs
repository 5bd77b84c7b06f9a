use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, Script, aio::ConnectionManager};

use super::KeyValueStore;
use crate::error::StoreResult;

/// 启动时加载一次的 Lua 脚本
struct StoreScripts {
    acquire_lock: Script,
    release_lock: Script,
    sliding_window: Script,
}

impl StoreScripts {
    fn load() -> Self {
        Self {
            acquire_lock: Script::new(include_str!("scripts/acquire_lock.lua")),
            release_lock: Script::new(include_str!("scripts/release_lock.lua")),
            sliding_window: Script::new(include_str!("scripts/sliding_window.lua")),
        }
    }
}

/// 基于 Redis 的存储实现，连接由 `ConnectionManager` 复用并自动重连
pub struct RedisStore {
    conn: ConnectionManager,
    scripts: StoreScripts,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = RedisClient::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            scripts: StoreScripts::load(),
        })
    }

    fn millis(ttl: Duration) -> u64 {
        // PX 不接受 0
        (ttl.as_millis() as u64).max(1)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.pset_ex(key, value, Self::millis(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        // -2 表示键不存在，-1 表示没有过期时间
        let remaining: i64 = conn.pttl(key).await?;
        Ok((remaining >= 0).then(|| Duration::from_millis(remaining as u64)))
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let created: i64 = self
            .scripts
            .acquire_lock
            .key(key)
            .arg(value)
            .arg(Self::millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(created == 1)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .scripts
            .release_lock
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn admit_in_window(
        &self,
        key: &str,
        window_ms: u64,
        limit: u32,
        now_ms: Option<i64>,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.sliding_window.key(key);
        invocation.arg(window_ms).arg(limit);
        if let Some(now_ms) = now_ms {
            invocation.arg(now_ms);
        }
        let admitted: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(admitted == 1)
    }
}
