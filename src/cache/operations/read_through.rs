//! 读穿透缓存
//!
//! 缓存未命中时通过分布式锁保证同一个键在集群内同时最多只有一次回源（防击穿），
//! 回源确认不存在时写入空值标记（防穿透），正常数据的过期时间带随机偏移（防雪崩）。

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};

use super::mutex::{DistributedMutex, OwnerToken};
use crate::cache::keys::KeySpace;
use crate::cache::models::CachedPayload;
use crate::config::Config;
use crate::error::{BoxError, CacheError, StoreError};
use crate::store::KeyValueStore;

/// 缓存过期与锁重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub base_ttl: Duration,
    pub jitter: Duration,
    pub absent_ttl: Duration,
    pub lock_ttl: Duration,
    pub retry_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            base_ttl: Duration::from_secs(30 * 60),
            jitter: Duration::from_secs(10 * 60),
            absent_ttl: Duration::from_secs(5 * 60),
            lock_ttl: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(50),
            max_attempts: 40,
        }
    }
}

impl From<&Config> for CachePolicy {
    fn from(config: &Config) -> Self {
        Self {
            base_ttl: Duration::from_secs(config.cache_base_ttl_secs),
            jitter: Duration::from_secs(config.cache_jitter_secs),
            absent_ttl: Duration::from_secs(config.cache_null_ttl_secs),
            lock_ttl: Duration::from_secs(config.lock_ttl_secs),
            retry_backoff: Duration::from_millis(config.lock_retry_backoff_ms),
            max_attempts: config.lock_max_attempts,
        }
    }
}

impl CachePolicy {
    /// 基础过期时间加上 [0, jitter] 秒的随机偏移
    pub fn jittered_ttl(&self) -> Duration {
        let offset = rand::thread_rng().gen_range(0..=self.jitter.as_secs());
        self.base_ttl + Duration::from_secs(offset)
    }
}

enum Lookup<T> {
    Hit(T),
    Absent,
    Miss,
}

/// 单一实体类型的读穿透缓存
pub struct ReadThroughCache<T> {
    store: Arc<dyn KeyValueStore>,
    mutex: DistributedMutex,
    keys: KeySpace,
    policy: CachePolicy,
    _entity: PhantomData<fn() -> T>,
}

impl<T> ReadThroughCache<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace, policy: CachePolicy) -> Self {
        Self {
            mutex: DistributedMutex::new(Arc::clone(&store)),
            store,
            keys,
            policy,
            _entity: PhantomData,
        }
    }

    /// 读取实体，`Ok(None)` 表示实体确认不存在
    ///
    /// 锁被占用时短暂休眠后重试，重试次数有上限，超过后返回 `CacheError::Unavailable`。
    /// 存储不可达时降级为直接调用 `loader`。
    pub async fn get<F, Fut, E>(&self, id: &str, loader: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<BoxError>,
    {
        let id = validate_id(id)?;
        let cache_key = self.keys.cache_key(id);
        let lock_key = self.keys.lock_key(id);
        let owner = OwnerToken::generate();

        for attempt in 1..=self.policy.max_attempts {
            match self.lookup(&cache_key).await {
                Ok(Lookup::Hit(entity)) => {
                    tracing::debug!(key = %cache_key, "cache hit");
                    return Ok(Some(entity));
                }
                Ok(Lookup::Absent) => {
                    tracing::debug!(key = %cache_key, "cache hit on absent marker");
                    return Ok(None);
                }
                Ok(Lookup::Miss) => {
                    tracing::debug!(key = %cache_key, attempt, "cache miss");
                }
                Err(e) => {
                    tracing::warn!(key = %cache_key, error = %e, "cache lookup failed, loading directly");
                    return load_direct(loader).await;
                }
            }

            match self
                .mutex
                .try_lock(&lock_key, &owner, self.policy.lock_ttl)
                .await
            {
                Ok(Some(guard)) => {
                    let outcome = self.fill(&cache_key, loader).await;
                    if let Err(e) = guard.release().await {
                        tracing::warn!(lock_key = %lock_key, error = %e, "failed to release lock");
                    }
                    return outcome;
                }
                Ok(None) => {
                    tokio::time::sleep(self.policy.retry_backoff).await;
                }
                Err(e) => {
                    tracing::warn!(lock_key = %lock_key, error = %e, "lock acquisition failed, loading directly");
                    return load_direct(loader).await;
                }
            }
        }

        tracing::warn!(
            key = %cache_key,
            attempts = self.policy.max_attempts,
            "gave up waiting for cache rebuild lock"
        );
        Err(CacheError::Unavailable {
            key: cache_key,
            attempts: self.policy.max_attempts,
        })
    }

    /// 重新加载并覆盖缓存；实体不存在时删除缓存
    pub async fn refresh<F, Fut, E>(&self, id: &str, loader: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<BoxError>,
    {
        let cache_key = self.keys.cache_key(validate_id(id)?);
        let loaded = loader().await.map_err(|e| CacheError::Loader(e.into()))?;
        match loaded {
            Some(entity) => {
                self.write_entity(&cache_key, &entity).await?;
                tracing::info!(key = %cache_key, "cache refreshed");
                Ok(Some(entity))
            }
            None => {
                self.store.delete(&cache_key).await?;
                tracing::info!(key = %cache_key, "entity gone, cache entry removed");
                Ok(None)
            }
        }
    }

    /// 仅当缓存中已有实体时才刷新，避免为冷数据写缓存
    pub async fn refresh_if_cached<F, Fut, E>(
        &self,
        id: &str,
        loader: F,
    ) -> Result<Option<T>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<BoxError>,
    {
        let cache_key = self.keys.cache_key(validate_id(id)?);
        match self.lookup(&cache_key).await? {
            Lookup::Hit(_) => self.refresh(id, loader).await,
            Lookup::Absent | Lookup::Miss => {
                tracing::debug!(key = %cache_key, "not cached, skip refresh");
                Ok(None)
            }
        }
    }

    /// 删除缓存条目，返回是否存在
    pub async fn invalidate(&self, id: &str) -> Result<bool, CacheError> {
        let cache_key = self.keys.cache_key(validate_id(id)?);
        let removed = self.store.delete(&cache_key).await?;
        tracing::info!(key = %cache_key, removed, "cache invalidated");
        Ok(removed)
    }

    async fn lookup(&self, cache_key: &str) -> Result<Lookup<T>, StoreError> {
        let Some(raw) = self.store.get(cache_key).await? else {
            return Ok(Lookup::Miss);
        };
        match CachedPayload::<T>::decode(&raw) {
            Ok(CachedPayload::Present(entity)) => Ok(Lookup::Hit(entity)),
            Ok(CachedPayload::Absent) => Ok(Lookup::Absent),
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "undecodable cache entry, dropping it");
                self.store.delete(cache_key).await?;
                Ok(Lookup::Miss)
            }
        }
    }

    /// 持锁回源：双重检查后调用 loader 并写缓存
    async fn fill<F, Fut, E>(&self, cache_key: &str, loader: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<BoxError>,
    {
        match self.lookup(cache_key).await {
            Ok(Lookup::Hit(entity)) => {
                tracing::debug!(key = %cache_key, "cache filled by another owner");
                return Ok(Some(entity));
            }
            Ok(Lookup::Absent) => return Ok(None),
            Ok(Lookup::Miss) => {}
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "double check failed, loading anyway");
            }
        }

        let loaded = loader().await.map_err(|e| CacheError::Loader(e.into()))?;
        match loaded {
            Some(entity) => {
                if let Err(e) = self.write_entity(cache_key, &entity).await {
                    tracing::warn!(key = %cache_key, error = %e, "failed to cache loaded entity");
                }
                Ok(Some(entity))
            }
            None => {
                tracing::debug!(key = %cache_key, "entity does not exist, caching absent marker");
                if let Err(e) = self
                    .write_payload(cache_key, &CachedPayload::<&T>::Absent, self.policy.absent_ttl)
                    .await
                {
                    tracing::warn!(key = %cache_key, error = %e, "failed to cache absent marker");
                }
                Ok(None)
            }
        }
    }

    async fn write_entity(&self, cache_key: &str, entity: &T) -> Result<(), StoreError> {
        let ttl = self.policy.jittered_ttl();
        tracing::debug!(key = %cache_key, ttl_secs = ttl.as_secs(), "caching entity");
        self.write_payload(cache_key, &CachedPayload::Present(entity), ttl)
            .await
    }

    async fn write_payload(
        &self,
        cache_key: &str,
        payload: &CachedPayload<&T>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let raw = match payload.encode() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "payload is not serializable, not caching");
                return Ok(());
            }
        };
        self.store.set_with_ttl(cache_key, &raw, ttl).await
    }
}

async fn load_direct<T, F, Fut, E>(loader: F) -> Result<Option<T>, CacheError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Into<BoxError>,
{
    loader().await.map_err(|e| CacheError::Loader(e.into()))
}

fn validate_id(id: &str) -> Result<&str, CacheError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CacheError::InvalidKey("entity id must not be empty".into()));
    }
    Ok(trimmed)
}
