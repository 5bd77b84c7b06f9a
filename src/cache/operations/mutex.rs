use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::StoreResult;
use crate::store::KeyValueStore;

/// 锁持有者标识，每次调用独立生成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerToken(String);

impl OwnerToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 基于共享存储的分布式互斥锁
///
/// 加锁与解锁各是一次原子脚本调用。锁带过期时间，持有者崩溃后锁最终会自动释放；
/// 解锁时校验持有者，过期后被他人重新获取的锁不会被误删。
#[derive(Clone)]
pub struct DistributedMutex {
    store: Arc<dyn KeyValueStore>,
}

impl DistributedMutex {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 尝试获取锁。返回 false 表示锁被占用，不是错误
    pub async fn try_acquire(
        &self,
        lock_key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let acquired = self
            .store
            .set_if_absent(lock_key, owner.as_str(), ttl)
            .await?;
        if acquired {
            tracing::debug!(lock_key = %lock_key, owner = %owner, "lock acquired");
        } else {
            tracing::debug!(lock_key = %lock_key, "lock held by another owner");
        }
        Ok(acquired)
    }

    /// 获取锁并返回守卫。守卫被丢弃（任务取消或 panic 展开）时在后台释放锁
    pub async fn try_lock(
        &self,
        lock_key: &str,
        owner: &OwnerToken,
        ttl: Duration,
    ) -> StoreResult<Option<LockGuard>> {
        if !self.try_acquire(lock_key, owner, ttl).await? {
            return Ok(None);
        }
        Ok(Some(LockGuard {
            store: Arc::clone(&self.store),
            lock_key: lock_key.to_string(),
            owner: owner.clone(),
            armed: true,
        }))
    }

    /// 释放锁，只有持有者本人才能删除
    pub async fn release(&self, lock_key: &str, owner: &OwnerToken) -> StoreResult<bool> {
        let released = self.store.delete_if_equals(lock_key, owner.as_str()).await?;
        if released {
            tracing::debug!(lock_key = %lock_key, owner = %owner, "lock released");
        } else {
            tracing::warn!(
                lock_key = %lock_key,
                owner = %owner,
                "lock was no longer owned at release (expired or taken over)"
            );
        }
        Ok(released)
    }
}

/// 已持有的锁
///
/// 正常路径调用 `release`；未释放就被丢弃时，`Drop` 在当前运行时上派生任务执行带持有者校验的删除。
pub struct LockGuard {
    store: Arc<dyn KeyValueStore>,
    lock_key: String,
    owner: OwnerToken,
    armed: bool,
}

impl LockGuard {
    pub async fn release(mut self) -> StoreResult<bool> {
        let released = self
            .store
            .delete_if_equals(&self.lock_key, self.owner.as_str())
            .await;
        self.armed = false;
        let released = released?;
        if released {
            tracing::debug!(lock_key = %self.lock_key, owner = %self.owner, "lock released");
        } else {
            tracing::warn!(
                lock_key = %self.lock_key,
                owner = %self.owner,
                "lock was no longer owned at release (expired or taken over)"
            );
        }
        Ok(released)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let store = Arc::clone(&self.store);
        let lock_key = std::mem::take(&mut self.lock_key);
        let owner = self.owner.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(lock_key = %lock_key, "lock holder dropped before release, releasing in background");
                handle.spawn(async move {
                    if let Err(e) = store.delete_if_equals(&lock_key, owner.as_str()).await {
                        tracing::warn!(lock_key = %lock_key, error = %e, "background lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock_key = %lock_key, "no runtime to release dropped lock, waiting for expiry");
            }
        }
    }
}
