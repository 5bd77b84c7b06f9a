//! 共享键值存储客户端
//!
//! 所有协调状态（缓存、锁、会话、限流窗口）都保存在外部存储中，
//! 多个进程实例之间的正确性只依赖单键原子脚本，从不使用跨键事务。

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// 键值存储抽象，组件通过 `Arc<dyn KeyValueStore>` 注入
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// 返回是否真的删除了一个键
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// 剩余存活时间，键不存在或没有过期时间时返回 `None`
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// 原子的 "不存在则写入并设置过期时间"，只有本次调用创建了键才返回 true
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// 原子的 "值相等则删除"，只有本次调用真的删除了键才返回 true
    async fn delete_if_equals(&self, key: &str, expected: &str) -> StoreResult<bool>;

    /// 原子的窗口计数：窗口已滚动则重置为 1 并放行，否则计数加一，不超过 `limit` 时放行
    ///
    /// `now_ms` 为 `None` 时使用存储端自己的时钟。
    async fn admit_in_window(
        &self,
        key: &str,
        window_ms: u64,
        limit: u32,
        now_ms: Option<i64>,
    ) -> StoreResult<bool>;
}
