/// 缓存键模块
/// 提供各种缓存键生成函数

// 帖子缓存键模块
pub mod post_keys;

// 用户缓存键模块
pub mod user_keys;

// 会话与限流键模块
pub mod auth_keys;

pub use auth_keys::{rate_limit_key, token_user_key};
pub use post_keys::POST_KEYS;
pub use user_keys::USER_KEYS;

/// 一种实体的键空间：缓存键与锁键使用不同前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpace {
    cache_prefix: &'static str,
    lock_prefix: &'static str,
}

impl KeySpace {
    pub const fn new(cache_prefix: &'static str, lock_prefix: &'static str) -> Self {
        Self {
            cache_prefix,
            lock_prefix,
        }
    }

    /// 生成实体缓存键
    pub fn cache_key(&self, id: &str) -> String {
        format!("{}{}", self.cache_prefix, id)
    }

    /// 生成实体重建锁键
    pub fn lock_key(&self, id: &str) -> String {
        format!("{}{}", self.lock_prefix, id)
    }
}
