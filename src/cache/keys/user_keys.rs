use super::KeySpace;

/// 用户缓存键前缀
const USER_CACHE_PREFIX: &str = "user_cache:";

/// 用户缓存分布式锁前缀
const USER_CACHE_LOCK_PREFIX: &str = "user_cache:lock:";

pub const USER_KEYS: KeySpace = KeySpace::new(USER_CACHE_PREFIX, USER_CACHE_LOCK_PREFIX);
