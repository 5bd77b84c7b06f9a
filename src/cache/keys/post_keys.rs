use super::KeySpace;

/// 帖子缓存键前缀
const POST_CACHE_PREFIX: &str = "post_cache:";

/// 帖子缓存分布式锁前缀
const POST_CACHE_LOCK_PREFIX: &str = "post_cache:lock:";

pub const POST_KEYS: KeySpace = KeySpace::new(POST_CACHE_PREFIX, POST_CACHE_LOCK_PREFIX);
