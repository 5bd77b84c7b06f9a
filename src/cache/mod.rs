// 缓存模块
// 包含缓存键、缓存数据结构和协调逻辑

pub mod keys;
pub mod models;
pub mod operations;

// 重新导出常用类型，方便其他模块使用
pub use models::{PostView, RateLimitRule, UserView};
pub use operations::{
    CachePolicy, DistributedMutex, EntityCache, FailurePolicy, OwnerToken, ReadThroughCache,
    SessionStore, SlidingWindowRateLimiter,
};
