/// 缓存协调操作
/// 分布式锁、读穿透缓存、会话与限流

// 分布式互斥锁
pub mod mutex;

// 读穿透缓存
pub mod read_through;

// 绑定回源的实体缓存
pub mod entity;

pub mod rate_limit;
pub mod session;

// 重新导出常用操作
pub use entity::EntityCache;
pub use mutex::{DistributedMutex, LockGuard, OwnerToken};
pub use rate_limit::{FailurePolicy, SlidingWindowRateLimiter};
pub use read_through::{CachePolicy, ReadThroughCache};
pub use session::SessionStore;
