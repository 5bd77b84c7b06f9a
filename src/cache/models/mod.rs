/// 缓存数据模型
/// 定义缓存数据的结构体

// 缓存条目编码（实体或空值标记）
pub mod entry;

// 帖子缓存模型
pub mod post;

// 用户缓存模型
pub mod user;

pub mod rate_limit;

// 重新导出常用类型
pub use entry::{ABSENT_SENTINEL, CachedPayload};
pub use post::PostView;
pub use rate_limit::RateLimitRule;
pub use user::UserView;
