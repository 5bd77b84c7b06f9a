//! 数据库读取，作为缓存未命中时的回源

pub mod post;
pub mod user;

use async_trait::async_trait;

pub use post::PgPostRepository;
pub use user::PgUserRepository;

/// 按主键读取单条记录，`Ok(None)` 表示记录不存在
#[async_trait]
pub trait RecordSource<T>: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<T>, sqlx::Error>;
}
