use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use super::read_through::{CachePolicy, ReadThroughCache};
use crate::cache::keys::KeySpace;
use crate::error::CacheError;
use crate::repository::RecordSource;
use crate::store::KeyValueStore;

/// 绑定了回源的实体缓存，业务代码只需要传主键
pub struct EntityCache<T> {
    cache: ReadThroughCache<T>,
    source: Arc<dyn RecordSource<T>>,
}

impl<T> EntityCache<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: KeySpace,
        policy: CachePolicy,
        source: Arc<dyn RecordSource<T>>,
    ) -> Self {
        Self {
            cache: ReadThroughCache::new(store, keys, policy),
            source,
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<T>, CacheError> {
        let id = checked_id(id)?;
        self.cache
            .get(&id.to_string(), || self.source.find_by_id(id))
            .await
    }

    /// 实体被修改后调用，重新写入缓存
    pub async fn refresh(&self, id: i64) -> Result<Option<T>, CacheError> {
        let id = checked_id(id)?;
        self.cache
            .refresh(&id.to_string(), || self.source.find_by_id(id))
            .await
    }

    pub async fn refresh_if_cached(&self, id: i64) -> Result<Option<T>, CacheError> {
        let id = checked_id(id)?;
        self.cache
            .refresh_if_cached(&id.to_string(), || self.source.find_by_id(id))
            .await
    }

    /// 实体被删除后调用
    pub async fn invalidate(&self, id: i64) -> Result<bool, CacheError> {
        let id = checked_id(id)?;
        self.cache.invalidate(&id.to_string()).await
    }
}

fn checked_id(id: i64) -> Result<i64, CacheError> {
    if id <= 0 {
        return Err(CacheError::InvalidKey(format!("id must be positive, got {id}")));
    }
    Ok(id)
}
