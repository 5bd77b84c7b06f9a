use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::token_user_key;
use crate::error::StoreResult;
use crate::store::KeyValueStore;

/// 单用户单会话存储
///
/// 每个用户只保存最近一次签发的令牌，重新登录直接覆盖，后写者胜出。
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 记录新签发的令牌，覆盖该用户之前的会话
    pub async fn issue(&self, principal_id: i64, token: &str, ttl: Duration) -> StoreResult<()> {
        let key = token_user_key(principal_id);
        self.store.set_with_ttl(&key, token, ttl).await?;
        tracing::debug!(principal_id, ttl_secs = ttl.as_secs(), "session issued");
        Ok(())
    }

    /// 令牌与当前会话完全一致才有效
    ///
    /// 会话不存在、已过期、已被新登录替换都返回 false，调用方不区分这几种情况。
    pub async fn validate(&self, principal_id: i64, presented: &str) -> StoreResult<bool> {
        let key = token_user_key(principal_id);
        let current = self.store.get(&key).await?;
        let valid = current.as_deref() == Some(presented);
        if !valid {
            tracing::debug!(principal_id, "presented token is not the active session");
        }
        Ok(valid)
    }

    pub async fn revoke(&self, principal_id: i64) -> StoreResult<bool> {
        let key = token_user_key(principal_id);
        let removed = self.store.delete(&key).await?;
        tracing::info!(principal_id, removed, "session revoked");
        Ok(removed)
    }
}
