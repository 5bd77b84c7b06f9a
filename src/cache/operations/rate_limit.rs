use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::rate_limit_key;
use crate::store::KeyValueStore;

/// 存储不可达时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 拒绝请求，保护后端
    #[default]
    Closed,
    /// 放行请求
    Open,
}

impl FailurePolicy {
    pub fn from_fail_open(fail_open: bool) -> Self {
        if fail_open { Self::Open } else { Self::Closed }
    }

    fn admits(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// 滑动窗口限流器，计数和判断在一次原子脚本中完成
pub struct SlidingWindowRateLimiter {
    store: Arc<dyn KeyValueStore>,
    on_failure: FailurePolicy,
}

impl SlidingWindowRateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, on_failure: FailurePolicy) -> Self {
        Self { store, on_failure }
    }

    /// 以存储端时钟判断是否放行，多实例共享同一时间基准
    pub async fn admit(&self, identifier: &str, window: Duration, limit: u32) -> bool {
        self.check(identifier, window, limit, None).await
    }

    /// 以给定时间戳（毫秒）判断是否放行
    pub async fn admit_at(&self, identifier: &str, window: Duration, limit: u32, now_ms: i64) -> bool {
        self.check(identifier, window, limit, Some(now_ms)).await
    }

    async fn check(&self, identifier: &str, window: Duration, limit: u32, now_ms: Option<i64>) -> bool {
        if identifier.is_empty() || window.is_zero() || limit == 0 {
            tracing::warn!(
                identifier,
                window_ms = window.as_millis() as u64,
                limit,
                "rejecting request with unusable rate limit parameters"
            );
            return false;
        }

        let key = rate_limit_key(identifier);
        let window_ms = window.as_millis() as u64;
        match self.store.admit_in_window(&key, window_ms, limit, now_ms).await {
            Ok(admitted) => {
                if !admitted {
                    tracing::debug!(key = %key, limit, window_ms, "rate limit exceeded");
                }
                admitted
            }
            Err(e) => {
                let admitted = self.on_failure.admits();
                tracing::warn!(
                    key = %key,
                    error = %e,
                    admitted,
                    "rate limit store failed, applying failure policy"
                );
                admitted
            }
        }
    }
}
