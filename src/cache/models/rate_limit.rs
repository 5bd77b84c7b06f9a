use std::time::Duration;

/// 限流规则：窗口内允许的请求次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub window: Duration,
    pub limit: u32,
}

impl RateLimitRule {
    pub const fn new(window: Duration, limit: u32) -> Self {
        Self { window, limit }
    }
}
