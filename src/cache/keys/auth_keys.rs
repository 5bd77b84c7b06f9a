/// 用户登录令牌前缀
const TOKEN_USER_PREFIX: &str = "token:user:";

/// 限流计数前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 生成用户登录令牌键
pub fn token_user_key(principal_id: i64) -> String {
    format!("{}{}", TOKEN_USER_PREFIX, principal_id)
}

/// 生成限流窗口键
pub fn rate_limit_key(identifier: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, identifier)
}
