use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub cache_base_ttl_secs: u64,
    pub cache_jitter_secs: u64,
    pub cache_null_ttl_secs: u64,
    pub lock_ttl_secs: u64,
    pub lock_retry_backoff_ms: u64,
    pub lock_max_attempts: u32,
    pub rate_limit_window_ms: u64,
    pub rate_limit_requests: u32,
    pub rate_limit_fail_open: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源读取配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        // JWT_EXPIRATION 形如 "24h"，换算成秒后必须能放进 i64 时间戳
        let jwt_expiration_secs = match lookup("JWT_EXPIRATION") {
            Some(raw) => raw
                .trim_end_matches('h')
                .parse::<u64>()
                .ok()
                .and_then(|hours| hours.checked_mul(3600))
                .filter(|secs| i64::try_from(*secs).is_ok())
                .ok_or(ConfigError::Invalid {
                    var: "JWT_EXPIRATION",
                    value: raw,
                })?,
            None => 24 * 3600,
        };

        let config = Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "::".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            api_base_uri: lookup("API_BASE_URI").unwrap_or_else(|| "/api".to_string()),
            cache_base_ttl_secs: parse_or(&lookup, "CACHE_BASE_TTL_SECS", 30 * 60)?,
            cache_jitter_secs: parse_or(&lookup, "CACHE_JITTER_SECS", 10 * 60)?,
            cache_null_ttl_secs: parse_or(&lookup, "CACHE_NULL_TTL_SECS", 5 * 60)?,
            lock_ttl_secs: parse_or(&lookup, "LOCK_TTL_SECS", 5)?,
            lock_retry_backoff_ms: parse_or(&lookup, "LOCK_RETRY_BACKOFF_MS", 50)?,
            lock_max_attempts: parse_or(&lookup, "LOCK_MAX_ATTEMPTS", 40)?,
            rate_limit_window_ms: parse_or(&lookup, "RATE_LIMIT_WINDOW_MS", 1000)?,
            rate_limit_requests: parse_or(&lookup, "RATE_LIMIT_REQUESTS", 5)?,
            rate_limit_fail_open: parse_or(&lookup, "RATE_LIMIT_FAIL_OPEN", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive: [(&'static str, u64); 7] = [
            ("JWT_EXPIRATION", self.jwt_expiration_secs),
            ("CACHE_BASE_TTL_SECS", self.cache_base_ttl_secs),
            ("CACHE_NULL_TTL_SECS", self.cache_null_ttl_secs),
            ("LOCK_TTL_SECS", self.lock_ttl_secs),
            ("LOCK_MAX_ATTEMPTS", u64::from(self.lock_max_attempts)),
            ("RATE_LIMIT_WINDOW_MS", self.rate_limit_window_ms),
            ("RATE_LIMIT_REQUESTS", u64::from(self.rate_limit_requests)),
        ];
        for (var, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    var,
                    value: value.to_string(),
                });
            }
        }
        // 路由嵌套要求非根路径
        if !self.api_base_uri.starts_with('/') || self.api_base_uri.len() < 2 {
            return Err(ConfigError::Invalid {
                var: "API_BASE_URI",
                value: self.api_base_uri.clone(),
            });
        }
        Ok(())
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/talkforum"),
        ("REDIS_URL", "redis://127.0.0.1:6379"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_follow_cache_constants() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.cache_base_ttl_secs, 1800);
        assert_eq!(config.cache_jitter_secs, 600);
        assert_eq!(config.cache_null_ttl_secs, 300);
        assert_eq!(config.lock_ttl_secs, 5);
        assert_eq!(config.rate_limit_requests, 5);
        assert_eq!(config.rate_limit_window(), Duration::from_millis(1000));
        assert_eq!(config.jwt_expiration(), Duration::from_secs(24 * 3600));
        assert!(!config.rate_limit_fail_open);
    }

    #[test]
    fn missing_required_variable_is_reported() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RATE_LIMIT_WINDOW_MS", "0"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "RATE_LIMIT_WINDOW_MS",
                ..
            }
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("JWT_EXPIRATION", "2h"));
        pairs.push(("RATE_LIMIT_FAIL_OPEN", "true"));
        pairs.push(("LOCK_MAX_ATTEMPTS", "10"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.jwt_expiration_secs, 7200);
        assert!(config.rate_limit_fail_open);
        assert_eq!(config.lock_max_attempts, 10);
    }

    #[test]
    fn oversized_jwt_expiration_is_rejected() {
        for value in ["99999999999999999h", "3000000000000000h"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("JWT_EXPIRATION", value));
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid {
                    var: "JWT_EXPIRATION",
                    ..
                }
            ));
        }
    }
}
