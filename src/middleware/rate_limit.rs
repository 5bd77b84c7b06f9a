use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cache::{RateLimitRule, SlidingWindowRateLimiter};
use crate::error::AppError;

/// 代理可能写入客户端地址的请求头，按优先级排列
const FORWARDING_HEADERS: [&str; 3] = ["x-real-ip", "proxy-client-ip", "wl-proxy-client-ip"];

/// 挂在某一组路由上的限流配置
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<SlidingWindowRateLimiter>,
    pub rule: RateLimitRule,
}

impl RateLimitState {
    pub fn new(limiter: Arc<SlidingWindowRateLimiter>, rule: RateLimitRule) -> Self {
        Self { limiter, rule }
    }
}

pub async fn rate_limit(
    State(state): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let identifier = client_identifier(&req);
    let admitted = state
        .limiter
        .admit(&identifier, state.rule.window, state.rule.limit)
        .await;

    if !admitted {
        tracing::info!(identifier = %identifier, uri = %req.uri(), "request rate limited");
        return AppError::TooManyRequests.into_response();
    }

    next.run(req).await
}

/// 限流标识 `ip:{addr}`
pub fn client_identifier(req: &Request<Body>) -> String {
    format!("ip:{}", client_ip(req))
}

fn client_ip(req: &Request<Body>) -> String {
    let headers = req.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            s.split(',')
                .map(str::trim)
                .find(|ip| usable_address(ip))
        });

    let from_headers = forwarded.or_else(|| {
        FORWARDING_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|ip| usable_address(ip))
        })
    });

    let ip = match from_headers {
        Some(ip) => ip.to_string(),
        None => req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    };

    normalize_loopback(ip)
}

fn usable_address(ip: &str) -> bool {
    !ip.is_empty() && !ip.eq_ignore_ascii_case("unknown")
}

fn normalize_loopback(ip: String) -> String {
    if ip == "::1" || ip == "0:0:0:0:0:0:0:1" {
        "127.0.0.1".to_string()
    } else {
        ip
    }
}
