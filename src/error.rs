use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::result::error_codes;

/// 加载回调返回的任意错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type StoreResult<T> = Result<T, StoreError>;

/// 键值存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 网络或连接层面的失败，调用方按降级策略处理
    #[error("store unreachable: {0}")]
    Unavailable(String),
    #[error("store command failed: {0}")]
    Command(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// 读穿透缓存错误。确认不存在不是错误，由 `Ok(None)` 表示。
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
    #[error("cache temporarily unavailable for {key} after {attempts} attempts")]
    Unavailable { key: String, attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("loader failed: {0}")]
    Loader(#[source] BoxError),
}

/// 认证错误
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign credential: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    NotFound,
    BadRequest(String),
    TooManyRequests,
    ServiceUnavailable,
    InternalServerError,
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidKey(msg) => AppError::BadRequest(msg),
            CacheError::Unavailable { .. } | CacheError::Store(_) => AppError::ServiceUnavailable,
            CacheError::Loader(e) => {
                tracing::error!(error = %e, "Record loader failed");
                AppError::InternalServerError
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(e) => {
                tracing::error!(error = %e, "Failed to sign credential");
                AppError::InternalServerError
            }
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::warn!(error = %err, "Store request failed");
        AppError::ServiceUnavailable
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "登录已失效，请重新登录".to_string(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                "资源不存在".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMIT,
                "请求过于频繁，请稍后重试".to_string(),
            ),
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::UNAVAILABLE,
                "服务繁忙，请稍后重试".to_string(),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            code,
            error_message,
        });

        (status, body).into_response()
    }
}
