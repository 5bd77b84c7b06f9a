use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{
    AppState,
    result::{ApiResult, error_codes},
};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub store: &'static str,
}

/// 健康检查，不经过限流
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResult::success(HealthStatus { store: "up" })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed to reach store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResult::error(error_codes::UNAVAILABLE, "缓存服务不可用")),
            )
        }
    }
}
