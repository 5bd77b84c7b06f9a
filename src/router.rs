use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{RateLimitState, auth_middleware, log_errors, rate_limit},
    routes,
};

/// 组装路由：限流在认证之前执行，健康检查不经过限流
pub fn create_router(state: AppState) -> Router {
    let limits = RateLimitState::new(state.limiter.clone(), state.rate_limit_rule());

    let public_routes = Router::new()
        .route("/posts/{id}", get(routes::post::get_post))
        .route("/users/{id}", get(routes::user::get_user));

    let protected_routes = Router::new()
        .route("/auth/check", get(routes::auth::check_token))
        .route("/auth/sign-out", post(routes::auth::sign_out))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(from_fn_with_state(limits, rate_limit));

    let router = Router::new()
        .route("/health", get(routes::health::health))
        .nest(&state.config.api_base_uri, api_routes)
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
