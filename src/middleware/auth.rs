use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::AppState;
use crate::error::AppError;

/// 校验 Bearer 凭证，通过后把 `Claims` 放入请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        tracing::debug!(uri = %req.uri(), "missing bearer credential");
        return Err(AppError::Unauthorized);
    };

    let claims = state
        .auth
        .authenticate(bearer.token())
        .await?
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
