use axum::extract::{Extension, Json, State};

use super::model::{CheckTokenResponse, SignOutResponse};
use crate::{
    AppState,
    auth::{Claims, RevocationReason},
    error::AppError,
    result::{ApiResult, success_to_api_response},
};

pub async fn check_token(
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResult<CheckTokenResponse>>, AppError> {
    let principal_id = claims.principal_id().ok_or(AppError::Unauthorized)?;
    Ok(success_to_api_response(CheckTokenResponse {
        principal_id,
        role: claims.role,
        expires_at: claims.exp,
    }))
}

/// 退出登录，已签发的凭证立即失效
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResult<SignOutResponse>>, AppError> {
    let principal_id = claims.principal_id().ok_or(AppError::Unauthorized)?;
    state.auth.revoke(principal_id, RevocationReason::Logout).await?;
    Ok(success_to_api_response(SignOutResponse { principal_id }))
}
