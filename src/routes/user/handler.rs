use axum::{
    extract::{Json, Path, State},
};

use crate::{
    AppState,
    cache::UserView,
    error::AppError,
    result::{ApiResult, success_to_api_response},
};

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResult<UserView>>, AppError> {
    let user = state.users.get(user_id).await?.ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(user))
}
