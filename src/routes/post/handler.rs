use axum::{
    extract::{Json, Path, State},
};

use crate::{
    AppState,
    cache::PostView,
    error::AppError,
    result::{ApiResult, success_to_api_response},
};

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResult<PostView>>, AppError> {
    let post = state.posts.get(post_id).await?.ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(post))
}
