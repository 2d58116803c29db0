use axum::{Json, extract::State};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_manager;
use super::{AccountDto, ApiError, ApiResponse, AppState};

/// GET /users (manager only)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<AccountDto>>>, ApiError> {
    require_manager(&session).await?;

    let accounts = state.store().list_employees().await?;

    Ok(Json(ApiResponse::success(
        accounts.into_iter().map(AccountDto::from).collect(),
    )))
}
