use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{client_info, current_user};
use super::{ApiError, ApiResponse, AppState, DeviceDto, MessageResponse};

/// GET /devices
/// Active trusted devices for the logged-in account.
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<DeviceDto>>>, ApiError> {
    let user = current_user(&session).await?;

    let devices = state.store().list_devices(user.id).await?;

    Ok(Json(ApiResponse::success(
        devices.into_iter().map(DeviceDto::from).collect(),
    )))
}

/// DELETE /devices/{id}
/// Revoke a trusted device. Revocation is permanent: the device can never
/// be re-trusted, even by a fresh password login from it.
pub async fn revoke_device(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(device_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&session).await?;
    let client = client_info(&headers);

    let revoked = state.store().revoke_device(user.id, device_id).await?;

    if !revoked {
        return Err(ApiError::NotFound(format!("Device {device_id} not found")));
    }

    state
        .security()
        .record_access(
            Some(&user),
            "DEVICE_REVOKED",
            Some(&format!("device {device_id}")),
            &client.ip,
            &client.user_agent,
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Device revoked".to_string(),
    })))
}
