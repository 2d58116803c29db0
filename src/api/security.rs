use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{client_info, require_manager};
use super::{ApiError, ApiResponse, AppState, MessageResponse, Paginated, SecurityEventDto};

#[derive(Deserialize)]
pub struct EventQuery {
    pub ip: Option<String>,
    pub event_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_per_page() -> u64 {
    50
}

/// GET /security-events (manager only)
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<EventQuery>,
) -> Result<Json<ApiResponse<Paginated<SecurityEventDto>>>, ApiError> {
    require_manager(&session).await?;

    let (events, total) = state
        .store()
        .list_security_events(
            query.ip.as_deref(),
            query.event_type.as_deref(),
            query.page,
            query.per_page,
        )
        .await?;

    Ok(Json(ApiResponse::success(Paginated {
        items: events.into_iter().map(SecurityEventDto::from).collect(),
        total,
        page: query.page,
        per_page: query.per_page,
    })))
}

/// POST /block-ip/{ip} (manager only)
/// Flags every recorded event for the IP. An IP with no history has
/// nothing to flag and stays unblocked.
pub async fn block_ip(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(ip): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = require_manager(&session).await?;
    let client = client_info(&headers);

    let updated = state.security().block_ip(&ip).await?;

    state
        .security()
        .record_access(
            Some(&user),
            "BLOCK_IP",
            Some(&format!("{ip} ({updated} events flagged)")),
            &client.ip,
            &client.user_agent,
        )
        .await;

    tracing::info!("IP {ip} blocked by {} ({updated} events)", user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("{updated} events flagged for {ip}"),
    })))
}
