use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_manager;
use super::{AccessLogDto, ApiError, ApiResponse, AppState, Paginated};

#[derive(Deserialize)]
pub struct LogQuery {
    pub account: Option<String>,
    pub action: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
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

fn parse_date(value: &str, name: &str) -> Result<chrono::NaiveDate, ApiError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::validation(format!("{name} must be YYYY-MM-DD")))
}

/// GET /logs (manager only)
/// `start_date` and `end_date` bound the log timestamps inclusively, by
/// calendar day.
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<LogQuery>,
) -> Result<Json<ApiResponse<Paginated<AccessLogDto>>>, ApiError> {
    require_manager(&session).await?;

    let created_from = match &query.start_date {
        Some(raw) => {
            parse_date(raw, "start_date")?;
            Some(raw.clone())
        }
        None => None,
    };

    let created_before = match &query.end_date {
        Some(raw) => {
            let date = parse_date(raw, "end_date")?;
            Some((date + chrono::Duration::days(1)).format("%Y-%m-%d").to_string())
        }
        None => None,
    };

    let (logs, total) = state
        .store()
        .list_access_logs(
            query.account.as_deref(),
            query.action.as_deref(),
            created_from.as_deref(),
            created_before.as_deref(),
            query.page,
            query.per_page,
        )
        .await?;

    Ok(Json(ApiResponse::success(Paginated {
        items: logs.into_iter().map(AccessLogDto::from).collect(),
        total,
        page: query.page,
        per_page: query.per_page,
    })))
}
