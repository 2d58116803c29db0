use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{client_info, require_manager};
use super::{ApiError, AppState};
use crate::db::Task;

#[derive(Deserialize)]
pub struct ExportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /export-csv (manager only)
/// Task export with localized priority and status labels.
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let user = require_manager(&session).await?;
    let client = client_info(&headers);

    let tasks = match (&query.start_date, &query.end_date) {
        (None, None) => state.store().list_all_tasks().await?,
        (start, end) => {
            let from = start.as_deref().unwrap_or("0000-01-01");
            let to = end.as_deref().unwrap_or("9999-12-31");
            state.store().list_tasks_in_range(from, to).await?
        }
    };

    let csv = render_csv(&state, &tasks).await?;

    state
        .security()
        .record_access(
            Some(&user),
            "EXPORT_CSV",
            Some(&format!("{} tasks", tasks.len())),
            &client.ip,
            &client.user_agent,
        )
        .await;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tasks.csv\"".to_string(),
            ),
        ],
        csv,
    )
        .into_response())
}

async fn render_csv(state: &AppState, tasks: &[Task]) -> Result<String, ApiError> {
    // Resolve each distinct owner once.
    let mut names: HashMap<i32, String> = HashMap::new();
    for task in tasks {
        if !names.contains_key(&task.account_id) {
            let name = state
                .store()
                .get_account_by_id(task.account_id)
                .await?
                .map_or_else(|| format!("#{}", task.account_id), |a| a.display_name);
            names.insert(task.account_id, name);
        }
    }

    let mut out = String::from("日期,标题,描述,优先级,状态,负责人\n");

    for task in tasks {
        let owner = names
            .get(&task.account_id)
            .map_or("", String::as_str);

        let row = [
            task.date.as_str(),
            task.title.as_str(),
            task.description.as_deref().unwrap_or(""),
            priority_label(&task.priority),
            status_label(&task.status),
            owner,
        ];

        let line: Vec<String> = row.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    Ok(out)
}

fn priority_label(priority: &str) -> &str {
    match priority {
        "high" => "高",
        "low" => "低",
        _ => "中",
    }
}

fn status_label(status: &str) -> &str {
    match status {
        "in_progress" => "进行中",
        _ => status,
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
