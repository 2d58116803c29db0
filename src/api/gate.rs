//! Request gate: blocked-IP refusal, per-IP rate limiting and the
//! suspicious-pattern scan, run ahead of every API route.

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use super::AppState;
use super::auth::client_info;
use crate::db::repositories::event::EVENT_SUSPICIOUS_ACTIVITY;
use crate::services::{AuthError, SecurityService};

/// Login and register must stay reachable for an IP that rate-limited
/// itself, otherwise lockout recovery is impossible. This router is
/// nested under /api, so the paths seen here carry no prefix.
const RATE_LIMIT_EXEMPT: &[&str] = &["/auth/login", "/auth/register"];

const BODY_SCAN_LIMIT: usize = 1024 * 1024;

pub async fn request_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_info(request.headers());
    let security = state.security();

    match security.ensure_ip_allowed(&client.ip, &client.user_agent).await {
        Ok(()) => {}
        Err(AuthError::IpBlocked) => {
            return denial(StatusCode::FORBIDDEN, "IP address blocked");
        }
        Err(e) => {
            tracing::error!("Gate IP check failed for {}: {e}", client.ip);
            return denial(StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
        }
    }

    let path = request.uri().path().to_string();

    if !RATE_LIMIT_EXEMPT.contains(&path.as_str()) {
        match security.check_rate_limit(&client.ip, &client.user_agent).await {
            Ok(()) => {}
            Err(AuthError::RateLimited) => {
                return denial(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
            }
            Err(e) => {
                tracing::error!("Gate rate-limit check failed for {}: {e}", client.ip);
                return denial(StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
            }
        }
    }

    // The scan needs the body, so buffer it and rebuild the request.
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, BODY_SCAN_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return denial(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };

    let scan_target = format!(
        "{} {} {} {}",
        parts.method,
        parts.uri,
        client.user_agent,
        String::from_utf8_lossy(&bytes),
    );

    if let Some(pattern) = SecurityService::scan_suspicious(&scan_target) {
        tracing::warn!(
            "Suspicious pattern '{pattern}' from {} on {} {}",
            client.ip,
            parts.method,
            parts.uri
        );
        // Log only; the request still goes through.
        security
            .record_event(
                &client.ip,
                EVENT_SUSPICIOUS_ACTIVITY,
                Some(&format!("pattern '{pattern}' in {} {}", parts.method, parts.uri)),
                &client.user_agent,
            )
            .await;
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

fn denial(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
