use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto};
use crate::services::{AUTO_LOGIN_COOKIE, AuthError, AuthService, ClientInfo, SessionUser};

const SESSION_USER_KEY: &str = "user";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
    #[serde(default)]
    pub trust_device: bool,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
    pub auto_login_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the client IP and user agent. `X-Forwarded-For` wins so the
/// service works behind the reverse proxy it is deployed with.
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string());

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| "unknown".to_string(), ToString::to_string);

    ClientInfo { ip, user_agent }
}

/// Get the logged-in user from the session, 401 when not authenticated.
pub async fn current_user(session: &Session) -> Result<SessionUser, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))
}

/// Like [`current_user`] but refuses non-managers.
pub async fn require_manager(session: &Session) -> Result<SessionUser, ApiError> {
    let user = current_user(session).await?;
    if !user.is_manager() {
        return Err(ApiError::permission_denied());
    }
    Ok(user)
}

fn auto_login_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((AUTO_LOGIN_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config().server.secure_cookies)
        .max_age(time::Duration::days(
            state.config().security.auto_login_lifetime_days,
        ))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(AUTO_LOGIN_COOKIE);
    cookie.set_path("/");
    cookie
}

// ============================================================================
// Middleware
// ============================================================================

/// Session-backed authentication for the protected routes.
pub async fn auth_middleware(session: Session, request: Request, next: Next) -> Response {
    match session.get::<SessionUser>(SESSION_USER_KEY).await {
        Ok(Some(user)) => {
            tracing::Span::current().record("user_id", user.username.as_str());
            next.run(request).await
        }
        Ok(None) => ApiError::Unauthorized("Not authenticated".to_string()).into_response(),
        Err(e) => ApiError::internal(format!("Session error: {e}")).into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let client = client_info(&headers);

    let user = state
        .auth()
        .register(&payload.username, &payload.password, &payload.display_name)
        .await?;

    state
        .security()
        .record_access(
            Some(&user),
            "REGISTER",
            None,
            &client.ip,
            &client.user_agent,
        )
        .await;

    Ok(Json(ApiResponse::success(UserDto::from(&user))))
}

/// POST /auth/login
/// Password login. `remember_me` issues the auto-login cookie;
/// `trust_device` registers this device fingerprint for later auto-login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserDto>>), ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let client = client_info(&headers);

    let outcome = state
        .auth()
        .login(
            &payload.username,
            &payload.password,
            &client,
            payload.remember_me,
            payload.trust_device,
        )
        .await?;

    session
        .insert(SESSION_USER_KEY, &outcome.user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    let jar = match outcome.auto_login_cookie {
        Some(value) => jar.add(auto_login_cookie(&state, value)),
        None => jar,
    };

    Ok((jar, Json(ApiResponse::success(UserDto::from(&outcome.user)))))
}

/// POST /auth/auto-login
/// Cookie-based login. A token that fails validation is cleared so the
/// client stops presenting it.
pub async fn auto_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let client = client_info(&headers);

    let Some(cookie) = jar.get(AUTO_LOGIN_COOKIE) else {
        return ApiError::Unauthorized("No auto-login cookie".to_string()).into_response();
    };
    let raw = cookie.value().to_string();

    match state.auth().auto_login(&raw, &client).await {
        Ok(user) => {
            if let Err(e) = session.insert(SESSION_USER_KEY, &user).await {
                return ApiError::internal(format!("Failed to create session: {e}"))
                    .into_response();
            }

            (jar, Json(ApiResponse::success(UserDto::from(&user)))).into_response()
        }
        Err(e @ AuthError::TokenInvalid) => {
            let jar = jar.remove(removal_cookie());
            (jar, ApiError::from(e)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /auth/status
/// Pre-login probe: reports whether a session exists and whether the
/// auto-login cookie would be accepted. Performs no login and skips the
/// device-trust gate.
pub async fn status(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
) -> Response {
    if let Ok(Some(user)) = session.get::<SessionUser>(SESSION_USER_KEY).await {
        let body = StatusResponse {
            logged_in: true,
            user: Some(UserDto::from(&user)),
            auto_login_available: false,
            username: None,
        };
        return Json(ApiResponse::success(body)).into_response();
    }

    let Some(cookie) = jar.get(AUTO_LOGIN_COOKIE) else {
        let body = StatusResponse {
            logged_in: false,
            user: None,
            auto_login_available: false,
            username: None,
        };
        return Json(ApiResponse::success(body)).into_response();
    };
    let raw = cookie.value().to_string();

    match state.auth().probe_token(&raw).await {
        Ok(user) => {
            let body = StatusResponse {
                logged_in: false,
                user: None,
                auto_login_available: true,
                username: Some(user.username),
            };
            (jar, Json(ApiResponse::success(body))).into_response()
        }
        Err(_) => {
            let jar = jar.remove(removal_cookie());
            let body = StatusResponse {
                logged_in: false,
                user: None,
                auto_login_available: false,
                username: None,
            };
            (jar, Json(ApiResponse::success(body))).into_response()
        }
    }
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let client = client_info(&headers);

    if let Ok(Some(user)) = session.get::<SessionUser>(SESSION_USER_KEY).await {
        state
            .security()
            .record_access(Some(&user), "LOGOUT", None, &client.ip, &client.user_agent)
            .await;
    }

    let _ = session.flush().await;
    let jar = jar.remove(removal_cookie());

    (
        jar,
        Json(ApiResponse::success(MessageResponse {
            message: "Logged out".to_string(),
        })),
    )
        .into_response()
}

/// PUT /auth/password
/// Changing the password invalidates every issued auto-login cookie.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&session).await?;
    let client = client_info(&headers);

    state
        .auth()
        .change_password(
            &user.username,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    state
        .security()
        .record_access(
            Some(&user),
            "PASSWORD_CHANGED",
            None,
            &client.ip,
            &client.user_agent,
        )
        .await;

    tracing::info!("Password changed for user: {}", user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}
