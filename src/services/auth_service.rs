//! Domain service for authentication.
//!
//! Handles registration, password login with lockout, cookie auto-login
//! and password changes. Device trust and IP policy live in
//! [`crate::services::security`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    BadCredential,

    #[error("Account locked until {0}")]
    AccountLocked(String),

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Device not trusted")]
    DeviceNotTrusted,

    #[error("Auto-login token invalid")]
    TokenInvalid,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("IP address blocked")]
    IpBlocked,

    #[error("无权限")]
    PermissionDenied,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Authenticated identity stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: String,
}

impl SessionUser {
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.role == crate::db::ROLE_MANAGER
    }
}

/// Successful login, with the auto-login cookie value when requested.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub user: SessionUser,
    pub auto_login_cookie: Option<String>,
}

/// Where a request came from, as seen by the auth layer.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an employee account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] when the username is taken or the
    /// password too short.
    async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SessionUser, AuthError>;

    /// Verifies credentials, enforcing the lockout policy.
    ///
    /// The lock check runs before password verification, so a locked
    /// account refuses even a correct password. A successful login resets
    /// the failure counter.
    async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientInfo,
        remember: bool,
        trust_device: bool,
    ) -> Result<LoginSuccess, AuthError>;

    /// Logs in from an auto-login cookie.
    ///
    /// The token must carry a valid digest and be inside its lifetime, and
    /// the requesting device must be trusted for the account unless the IP
    /// is on the trusted list.
    async fn auto_login(&self, cookie: &str, client: &ClientInfo) -> Result<SessionUser, AuthError>;

    /// Validates an auto-login cookie without logging in.
    ///
    /// Skips the device-trust gate and produces no side effects; used by
    /// the pre-login status probe.
    async fn probe_token(&self, cookie: &str) -> Result<SessionUser, AuthError>;

    /// Changes a password, verifying the current one first. Invalidates
    /// all outstanding auto-login tokens for the account.
    async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
