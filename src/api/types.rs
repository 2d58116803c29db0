use serde::Serialize;

use crate::db::{AccessLog, Account, SecurityEvent, Task, TrustedDevice};
use crate::services::SessionUser;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: String,
}

impl From<&SessionUser> for UserDto {
    fn from(user: &SessionUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl From<Account> for AccountDto {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            username: a.username,
            display_name: a.display_name,
            role: a.role,
            is_active: a.is_active,
            last_login: a.last_login,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceDto {
    pub id: i32,
    pub ip_address: String,
    pub user_agent: String,
    pub last_used: String,
    pub created_at: String,
}

impl From<TrustedDevice> for DeviceDto {
    fn from(d: TrustedDevice) -> Self {
        Self {
            id: d.id,
            ip_address: d.ip_address,
            user_agent: d.user_agent,
            last_used: d.last_used,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SecurityEventDto {
    pub id: i32,
    pub ip_address: String,
    pub event_type: String,
    pub details: Option<String>,
    pub user_agent: String,
    pub created_at: String,
    pub is_blocked: bool,
}

impl From<SecurityEvent> for SecurityEventDto {
    fn from(e: SecurityEvent) -> Self {
        Self {
            id: e.id,
            ip_address: e.ip_address,
            event_type: e.event_type,
            details: e.details,
            user_agent: e.user_agent,
            created_at: e.created_at,
            is_blocked: e.is_blocked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessLogDto {
    pub id: i32,
    pub account_name: String,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: String,
    pub created_at: String,
}

impl From<AccessLog> for AccessLogDto {
    fn from(l: AccessLog) -> Self {
        Self {
            id: l.id,
            account_name: l.account_name,
            action: l.action,
            details: l.details,
            ip_address: l.ip_address,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskDto {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub status: String,
    pub priority: String,
    pub account_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskDto {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            date: t.date,
            status: t.status,
            priority: t.priority,
            account_id: t.account_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}
