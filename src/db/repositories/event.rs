use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::security_events;

pub const EVENT_LOGIN_FAILED: &str = "LOGIN_FAILED";
pub const EVENT_RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
pub const EVENT_SUSPICIOUS_ACTIVITY: &str = "SUSPICIOUS_ACTIVITY";
pub const EVENT_BLOCKED_IP_REQUEST: &str = "BLOCKED_IP_REQUEST";
pub const EVENT_IP_BLOCKED: &str = "IP_BLOCKED";

#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub id: i32,
    pub ip_address: String,
    pub event_type: String,
    pub details: Option<String>,
    pub user_agent: String,
    pub created_at: String,
    pub is_blocked: bool,
}

impl From<security_events::Model> for SecurityEvent {
    fn from(model: security_events::Model) -> Self {
        Self {
            id: model.id,
            ip_address: model.ip_address,
            event_type: model.event_type,
            details: model.details,
            user_agent: model.user_agent,
            created_at: model.created_at,
            is_blocked: model.is_blocked,
        }
    }
}

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        ip_address: &str,
        event_type: &str,
        details: Option<&str>,
        user_agent: &str,
    ) -> Result<()> {
        let active = security_events::ActiveModel {
            ip_address: Set(ip_address.to_string()),
            event_type: Set(event_type.to_string()),
            details: Set(details.map(ToString::to_string)),
            user_agent: Set(user_agent.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            is_blocked: Set(false),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert security event")?;

        Ok(())
    }

    /// Count events for an IP inside the sliding window ending now.
    /// Timestamps are RFC3339 in UTC, so string comparison orders them.
    pub async fn count_recent(&self, ip_address: &str, window_seconds: i64) -> Result<u64> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::seconds(window_seconds)).to_rfc3339();

        let count = security_events::Entity::find()
            .filter(security_events::Column::IpAddress.eq(ip_address))
            .filter(security_events::Column::CreatedAt.gte(cutoff))
            .count(&self.conn)
            .await
            .context("Failed to count recent security events")?;

        Ok(count)
    }

    /// An IP is blocked once any of its event rows carries the flag.
    pub async fn is_blocked(&self, ip_address: &str) -> Result<bool> {
        let count = security_events::Entity::find()
            .filter(security_events::Column::IpAddress.eq(ip_address))
            .filter(security_events::Column::IsBlocked.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to query blocked IP")?;

        Ok(count > 0)
    }

    /// Flag every existing event row for an IP as blocked. Returns the
    /// number of rows updated; an IP with no history yields zero and is
    /// not blocked.
    pub async fn block_ip(&self, ip_address: &str) -> Result<u64> {
        let rows = security_events::Entity::find()
            .filter(security_events::Column::IpAddress.eq(ip_address))
            .filter(security_events::Column::IsBlocked.eq(false))
            .all(&self.conn)
            .await
            .context("Failed to query events for IP block")?;

        let updated = rows.len() as u64;

        for row in rows {
            let mut active: security_events::ActiveModel = row.into();
            active.is_blocked = Set(true);
            active.update(&self.conn).await?;
        }

        Ok(updated)
    }

    pub async fn list(
        &self,
        ip_address: Option<&str>,
        event_type: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<SecurityEvent>, u64)> {
        let mut query = security_events::Entity::find();

        if let Some(ip) = ip_address {
            query = query.filter(security_events::Column::IpAddress.eq(ip));
        }

        if let Some(kind) = event_type {
            query = query.filter(security_events::Column::EventType.eq(kind));
        }

        let paginator = query
            .order_by_desc(security_events::Column::CreatedAt)
            .paginate(&self.conn, per_page.max(1));

        let total = paginator
            .num_items()
            .await
            .context("Failed to count security events")?;

        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch security events page")?;

        Ok((rows.into_iter().map(SecurityEvent::from).collect(), total))
    }
}
