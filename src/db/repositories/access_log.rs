use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::access_logs;

#[derive(Debug, Clone)]
pub struct AccessLog {
    pub id: i32,
    pub account_id: Option<i32>,
    pub account_name: String,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: String,
}

impl From<access_logs::Model> for AccessLog {
    fn from(model: access_logs::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            account_name: model.account_name,
            action: model.action,
            details: model.details,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
        }
    }
}

pub struct AccessLogRepository {
    conn: DatabaseConnection,
}

impl AccessLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        account_id: Option<i32>,
        account_name: &str,
        action: &str,
        details: Option<&str>,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<()> {
        let active = access_logs::ActiveModel {
            account_id: Set(account_id),
            account_name: Set(account_name.to_string()),
            action: Set(action.to_string()),
            details: Set(details.map(ToString::to_string)),
            ip_address: Set(ip_address.to_string()),
            user_agent: Set(user_agent.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert access log")?;

        Ok(())
    }

    /// List logs with optional filters. Date bounds are plain strings:
    /// timestamps are RFC3339 in UTC, so a YYYY-MM-DD lower bound and an
    /// exclusive next-day upper bound compare correctly.
    pub async fn list(
        &self,
        account_name: Option<&str>,
        action: Option<&str>,
        created_from: Option<&str>,
        created_before: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<AccessLog>, u64)> {
        let mut query = access_logs::Entity::find();

        if let Some(name) = account_name {
            query = query.filter(access_logs::Column::AccountName.eq(name));
        }

        if let Some(action) = action {
            query = query.filter(access_logs::Column::Action.eq(action));
        }

        if let Some(from) = created_from {
            query = query.filter(access_logs::Column::CreatedAt.gte(from));
        }

        if let Some(before) = created_before {
            query = query.filter(access_logs::Column::CreatedAt.lt(before));
        }

        let paginator = query
            .order_by_desc(access_logs::Column::CreatedAt)
            .paginate(&self.conn, per_page.max(1));

        let total = paginator
            .num_items()
            .await
            .context("Failed to count access logs")?;

        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch access logs page")?;

        Ok((rows.into_iter().map(AccessLog::from).collect(), total))
    }
}
