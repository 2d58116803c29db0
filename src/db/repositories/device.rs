use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::trusted_devices;

/// A device trust record as exposed to handlers.
#[derive(Debug, Clone)]
pub struct TrustedDevice {
    pub id: i32,
    pub account_id: i32,
    pub device_hash: String,
    pub ip_address: String,
    pub user_agent: String,
    pub last_used: String,
    pub created_at: String,
    pub is_active: bool,
}

impl From<trusted_devices::Model> for TrustedDevice {
    fn from(model: trusted_devices::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            device_hash: model.device_hash,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            last_used: model.last_used,
            created_at: model.created_at,
            is_active: model.is_active,
        }
    }
}

pub struct DeviceRepository {
    conn: DatabaseConnection,
}

impl DeviceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Check whether a device fingerprint is actively trusted for an
    /// account, bumping last_used on a hit. The IP is matched alongside
    /// the fingerprint even though the fingerprint already covers it.
    pub async fn is_trusted(&self, account_id: i32, device_hash: &str, ip: &str) -> Result<bool> {
        let device = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::AccountId.eq(account_id))
            .filter(trusted_devices::Column::DeviceHash.eq(device_hash))
            .filter(trusted_devices::Column::IpAddress.eq(ip))
            .filter(trusted_devices::Column::IsActive.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query trusted device")?;

        let Some(device) = device else {
            return Ok(false);
        };

        let mut active: trusted_devices::ActiveModel = device.into();
        active.last_used = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Register a device as trusted for an account. If a row for this
    /// fingerprint already exists in any state the call is a no-op, so a
    /// revoked device can never be re-trusted by logging in again.
    pub async fn trust(
        &self,
        account_id: i32,
        device_hash: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<()> {
        let existing = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::AccountId.eq(account_id))
            .filter(trusted_devices::Column::DeviceHash.eq(device_hash))
            .filter(trusted_devices::Column::IpAddress.eq(ip_address))
            .one(&self.conn)
            .await
            .context("Failed to query existing device record")?;

        if existing.is_some() {
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();

        let active = trusted_devices::ActiveModel {
            account_id: Set(account_id),
            device_hash: Set(device_hash.to_string()),
            ip_address: Set(ip_address.to_string()),
            user_agent: Set(user_agent.to_string()),
            last_used: Set(now.clone()),
            created_at: Set(now),
            is_active: Set(true),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert trusted device")?;

        Ok(())
    }

    /// Revoke a device. Only the owning account may revoke; returns false
    /// when the device does not exist or belongs to someone else.
    pub async fn revoke(&self, account_id: i32, device_id: i32) -> Result<bool> {
        let device = trusted_devices::Entity::find_by_id(device_id)
            .one(&self.conn)
            .await
            .context("Failed to query device for revocation")?;

        let Some(device) = device else {
            return Ok(false);
        };

        if device.account_id != account_id {
            return Ok(false);
        }

        let mut active: trusted_devices::ActiveModel = device.into();
        active.is_active = Set(false);
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn list_for_account(&self, account_id: i32) -> Result<Vec<TrustedDevice>> {
        let rows = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::AccountId.eq(account_id))
            .filter(trusted_devices::Column::IsActive.eq(true))
            .order_by_desc(trusted_devices::Column::LastUsed)
            .all(&self.conn)
            .await
            .context("Failed to list trusted devices")?;

        Ok(rows.into_iter().map(TrustedDevice::from).collect())
    }
}
