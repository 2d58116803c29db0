use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task;

use crate::entities::accounts;

pub const ROLE_EMPLOYEE: &str = "employee";
pub const ROLE_MANAGER: &str = "manager";

/// Account data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub login_attempts: i32,
    pub locked_until: Option<String>,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl Account {
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.role == ROLE_MANAGER
    }

    /// A lock expiry in the future refuses login regardless of
    /// credential correctness.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked_until
            .as_deref()
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
            .is_some_and(|until| until > chrono::Utc::now())
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            display_name: model.display_name,
            role: model.role,
            is_active: model.is_active,
            login_attempts: model.login_attempts,
            locked_until: model.locked_until,
            last_login: model.last_login,
            created_at: model.created_at,
        }
    }
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account by username")?;

        Ok(account.map(Account::from))
    }

    /// Get an account along with its password hash. The hash is needed by
    /// the auto-login token protocol, which keys its digest on a slice of it.
    pub async fn get_by_username_with_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account by username")?;

        Ok(account.map(|a| {
            let password_hash = a.password_hash.clone();
            (Account::from(a), password_hash)
        }))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account.map(Account::from))
    }

    pub async fn list_employees(&self) -> Result<Vec<Account>> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::Role.eq(ROLE_EMPLOYEE))
            .all(&self.conn)
            .await
            .context("Failed to list employee accounts")?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    pub async fn create(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
        role: &str,
    ) -> Result<Account> {
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = accounts::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            display_name: Set(display_name.to_string()),
            role: Set(role.to_string()),
            is_active: Set(true),
            login_attempts: Set(0),
            locked_until: Set(None),
            last_login: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert account")?;

        Ok(Account::from(model))
    }

    /// Verify a password for an account.
    /// Note: uses `spawn_blocking` because Argon2 verification is
    /// CPU-intensive and would block the async runtime if run directly.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account for password verification")?;

        let Some(account) = account else {
            return Ok(false);
        };

        let password_hash = account.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Record a failed login attempt. Once the counter reaches `threshold`
    /// the account is locked until now + `lockout_minutes`.
    pub async fn record_failure(
        &self,
        account_id: i32,
        threshold: i32,
        lockout_minutes: i64,
    ) -> Result<()> {
        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.conn)
            .await
            .context("Failed to query account for failure recording")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let attempts = account.login_attempts + 1;

        let mut active: accounts::ActiveModel = account.into();
        active.login_attempts = Set(attempts);

        if attempts >= threshold {
            let until = chrono::Utc::now() + chrono::Duration::minutes(lockout_minutes);
            active.locked_until = Set(Some(until.to_rfc3339()));
        }

        active.update(&self.conn).await?;
        Ok(())
    }

    /// Record a successful login: the failure counter resets to zero and
    /// last_login is updated.
    pub async fn record_success(&self, account_id: i32) -> Result<()> {
        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.conn)
            .await
            .context("Failed to query account for success recording")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: accounts::ActiveModel = account.into();
        active.login_attempts = Set(0);
        active.locked_until = Set(None);
        active.last_login = Set(Some(now));
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Update the password hash. Invalidates every issued auto-login token,
    /// since the token digest is keyed on a slice of the hash.
    pub async fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account for password update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {username}"))?;

        let password = new_password.to_string();
        let new_hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .context("Password hashing task panicked")??;

        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(new_hash);
        active.update(&self.conn).await?;

        Ok(())
    }
}

/// Hash a password using Argon2id with default params.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
