use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::access_log::AccessLog;
pub use repositories::account::{Account, ROLE_EMPLOYEE, ROLE_MANAGER};
pub use repositories::device::TrustedDevice;
pub use repositories::event::SecurityEvent;
pub use repositories::task::Task;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn device_repo(&self) -> repositories::device::DeviceRepository {
        repositories::device::DeviceRepository::new(self.conn.clone())
    }

    fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    fn access_log_repo(&self) -> repositories::access_log::AccessLogRepository {
        repositories::access_log::AccessLogRepository::new(self.conn.clone())
    }

    fn task_repo(&self) -> repositories::task::TaskRepository {
        repositories::task::TaskRepository::new(self.conn.clone())
    }

    // ========== Accounts ==========

    pub async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.account_repo().get_by_username(username).await
    }

    pub async fn get_account_by_username_with_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        self.account_repo().get_by_username_with_hash(username).await
    }

    pub async fn get_account_by_id(&self, id: i32) -> Result<Option<Account>> {
        self.account_repo().get_by_id(id).await
    }

    pub async fn list_employees(&self) -> Result<Vec<Account>> {
        self.account_repo().list_employees().await
    }

    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
        role: &str,
    ) -> Result<Account> {
        self.account_repo()
            .create(username, password, display_name, role)
            .await
    }

    pub async fn verify_account_password(&self, username: &str, password: &str) -> Result<bool> {
        self.account_repo().verify_password(username, password).await
    }

    pub async fn record_login_failure(
        &self,
        account_id: i32,
        threshold: i32,
        lockout_minutes: i64,
    ) -> Result<()> {
        self.account_repo()
            .record_failure(account_id, threshold, lockout_minutes)
            .await
    }

    pub async fn record_login_success(&self, account_id: i32) -> Result<()> {
        self.account_repo().record_success(account_id).await
    }

    pub async fn update_account_password(&self, username: &str, new_password: &str) -> Result<()> {
        self.account_repo()
            .update_password(username, new_password)
            .await
    }

    // ========== Trusted devices ==========

    pub async fn is_device_trusted(
        &self,
        account_id: i32,
        device_hash: &str,
        ip: &str,
    ) -> Result<bool> {
        self.device_repo()
            .is_trusted(account_id, device_hash, ip)
            .await
    }

    pub async fn trust_device(
        &self,
        account_id: i32,
        device_hash: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<()> {
        self.device_repo()
            .trust(account_id, device_hash, ip_address, user_agent)
            .await
    }

    pub async fn revoke_device(&self, account_id: i32, device_id: i32) -> Result<bool> {
        self.device_repo().revoke(account_id, device_id).await
    }

    pub async fn list_devices(&self, account_id: i32) -> Result<Vec<TrustedDevice>> {
        self.device_repo().list_for_account(account_id).await
    }

    // ========== Security events ==========

    pub async fn record_security_event(
        &self,
        ip_address: &str,
        event_type: &str,
        details: Option<&str>,
        user_agent: &str,
    ) -> Result<()> {
        self.event_repo()
            .record(ip_address, event_type, details, user_agent)
            .await
    }

    pub async fn count_recent_events(&self, ip_address: &str, window_seconds: i64) -> Result<u64> {
        self.event_repo()
            .count_recent(ip_address, window_seconds)
            .await
    }

    pub async fn is_ip_blocked(&self, ip_address: &str) -> Result<bool> {
        self.event_repo().is_blocked(ip_address).await
    }

    pub async fn block_ip(&self, ip_address: &str) -> Result<u64> {
        self.event_repo().block_ip(ip_address).await
    }

    pub async fn list_security_events(
        &self,
        ip_address: Option<&str>,
        event_type: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<SecurityEvent>, u64)> {
        self.event_repo()
            .list(ip_address, event_type, page, per_page)
            .await
    }

    // ========== Access logs ==========

    pub async fn add_access_log(
        &self,
        account_id: Option<i32>,
        account_name: &str,
        action: &str,
        details: Option<&str>,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<()> {
        self.access_log_repo()
            .add(
                account_id,
                account_name,
                action,
                details,
                ip_address,
                user_agent,
            )
            .await
    }

    pub async fn list_access_logs(
        &self,
        account_name: Option<&str>,
        action: Option<&str>,
        created_from: Option<&str>,
        created_before: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<AccessLog>, u64)> {
        self.access_log_repo()
            .list(
                account_name,
                action,
                created_from,
                created_before,
                page,
                per_page,
            )
            .await
    }

    // ========== Tasks ==========

    pub async fn create_task(
        &self,
        account_id: i32,
        title: &str,
        description: Option<&str>,
        date: &str,
        priority: &str,
    ) -> Result<Task> {
        self.task_repo()
            .create(account_id, title, description, date, priority)
            .await
    }

    pub async fn get_task(&self, id: i32) -> Result<Option<Task>> {
        self.task_repo().get_by_id(id).await
    }

    pub async fn update_task(
        &self,
        id: i32,
        title: &str,
        description: Option<&str>,
        date: &str,
        priority: &str,
    ) -> Result<Option<Task>> {
        self.task_repo()
            .update(id, title, description, date, priority)
            .await
    }

    pub async fn delete_task(&self, id: i32) -> Result<bool> {
        self.task_repo().delete(id).await
    }

    pub async fn list_tasks_for_account(&self, account_id: i32) -> Result<Vec<Task>> {
        self.task_repo().list_for_account(account_id).await
    }

    pub async fn list_all_tasks(&self) -> Result<Vec<Task>> {
        self.task_repo().list_all().await
    }

    pub async fn list_tasks_in_range(&self, from: &str, to: &str) -> Result<Vec<Task>> {
        self.task_repo().list_in_range(from, to).await
    }
}
