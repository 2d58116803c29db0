pub use super::access_logs::Entity as AccessLogs;
pub use super::accounts::Entity as Accounts;
pub use super::security_events::Entity as SecurityEvents;
pub use super::tasks::Entity as Tasks;
pub use super::trusted_devices::Entity as TrustedDevices;
