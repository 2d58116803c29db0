pub mod prelude;

pub mod access_logs;
pub mod accounts;
pub mod security_events;
pub mod tasks;
pub mod trusted_devices;
