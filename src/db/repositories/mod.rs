pub mod access_log;
pub mod account;
pub mod device;
pub mod event;
pub mod task;
