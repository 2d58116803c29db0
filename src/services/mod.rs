pub mod auth_service;
pub mod auth_service_impl;
pub mod security;
pub mod token;

pub use auth_service::{AuthError, AuthService, ClientInfo, LoginSuccess, SessionUser};
pub use auth_service_impl::SeaOrmAuthService;
pub use security::SecurityService;
pub use token::{AUTO_LOGIN_COOKIE, AutoLoginToken, device_fingerprint};
