//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;

use crate::db::repositories::event::EVENT_LOGIN_FAILED;
use crate::db::{Account, ROLE_EMPLOYEE, Store};
use crate::services::auth_service::{
    AuthError, AuthService, ClientInfo, LoginSuccess, SessionUser,
};
use crate::services::security::SecurityService;
use crate::services::token::{AutoLoginToken, device_fingerprint};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityService,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityService) -> Self {
        Self { store, security }
    }
}

fn session_user(account: &Account) -> SessionUser {
    SessionUser {
        id: account.id,
        username: account.username.clone(),
        display_name: account.display_name.clone(),
        role: account.role.clone(),
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SessionUser, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }

        if password.len() < 6 {
            return Err(AuthError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        if self.store.get_account_by_username(username).await?.is_some() {
            return Err(AuthError::Validation("Username already taken".to_string()));
        }

        let display_name = if display_name.trim().is_empty() {
            username
        } else {
            display_name
        };

        let account = self
            .store
            .create_account(username, password, display_name, ROLE_EMPLOYEE)
            .await?;

        Ok(session_user(&account))
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientInfo,
        remember: bool,
        trust_device: bool,
    ) -> Result<LoginSuccess, AuthError> {
        let Some((account, password_hash)) = self
            .store
            .get_account_by_username_with_hash(username)
            .await?
        else {
            self.security
                .record_event(
                    &client.ip,
                    EVENT_LOGIN_FAILED,
                    Some(&format!("unknown user {username}")),
                    &client.user_agent,
                )
                .await;
            return Err(AuthError::BadCredential);
        };

        // Lock check comes first: a locked account refuses even a correct
        // password, and the attempt must not advance the counter.
        if account.is_locked() {
            return Err(AuthError::AccountLocked(
                account.locked_until.clone().unwrap_or_default(),
            ));
        }

        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let config = self.security.config();

        let is_valid = self
            .store
            .verify_account_password(username, password)
            .await?;

        if !is_valid {
            self.store
                .record_login_failure(account.id, config.max_login_attempts, config.lockout_minutes)
                .await?;
            self.security
                .record_event(
                    &client.ip,
                    EVENT_LOGIN_FAILED,
                    Some(&format!("wrong password for {username}")),
                    &client.user_agent,
                )
                .await;
            return Err(AuthError::BadCredential);
        }

        self.store.record_login_success(account.id).await?;

        if trust_device {
            let fingerprint = device_fingerprint(&client.ip, &client.user_agent);
            self.store
                .trust_device(account.id, &fingerprint, &client.ip, &client.user_agent)
                .await?;
        }

        let user = session_user(&account);

        self.security
            .record_access(Some(&user), "LOGIN", None, &client.ip, &client.user_agent)
            .await;

        let auto_login_cookie = (remember && config.auto_login_enabled)
            .then(|| AutoLoginToken::issue(username, &password_hash).encode());

        Ok(LoginSuccess {
            user,
            auto_login_cookie,
        })
    }

    async fn auto_login(
        &self,
        cookie: &str,
        client: &ClientInfo,
    ) -> Result<SessionUser, AuthError> {
        let config = self.security.config();

        if !config.auto_login_enabled {
            return Err(AuthError::TokenInvalid);
        }

        let token = AutoLoginToken::decode(cookie).ok_or(AuthError::TokenInvalid)?;

        let (account, password_hash) = self
            .store
            .get_account_by_username_with_hash(&token.username)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if !token.verify(&password_hash, config.auto_login_lifetime_days) {
            return Err(AuthError::TokenInvalid);
        }

        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        if account.is_locked() {
            return Err(AuthError::AccountLocked(
                account.locked_until.clone().unwrap_or_default(),
            ));
        }

        // A valid token is not enough on its own: the device must have
        // been trusted at a past password login, unless the IP is on the
        // trusted list.
        if !self.security.is_trusted_ip(&client.ip) {
            let fingerprint = device_fingerprint(&client.ip, &client.user_agent);
            if !self
                .store
                .is_device_trusted(account.id, &fingerprint, &client.ip)
                .await?
            {
                return Err(AuthError::DeviceNotTrusted);
            }
        }

        self.store.record_login_success(account.id).await?;

        let user = session_user(&account);

        self.security
            .record_access(
                Some(&user),
                "AUTO_LOGIN",
                None,
                &client.ip,
                &client.user_agent,
            )
            .await;

        Ok(user)
    }

    async fn probe_token(&self, cookie: &str) -> Result<SessionUser, AuthError> {
        let config = self.security.config();

        if !config.auto_login_enabled {
            return Err(AuthError::TokenInvalid);
        }

        let token = AutoLoginToken::decode(cookie).ok_or(AuthError::TokenInvalid)?;

        let (account, password_hash) = self
            .store
            .get_account_by_username_with_hash(&token.username)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if !token.verify(&password_hash, config.auto_login_lifetime_days) {
            return Err(AuthError::TokenInvalid);
        }

        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(session_user(&account))
    }

    async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < 6 {
            return Err(AuthError::Validation(
                "New password must be at least 6 characters".to_string(),
            ));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let is_valid = self
            .store
            .verify_account_password(username, current_password)
            .await?;

        if !is_valid {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .update_account_password(username, new_password)
            .await?;

        Ok(())
    }
}
