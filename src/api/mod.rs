use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod devices;
mod error;
mod export;
mod gate;
mod logs;
mod security;
mod tasks;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn security(&self) -> &crate::services::SecurityService {
        &self.shared.security
    }

    #[must_use]
    pub fn auth(&self) -> &crate::services::SeaOrmAuthService {
        &self.shared.auth
    }
}

#[must_use]
pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState { shared })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config().clone();

    let protected_routes = create_protected_router();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_minutes,
        )));

    // The gate layer is added last so it runs before the session layer
    // and every handler.
    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/auto-login", post(auth::auto_login))
        .route("/auth/status", get(auth::status))
        .route("/auth/logout", post(auth::logout))
        .layer(session_layer)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::request_gate,
        ))
        .with_state(state);

    let cors_layer = if config.server.cors_allowed_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .server
            .cors_allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/password", put(auth::change_password))
        .route("/devices", get(devices::list_devices))
        .route("/devices/{id}", delete(devices::revoke_device))
        .route("/security-events", get(security::list_events))
        .route("/block-ip/{ip}", post(security::block_ip))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks", post(tasks::create_task))
        .route("/tasks/{id}", put(tasks::update_task))
        .route("/tasks/{id}", delete(tasks::delete_task))
        .route("/users", get(users::list_users))
        .route("/logs", get(logs::list_logs))
        .route("/export-csv", get(export::export_csv))
        .route_layer(middleware::from_fn(auth::auth_middleware))
}
