pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use std::sync::Arc;

use crate::app::auth::AuthService;
use crate::app::nonce::NonceService;
use crate::app::notifications::NotificationStore;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub nonce_key: [u8; 32],
    pub nonce_lifetime_seconds: u64,
}

impl AppState {
    pub fn new(store: Arc<dyn NotificationStore>, config: &AppConfig) -> Self {
        Self {
            store,
            admin_token: config.admin_token.clone(),
            paseto_access_key: config.paseto_access_key,
            access_ttl_minutes: config.access_ttl_minutes,
            nonce_key: config.nonce_key,
            nonce_lifetime_seconds: config.nonce_lifetime_seconds,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.paseto_access_key, self.access_ttl_minutes)
    }

    pub fn nonce_service(&self) -> NonceService {
        NonceService::new(self.nonce_key, self.nonce_lifetime_seconds)
    }
}
