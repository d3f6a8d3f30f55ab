use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::SharedStore;
use crate::realtime::Gateway;

/// Shared application state handed to every handler and gate
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub tokens: TokenService,
    pub gateway: Gateway,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: SharedStore, config: AppConfig) -> Self {
        Self {
            store,
            tokens: TokenService::new(&config.security.jwt_secret),
            gateway: Gateway::new(),
            config: Arc::new(config),
        }
    }
}
