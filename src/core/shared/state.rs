use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::security::jwt::{JwtConfig, JwtManager};
use crate::storage::FileStorage;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub jwt: JwtManager,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    pub fn new(
        conn: DbPool,
        config: AppConfig,
        storage: Arc<dyn FileStorage>,
    ) -> Result<Self, anyhow::Error> {
        let jwt = JwtManager::new(
            JwtConfig {
                access_token_expiry_minutes: config.auth.jwt_expiry_minutes,
                ..JwtConfig::default()
            },
            &config.auth.jwt_secret,
        )?;

        Ok(Self {
            conn,
            config,
            jwt,
            storage,
        })
    }

    /// Absolute URL for an API path, used in pagination links.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.config.server.base_url, path)
    }
}
