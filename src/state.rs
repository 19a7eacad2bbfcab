//! Shared state handed to every Axum handler.

use crate::config::{JwtConfig, Settings};
use crate::db::AsyncDbPool;
use crate::repositories::Repositories;
use crate::services::Services;

/// Services, the pool for health probes, and the JWT settings.
///
/// Cloning is cheap: services hold repositories, which hold the bb8 pool.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub db_pool: AsyncDbPool,
    pub jwt_config: JwtConfig,
}

impl AppState {
    /// Wires repositories and services on top of `pool`.
    pub fn new(pool: AsyncDbPool, settings: &Settings) -> Self {
        let repos = Repositories::new(pool.clone());
        let services = Services::new(repos, &settings.shopping_list);
        Self::with_services(services, pool, settings.jwt.clone())
    }

    pub fn with_services(services: Services, db_pool: AsyncDbPool, jwt_config: JwtConfig) -> Self {
        Self {
            services,
            db_pool,
            jwt_config,
        }
    }
}
