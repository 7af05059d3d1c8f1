//! Runtime configuration types for evtix.
//!
//! These are the validated values the server builds from its TOML file. Each
//! section sits behind its own lock so a SIGHUP reload can swap them without
//! blocking unrelated readers.

mod admin;
mod config_store;
mod gateway;
mod registration;
mod server;
mod service;

pub use admin::AdminConfig;
pub use config_store::{ConfigStore, ConfigWatcher};
pub use gateway::GatewayConfig;
pub use registration::RegistrationConfig;
pub use server::ServerConfig;
pub use service::ServiceConfig;

use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

/// Shared configuration state with separate locks for each section.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub admin: Arc<RwLock<AdminConfig>>,
    /// Secret shared with the identity backend that signs service calls.
    pub service: Arc<RwLock<ServiceConfig>>,
    /// Hosted checkout provider settings, shared with the checkout client.
    pub gateway: Arc<RwLock<GatewayConfig>>,
}

impl SharedConfig {
    pub fn new(
        server: ServerConfig,
        admin: AdminConfig,
        service: ServiceConfig,
        gateway: GatewayConfig,
    ) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            admin: Arc::new(RwLock::new(admin)),
            service: Arc::new(RwLock::new(service)),
            gateway: Arc::new(RwLock::new(gateway)),
        }
    }

    pub async fn server(&self) -> RwLockReadGuard<'_, ServerConfig> {
        self.server.read().await
    }

    pub async fn admin(&self) -> RwLockReadGuard<'_, AdminConfig> {
        self.admin.read().await
    }

    pub async fn service(&self) -> RwLockReadGuard<'_, ServiceConfig> {
        self.service.read().await
    }

    pub async fn gateway(&self) -> RwLockReadGuard<'_, GatewayConfig> {
        self.gateway.read().await
    }

    /// Replace every section. Sections are written one after another, never
    /// holding two write locks at once.
    pub async fn update_all(
        &self,
        server: ServerConfig,
        admin: AdminConfig,
        service: ServiceConfig,
        gateway: GatewayConfig,
    ) {
        *self.server.write().await = server;
        *self.admin.write().await = admin;
        *self.service.write().await = service;
        *self.gateway.write().await = gateway;
    }
}
