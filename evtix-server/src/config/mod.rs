//! Configuration module for evtix-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    AdminConfig, GatewayConfig, RegistrationConfig, ServerConfig, ServiceConfig, SharedConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Every validated config section.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    pub registration: RegistrationConfig,
}

impl LoadedConfig {
    /// Wrap the request-path sections in their own locks. The registration
    /// section goes to a `ConfigStore` instead, since the sweeper watches it.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(self.server, self.admin, self.service, self.gateway)
    }
}

pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_owned()));

    if config.admin.secret.is_empty() {
        return invalid("admin.secret must not be empty");
    }
    if config.service.secret.is_empty() {
        return invalid("service.secret must not be empty");
    }
    if config.gateway.webhook_secret.is_empty() {
        return invalid("gateway.webhook_secret must not be empty");
    }
    if config.gateway.timeout_secs == 0 {
        return invalid("gateway.timeout_secs must be positive");
    }
    let currency = &config.gateway.currency;
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ConfigError::ValidationError(format!(
            "gateway.currency must be a three-letter ISO 4217 code, got {currency:?}"
        )));
    }
    if config.registration.unpaid_ttl_secs == 0 {
        return invalid("registration.unpaid_ttl_secs must be positive");
    }
    if config.registration.sweep_interval_secs == 0 {
        return invalid("registration.sweep_interval_secs must be positive");
    }
    if config.registration.sweep_batch <= 0 {
        return invalid("registration.sweep_batch must be positive");
    }
    Ok(())
}

fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    let FileConfig {
        server,
        admin: _,
        service,
        gateway,
        registration,
    } = file_config;

    LoadedConfig {
        server: ServerConfig {
            listen: server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        service: ServiceConfig::new(service.secret.into_bytes()),
        gateway: GatewayConfig {
            checkout_url: gateway.checkout_url,
            webhook_secret: gateway.webhook_secret.into_bytes().into_boxed_slice(),
            api_key: gateway.api_key,
            currency: gateway.currency,
            timeout: Duration::from_secs(gateway.timeout_secs),
            success_url: gateway.success_url,
            fail_url: gateway.fail_url,
            cancel_url: gateway.cancel_url,
        },
        registration: RegistrationConfig {
            unpaid_ttl: Duration::from_secs(registration.unpaid_ttl_secs),
            sweep_interval: Duration::from_secs(registration.sweep_interval_secs),
            sweep_batch: registration.sweep_batch,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
