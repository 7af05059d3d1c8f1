//! Runtime configuration re-exports.
//!
//! The validated config types live in `evtix_core::config`.

pub use evtix_core::config::{
    AdminConfig, ConfigStore, GatewayConfig, RegistrationConfig, ServerConfig, ServiceConfig,
    SharedConfig,
};
