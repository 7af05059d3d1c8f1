//! Shared types for the evtix registration server.
//!
//! * [`objects`] – request / response bodies for every API surface.
//! * [`signature`] – the HMAC body-signing scheme used by the service and
//!   gateway APIs.
//! * `client` (feature `client`) – a typed HTTP client for the service API.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
