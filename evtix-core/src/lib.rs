#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod admission;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod entities;
pub mod framework;
pub mod ledger;
pub mod processors;
pub mod reconciler;
pub mod store;
