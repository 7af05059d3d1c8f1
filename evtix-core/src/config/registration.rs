use std::time::Duration;

/// Settings for releasing registrations whose checkout was never paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// How long an UNPAID registration may hold a seat.
    pub unpaid_ttl: Duration,
    pub sweep_interval: Duration,
    /// Upper bound on registrations released per sweep.
    pub sweep_batch: i64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            unpaid_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            sweep_batch: 100,
        }
    }
}
