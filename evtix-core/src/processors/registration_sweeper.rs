//! RegistrationSweeper processor.
//!
//! Every `sweep_interval` it looks for UNPAID registrations older than
//! `unpaid_ttl` and releases them through the admission coordinator, which
//! frees the seat and reopens a FULL event. The interval and TTL are re-read
//! whenever the [`ConfigStore`] is updated.

use crate::admission::{AdmissionCoordinator, AdmissionError};
use crate::config::{ConfigStore, ConfigWatcher, RegistrationConfig};
use crate::store::TicketingStore;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct RegistrationSweeper<S> {
    coordinator: Arc<AdmissionCoordinator<S>>,
    config: ConfigStore<RegistrationConfig>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: TicketingStore> RegistrationSweeper<S> {
    pub fn new(
        coordinator: Arc<AdmissionCoordinator<S>>,
        config: ConfigStore<RegistrationConfig>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            coordinator,
            config,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        let mut config_watcher: ConfigWatcher = self.config.subscribe();
        let mut settings = self.config.snapshot().await;
        info!(
            ttl_secs = settings.unpaid_ttl.as_secs(),
            interval_secs = settings.sweep_interval.as_secs(),
            "RegistrationSweeper started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("RegistrationSweeper received shutdown signal");
                        break;
                    }
                }

                Ok(()) = config_watcher.changed() => {
                    settings = self.config.snapshot().await;
                    info!(
                        ttl_secs = settings.unpaid_ttl.as_secs(),
                        interval_secs = settings.sweep_interval.as_secs(),
                        "RegistrationSweeper reloaded config"
                    );
                }

                _ = tokio::time::sleep(settings.sweep_interval) => {
                    match self.sweep_once(&settings).await {
                        Ok(0) => debug!("No stale registrations"),
                        Ok(released) => info!(released, "Released stale registrations"),
                        Err(e) => error!(error = %e, "Registration sweep failed"),
                    }
                }
            }
        }

        info!("RegistrationSweeper shutdown complete");
    }

    /// Release one batch of stale registrations. Returns how many were
    /// released; registrations paid or removed in the meantime are skipped.
    pub async fn sweep_once(&self, settings: &RegistrationConfig) -> Result<usize, AdmissionError> {
        let cutoff = OffsetDateTime::now_utc() - settings.unpaid_ttl;
        let stale = self
            .coordinator
            .store()
            .find_stale_unpaid(cutoff, settings.sweep_batch)
            .await?;

        let mut released = 0;
        for participant in &stale {
            match self.coordinator.expire_registration(participant, cutoff).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    participant_id = %participant.participant_id,
                    event_id = %participant.event_id,
                    error = %e,
                    "Failed to release stale registration"
                ),
            }
        }
        Ok(released)
    }
}
