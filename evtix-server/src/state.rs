//! Application state shared across all request handlers.

use crate::config::runtime::{ConfigStore, RegistrationConfig, SharedConfig};
use evtix_core::admission::AdmissionCoordinator;
use evtix_core::checkout::HostedCheckoutClient;
use evtix_core::ledger::EventLedger;
use evtix_core::reconciler::PaymentReconciler;
use evtix_core::store::PgStore;
use sqlx::PgPool;
use std::sync::Arc;

/// Cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Reloaded in place on SIGHUP.
    pub config: SharedConfig,
    /// Watched by the registration sweeper.
    pub registration: ConfigStore<RegistrationConfig>,
    pub admission: Arc<AdmissionCoordinator<PgStore>>,
    pub ledger: Arc<EventLedger<PgStore>>,
    pub reconciler: Arc<PaymentReconciler<PgStore>>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: SharedConfig,
        registration: ConfigStore<RegistrationConfig>,
    ) -> Self {
        let store = PgStore::new(db.clone());
        // The client reports its deadline from live config, so SIGHUP reaches joins.
        let gateway = Arc::new(HostedCheckoutClient::new(config.gateway.clone()));
        let admission = AdmissionCoordinator::new(store.clone(), gateway);

        Self {
            db,
            config,
            registration,
            admission: Arc::new(admission),
            ledger: Arc::new(EventLedger::new(store.clone())),
            reconciler: Arc::new(PaymentReconciler::new(store)),
        }
    }
}
