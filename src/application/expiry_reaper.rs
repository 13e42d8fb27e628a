//! ExpiryReaper - periodic sweep that clears stale `is_active` flags.
//!
//! Access decisions never depend on it; the resolver re-checks expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::BillingError;
use crate::ports::{EntitlementStore, ReapReport};

pub struct ExpiryReaper {
    entitlements: Arc<dyn EntitlementStore>,
    interval: Duration,
}

impl ExpiryReaper {
    pub fn new(entitlements: Arc<dyn EntitlementStore>, interval: Duration) -> Self {
        Self {
            entitlements,
            interval,
        }
    }

    /// Runs one sweep at the current instant.
    pub async fn run_once(&self) -> Result<ReapReport, BillingError> {
        let report = self.entitlements.deactivate_lapsed(Timestamp::now()).await?;
        tracing::info!(
            purchases = report.purchases_deactivated,
            subscriptions = report.subscriptions_deactivated,
            "Expiry sweep finished"
        );
        Ok(report)
    }

    /// Sweeps on every tick until `shutdown` flips to true.
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Expiry reaper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Expiry sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Expiry reaper stopped");
    }
}
