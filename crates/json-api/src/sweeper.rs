//! Periodic sweep of lapsed consents and stale approval requests.

use std::{sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info};

use consent_app::domain::consents::{ConsentsService, records::ConsentStatus};

use crate::observability::record_transition;

/// Run one sweep, logging the outcome.
pub(crate) async fn sweep_once(consents: &dyn ConsentsService) {
    match consents.sweep(Timestamp::now()).await {
        Ok(report) if report.total() > 0 => {
            record_transition(ConsentStatus::Expired, report.expired);
            record_transition(ConsentStatus::Rejected, report.rejected);

            info!(
                expired = report.expired,
                rejected = report.rejected,
                "sweep transitioned lapsed consents"
            );
        }
        Ok(_) => debug!("sweep found nothing to do"),
        Err(source) => error!("sweep failed: {source}"),
    }
}

/// Sweep every `period` until the returned task is aborted.
pub(crate) fn spawn(consents: Arc<dyn ConsentsService>, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "starting consent sweeper");

    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep_once(consents.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use consent_app::domain::consents::{
        ConsentsServiceError, MockConsentsService, outcomes::SweepReport,
    };

    use super::*;

    #[tokio::test]
    async fn sweep_once_runs_a_single_sweep() {
        let mut consents = MockConsentsService::new();

        consents.expect_sweep().once().return_once(|_| {
            Ok(SweepReport {
                expired: 2,
                rejected: 1,
            })
        });

        sweep_once(&consents).await;
    }

    #[tokio::test]
    async fn sweep_failures_are_swallowed() {
        let mut consents = MockConsentsService::new();

        consents
            .expect_sweep()
            .once()
            .return_once(|_| Err(ConsentsServiceError::Conflict));

        sweep_once(&consents).await;
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_sweeper_ticks_immediately_and_periodically() {
        let mut consents = MockConsentsService::new();

        consents
            .expect_sweep()
            .times(2)
            .returning(|_| Ok(SweepReport::default()));

        let handle = spawn(Arc::new(consents), Duration::from_secs(60));

        time::sleep(Duration::from_secs(61)).await;
        handle.abort();

        let aborted = handle.await;

        assert!(
            aborted.is_err_and(|error| error.is_cancelled()),
            "sweeper should stop when aborted"
        );
    }
}
