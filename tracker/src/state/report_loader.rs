//! Report summary loading with stale-response protection.

use shared::ReportSummary;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::client::{ApiResult, DispatchClient};

/// Monotonic token counter. A ticket is current until a newer one is issued
/// or the counter is invalidated.
#[derive(Debug, Default)]
pub struct InFlight {
    latest: AtomicU64,
}

impl InFlight {
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    /// Make every outstanding ticket stale
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(ReportSummary),
    /// The response arrived after a newer load or a cancel; it was dropped
    Discarded,
}

#[derive(Clone)]
pub struct ReportLoader {
    client: DispatchClient,
    in_flight: Arc<InFlight>,
    latest: Arc<Mutex<Option<ReportSummary>>>,
}

impl ReportLoader {
    pub fn new(client: DispatchClient) -> Self {
        Self {
            client,
            in_flight: Arc::new(InFlight::default()),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Fetch the summary for `[from, to]` and keep it if nobody lost interest
    /// in the meantime. A stale response is discarded whether it succeeded or
    /// failed.
    pub async fn load(&self, from: Option<&str>, to: Option<&str>) -> ApiResult<LoadOutcome> {
        let ticket = self.in_flight.issue();
        let result = self.client.reports_summary(from, to).await;

        if !self.in_flight.is_current(ticket) {
            debug!("Discarding stale report response (ticket {})", ticket);
            return Ok(LoadOutcome::Discarded);
        }
        let summary = result?;

        *self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(summary.clone());
        Ok(LoadOutcome::Loaded(summary))
    }

    pub fn cancel(&self) {
        self.in_flight.invalidate();
    }

    /// Last summary that was accepted
    pub fn latest(&self) -> Option<ReportSummary> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
