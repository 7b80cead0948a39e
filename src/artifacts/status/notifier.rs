//! Delivery of status records and cooperative cancellation

use crate::artifacts::status::status_record::StatusRecord;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives every record as soon as it is classified
pub trait StatusListener {
    fn on_status(&mut self, record: &StatusRecord);
}

impl<F> StatusListener for F
where
    F: FnMut(&StatusRecord),
{
    fn on_status(&mut self, record: &StatusRecord) {
        self(record)
    }
}

/// Listener that ignores everything, for callers only interested in the map
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl StatusListener for NoopListener {
    fn on_status(&mut self, _record: &StatusRecord) {}
}

/// Shared flag checked before every path visit
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records collected by one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub statuses: BTreeMap<PathBuf, StatusRecord>,
    /// The walk stopped early; `statuses` holds what was delivered
    pub cancelled: bool,
}

/// Forwards records to a listener once each and keeps them for the report
pub struct StatusNotifier<'l> {
    listener: &'l mut dyn StatusListener,
    token: CancellationToken,
    report: StatusReport,
}

impl<'l> StatusNotifier<'l> {
    pub fn new(listener: &'l mut dyn StatusListener, token: CancellationToken) -> Self {
        StatusNotifier {
            listener,
            token,
            report: StatusReport::default(),
        }
    }

    /// Poll the token; once cancelled, stays cancelled
    pub fn should_stop(&mut self) -> bool {
        if !self.report.cancelled && self.token.is_cancelled() {
            tracing::debug!(delivered = self.report.statuses.len(), "status cancelled");
            self.report.cancelled = true;
        }
        self.report.cancelled
    }

    pub fn notify(&mut self, record: StatusRecord) {
        if self.report.cancelled || self.report.statuses.contains_key(&record.path) {
            return;
        }

        tracing::trace!(path = ?record.path, code = %record.short_code(), "status");
        self.listener.on_status(&record);
        self.report.statuses.insert(record.path.clone(), record);
    }

    pub fn finish(self) -> StatusReport {
        self.report
    }
}
