use super::RefreshReport;
use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the report of the most recent completed cycle.
#[derive(Clone, Default)]
pub struct ReportStore {
    inner: Arc<RwLock<Option<Arc<RefreshReport>>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever the previous cycle left behind
    pub fn publish(&self, report: RefreshReport) {
        *self.inner.write() = Some(Arc::new(report));
    }

    /// Latest report, or `None` before the first cycle completes
    pub fn latest(&self) -> Option<Arc<RefreshReport>> {
        self.inner.read().clone()
    }
}
