use crate::index::ReferenceEntry;
use crate::matcher::MatchReport;
use crate::verify::VerificationResult;

/// Hook for diagnostics around a query. Both callbacks default to no-ops
/// and never affect the ranking.
///
/// `on_verified` may be called from several rayon workers at once and in
/// any order; `on_ranked` is called once per query, after ranking.
pub trait MatchObserver: Send + Sync {
    fn on_verified(&self, _entry_index: usize, _entry: &ReferenceEntry, _result: &VerificationResult) {}

    fn on_ranked(&self, _report: &MatchReport) {}
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MatchObserver for NoopObserver {}

/// Logs every comparison and ranking at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn on_verified(&self, entry_index: usize, entry: &ReferenceEntry, result: &VerificationResult) {
        log::debug!(
            "[{}] {}: {:?}, {} correspondences, {} inliers, support {:.2}",
            entry_index,
            entry.name,
            result.outcome,
            result.correspondences.len(),
            result.inlier_count(),
            result.support
        );
    }

    fn on_ranked(&self, report: &MatchReport) {
        log::debug!(
            "Best match {} (support {:.2}, runner-up {:.2}, confidence {:.2})",
            report.name,
            report.support,
            report.second_support,
            report.confidence
        );
    }
}
