/// Run-wide bookkeeping of target outcomes
use super::target::{RetainReason, SkipReason, TargetOutcome};

pub const SUMMARY_TARGET: &str = "shredder::summary";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Files shredded and deleted
    pub deleted: usize,
    /// Files shredded, not deleted (keep files)
    pub kept: usize,
    /// Files overwritten but left in place because verification or deletion failed
    pub retained: usize,
    pub skipped: usize,
    /// Dry-run targets that would have been processed
    pub simulated: usize,
    pub failed: usize,
    pub directories_removed: usize,
    /// Any recorded outcome counted as a failure for the exit status
    any_failure: bool,
}

impl RunSummary {
    pub fn record_file(&mut self, outcome: &TargetOutcome) {
        self.any_failure |= outcome.is_failure();
        match outcome {
            TargetOutcome::Deleted => self.deleted += 1,
            TargetOutcome::Retained(RetainReason::KeepFiles) => self.kept += 1,
            TargetOutcome::Retained(_) => self.retained += 1,
            TargetOutcome::Skipped(SkipReason::DryRun) => self.simulated += 1,
            TargetOutcome::Skipped(_) => self.skipped += 1,
            TargetOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Directories only count when they were removed, skipped or failed;
    /// a kept or non-empty directory is already accounted for by its files
    pub fn record_directory(&mut self, outcome: &TargetOutcome) {
        self.any_failure |= outcome.is_failure();
        match outcome {
            TargetOutcome::Deleted => self.directories_removed += 1,
            TargetOutcome::Retained(_) => {}
            TargetOutcome::Skipped(SkipReason::DryRun) => self.simulated += 1,
            TargetOutcome::Skipped(_) => self.skipped += 1,
            TargetOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.any_failure
    }

    pub fn log(&self) {
        tracing::info!(target: SUMMARY_TARGET, "Shredded and deleted: {}", self.deleted);
        tracing::info!(target: SUMMARY_TARGET, "Shredded, not deleted (kept): {}", self.kept);
        if self.directories_removed > 0 {
            tracing::info!(target: SUMMARY_TARGET, "Directories removed: {}", self.directories_removed);
        }
        if self.simulated > 0 {
            tracing::info!(target: SUMMARY_TARGET, "Dry run, would be shredded: {}", self.simulated);
        }
        if self.skipped > 0 {
            tracing::info!(target: SUMMARY_TARGET, "Skipped: {}", self.skipped);
        }
        if self.retained > 0 {
            tracing::warn!(target: SUMMARY_TARGET, "Overwritten but retained: {}", self.retained);
        }
        if self.failed > 0 {
            tracing::warn!(target: SUMMARY_TARGET, "Failed: {}", self.failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShredError;

    #[test]
    fn test_counts_by_outcome() {
        let mut summary = RunSummary::default();
        summary.record_file(&TargetOutcome::Deleted);
        summary.record_file(&TargetOutcome::Deleted);
        summary.record_file(&TargetOutcome::Retained(RetainReason::KeepFiles));
        summary.record_file(&TargetOutcome::Skipped(SkipReason::Symlink));
        summary.record_directory(&TargetOutcome::Deleted);
        summary.record_directory(&TargetOutcome::Retained(RetainReason::NotEmpty));

        assert_eq!(summary.deleted, 2);
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.directories_removed, 1);
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_retained_and_failed_are_failures() {
        let mut summary = RunSummary::default();
        summary.record_file(&TargetOutcome::Retained(RetainReason::VerificationFailed));
        assert!(summary.has_failures());

        let mut summary = RunSummary::default();
        summary.record_directory(&TargetOutcome::Failed(ShredError::InvalidConfig("x".into())));
        assert!(summary.has_failures());
    }
}
