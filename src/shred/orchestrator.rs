/// Shred orchestration - sequences every component for each target
///
/// Targets are processed strictly one at a time: open, all passes, verify,
/// delete, then the next one. Directories are walked depth-first and only
/// removed once empty.
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

use super::summary::RunSummary;
use super::target::{RetainReason, ShredTarget, SkipReason, TargetKind, TargetOutcome, TargetState};
use crate::config::ShredConfig;
use crate::error::ShredError;
use crate::overwrite::{OverwriteEngine, PassPlan, RandomSource};
use crate::security::permissions;
use crate::security::{ObfuscatedDeleter, PermissionNegotiator};
use crate::utils::{NativeFileOps, PlatformFileOps, optimal_block_size};
use crate::verification::Verifier;

pub const PROGRESS_TARGET: &str = "shredder::progress";
pub const DRY_RUN_TARGET: &str = "shredder::dry_run";

/// Result of trying to open a file for overwriting
#[derive(Debug)]
pub enum OpenOutcome {
    Opened(File),
    RetryExhausted(io::Error),
}

/// What happened to one regular file
#[derive(Debug)]
pub struct FileReport {
    pub outcome: TargetOutcome,
    pub passes_run: u32,
    pub verifications_run: u32,
}

impl FileReport {
    fn new() -> Self {
        Self {
            outcome: TargetOutcome::Skipped(SkipReason::DryRun),
            passes_run: 0,
            verifications_run: 0,
        }
    }

    fn finish(mut self, outcome: TargetOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

pub struct Shredder {
    config: ShredConfig,
    ops: Box<dyn PlatformFileOps>,
    random: RandomSource,
    verifier: Verifier,
    summary: RunSummary,
    visited: HashSet<PathBuf>,
}

impl Shredder {
    /// Shredder wired to the running OS and the system random source
    pub fn new(config: ShredConfig) -> Self {
        let verifier = Verifier::new(config.hash_verification);
        Self::with_components(config, Box::new(NativeFileOps), RandomSource::system(), verifier)
    }

    pub fn with_components(
        config: ShredConfig,
        ops: Box<dyn PlatformFileOps>,
        random: RandomSource,
        verifier: Verifier,
    ) -> Self {
        Self {
            config,
            ops,
            random,
            verifier,
            summary: RunSummary::default(),
            visited: HashSet::new(),
        }
    }

    #[cfg(test)]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Process every top-level path
    pub fn run(&mut self, paths: &[PathBuf]) -> &RunSummary {
        for path in paths {
            self.process_path(path);
        }

        &self.summary
    }

    /// Classify `path` and dispatch it. The outcome is recorded in the run
    /// summary and returned.
    ///
    /// Every entry, including each one reached through a directory walk, is
    /// its own panic boundary: a panic is recorded as a failure for that
    /// entry and processing continues with the next one.
    pub fn process_path(&mut self, path: &Path) -> TargetOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.process_entry(path))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                let err = ShredError::Unexpected {
                    path: path.to_path_buf(),
                    message,
                };
                self.record(false, TargetOutcome::Failed(err))
            }
        }
    }

    fn process_entry(&mut self, path: &Path) -> TargetOutcome {
        let mut target = match ShredTarget::inspect(path) {
            Ok(target) => target,
            Err(e) => return self.record(false, TargetOutcome::Failed(e)),
        };

        if target.is_symlink {
            if !self.config.follow_symlinks {
                if self.config.dry_run {
                    tracing::info!(target: DRY_RUN_TARGET, "Symlink '{}' would not be shredded", path.display());
                } else {
                    tracing::warn!("Skipping symlink '{}'", path.display());
                }
                return self.record(false, TargetOutcome::Skipped(SkipReason::Symlink));
            }

            let resolved = match fs::canonicalize(path) {
                Ok(resolved) => resolved,
                Err(_) => {
                    tracing::warn!("Dangling symlink (not followed): '{}'", path.display());
                    return self.record(false, TargetOutcome::Skipped(SkipReason::DanglingSymlink));
                }
            };

            tracing::debug!(link = %path.display(), target = %resolved.display(), "Following symlink");
            target = match ShredTarget::inspect(&resolved) {
                Ok(target) => target,
                Err(e) => return self.record(false, TargetOutcome::Failed(e)),
            };
        }

        match target.kind {
            TargetKind::Directory => {
                let outcome = self.process_directory(&target.path);
                self.record(true, outcome)
            }
            TargetKind::File => {
                let report = self.shred_target(target);
                tracing::debug!(
                    path = %path.display(),
                    passes = report.passes_run,
                    verifications = report.verifications_run,
                    "File processed"
                );
                self.record(false, report.outcome)
            }
            TargetKind::Symlink | TargetKind::Other => {
                let err = ShredError::Unsupported { path: target.path };
                self.record(false, TargetOutcome::Failed(err))
            }
        }
    }

    /// Shred one regular file
    #[cfg(test)]
    pub fn shred_file(&mut self, path: &Path) -> FileReport {
        match ShredTarget::inspect(path) {
            Ok(target) if target.kind == TargetKind::File => self.shred_target(target),
            Ok(_) => FileReport::new().finish(TargetOutcome::Failed(ShredError::Unsupported {
                path: path.to_path_buf(),
            })),
            Err(e) => FileReport::new().finish(TargetOutcome::Failed(e)),
        }
    }

    fn record(&mut self, is_directory: bool, outcome: TargetOutcome) -> TargetOutcome {
        if let TargetOutcome::Failed(e) = &outcome {
            tracing::error!("{}", e);
        }

        if is_directory {
            self.summary.record_directory(&outcome);
        } else {
            self.summary.record_file(&outcome);
        }
        outcome
    }

    fn process_directory(&mut self, path: &Path) -> TargetOutcome {
        if !self.config.recursive {
            tracing::warn!("'{}' is a directory. Use -r for recursive shredding.", path.display());
            return TargetOutcome::Skipped(SkipReason::NotRecursive);
        }

        if self.config.follow_symlinks {
            let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            if !self.visited.insert(canonical) {
                tracing::warn!("Directory '{}' already visited, skipping symlink cycle", path.display());
                return TargetOutcome::Skipped(SkipReason::DirectoryCycle);
            }
        }

        tracing::info!("Entering directory '{}'...", path.display());

        let mut entries: Vec<PathBuf> = match fs::read_dir(path) {
            Ok(read_dir) => read_dir
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry.path()),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to read directory entry");
                        None
                    }
                })
                .collect(),
            Err(e) => return TargetOutcome::Failed(ShredError::io(path, e)),
        };
        entries.sort();

        for entry in &entries {
            self.process_path(entry);
        }

        if self.config.dry_run {
            tracing::info!(target: DRY_RUN_TARGET, "Directory '{}' would be shredded", path.display());
            return TargetOutcome::Skipped(SkipReason::DryRun);
        }

        if self.config.keep_files {
            tracing::warn!("Directory '{}' was not deleted (keep_files flag).", path.display());
            return TargetOutcome::Retained(RetainReason::KeepFiles);
        }

        let is_empty = match fs::read_dir(path) {
            Ok(mut read_dir) => read_dir.next().is_none(),
            Err(e) => return TargetOutcome::Failed(ShredError::io(path, e)),
        };
        if !is_empty {
            tracing::warn!("Directory '{}' is not empty. Skipping deletion.", path.display());
            return TargetOutcome::Retained(RetainReason::NotEmpty);
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                tracing::info!("Directory '{}' successfully deleted.", path.display());
                TargetOutcome::Deleted
            }
            Err(e) => TargetOutcome::Failed(ShredError::io(path, e)),
        }
    }

    fn shred_target(&mut self, mut target: ShredTarget) -> FileReport {
        let report = FileReport::new();
        let path = target.path.clone();

        if self.config.dry_run {
            tracing::info!(target: DRY_RUN_TARGET, "Simulating shredding file '{}'", path.display());
            return report.finish(TargetOutcome::Skipped(SkipReason::DryRun));
        }

        if target.size == 0 {
            return report.finish(self.handle_empty(&mut target));
        }

        match permissions::interrogate(&path) {
            Ok(state) => {
                target.advance(TargetState::PermissionChecked);
                if !state.allows(self.config.verify) {
                    tracing::debug!(
                        path = %path.display(),
                        principal = ?target.principal,
                        readable = state.readable,
                        writable = state.writable,
                        "Insufficient permissions"
                    );
                    let negotiated = self.config.force
                        && PermissionNegotiator::new(self.ops.as_ref()).negotiate(&path);
                    if !negotiated {
                        return report.finish(TargetOutcome::Failed(ShredError::PermissionDenied { path }));
                    }
                }
            }
            Err(source) => {
                return report.finish(TargetOutcome::Failed(ShredError::PermissionInterrogation {
                    path,
                    source,
                }));
            }
        }

        let mut file = match self.open_with_retry(&path) {
            OpenOutcome::Opened(file) => file,
            OpenOutcome::RetryExhausted(source) => {
                return report.finish(TargetOutcome::Failed(ShredError::OpenRetryExhausted {
                    path,
                    attempts: self.config.open_attempts,
                    source,
                }));
            }
        };
        target.advance(TargetState::Opened);

        // Overwrite what is there now, never past the current end of file
        match file.metadata() {
            Ok(meta) => {
                if meta.len() != target.size {
                    tracing::debug!(
                        path = %path.display(),
                        inspected = target.size,
                        current = meta.len(),
                        "File size changed since inspection"
                    );
                }
                target.size = meta.len();
            }
            Err(e) => return report.finish(TargetOutcome::Failed(ShredError::io(path, e))),
        }

        let (report, verification_failed) = match self.overwrite(&mut target, &mut file, report) {
            Ok(done) => done,
            Err((report, e)) => return report.finish(TargetOutcome::Failed(e)),
        };
        drop(file);

        if verification_failed {
            tracing::warn!("Overwrite verification failed for '{}'. Skipping deletion.", path.display());
            target.advance(TargetState::Retained);
            return report.finish(TargetOutcome::Retained(RetainReason::VerificationFailed));
        }

        if self.config.keep_files {
            tracing::info!("File '{}' overwritten without deletion.", path.display());
            target.advance(TargetState::Retained);
            return report.finish(TargetOutcome::Retained(RetainReason::KeepFiles));
        }

        let deleter = ObfuscatedDeleter::new(
            self.ops.as_ref(),
            self.config.temp_dir(),
            self.config.settle_delay(),
        );
        if deleter.destroy(&path, &mut self.random) {
            target.advance(TargetState::Deleted);
            if self.config.verify {
                tracing::info!("File '{}' shredded, verified, and deleted.", path.display());
            } else {
                tracing::info!("File '{}' shredded and deleted without verification.", path.display());
            }
            report.finish(TargetOutcome::Deleted)
        } else {
            target.advance(TargetState::Retained);
            report.finish(TargetOutcome::Retained(RetainReason::DeleteFailed))
        }
    }

    /// Run every pass over an opened file. Returns whether any verification
    /// failed; a failure in one pass is never cleared by a later one.
    fn overwrite(
        &mut self,
        target: &mut ShredTarget,
        file: &mut File,
        mut report: FileReport,
    ) -> Result<(FileReport, bool), (FileReport, ShredError)> {
        let plan = PassPlan::for_mode(self.config.secure_mode);
        let engine = OverwriteEngine::new(self.ops.as_ref());
        let block_size = optimal_block_size(self.ops.as_ref(), &target.path);
        let passes = self.config.passes;
        let mut verification_failed = false;

        for pass in 0..passes {
            target.advance(TargetState::Overwriting { pass: pass + 1 });

            let written = match engine.run_pass(
                file,
                &target.path,
                target.size,
                &plan,
                pass,
                &mut self.random,
                self.config.verify,
            ) {
                Ok(written) => written,
                Err(e) => return Err((report, e)),
            };
            report.passes_run += 1;

            tracing::info!(
                "Completed overwrite pass {} for file '{}'.",
                pass + 1,
                target.path.display()
            );
            tracing::info!(
                target: PROGRESS_TARGET,
                "Progress: {:.1}%",
                f64::from(pass + 1) / f64::from(passes) * 100.0
            );

            if self.config.verify {
                report.verifications_run += 1;
                let outcome = self.verifier.verify(&target.path, &written, block_size);
                if !outcome.is_verified() {
                    tracing::debug!(path = %target.path.display(), pass = pass + 1, ?outcome, "Pass not verified");
                    verification_failed = true;
                }
            }
        }

        if self.config.verify {
            target.advance(if verification_failed {
                TargetState::VerificationFailed
            } else {
                TargetState::Verified
            });
        }

        Ok((report, verification_failed))
    }

    fn handle_empty(&self, target: &mut ShredTarget) -> TargetOutcome {
        let path = &target.path;

        if self.config.keep_files {
            tracing::warn!("File '{}' is empty and will not be overwritten.", path.display());
            target.advance(TargetState::Retained);
            return TargetOutcome::Retained(RetainReason::KeepFiles);
        }

        tracing::info!("File '{}' is empty and will be deleted without overwriting.", path.display());
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Empty file '{}' successfully deleted.", path.display());
                target.advance(TargetState::Deleted);
                TargetOutcome::Deleted
            }
            Err(e) => TargetOutcome::Failed(ShredError::io(path.clone(), e)),
        }
    }

    fn open_with_retry(&self, path: &Path) -> OpenOutcome {
        let attempts = self.config.open_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match OpenOptions::new().write(true).open(path) {
                Ok(file) => return OpenOutcome::Opened(file),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        "Failed to open file '{}' for overwriting.",
                        path.display()
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        thread::sleep(self.config.open_retry_delay());
                    }
                }
            }
        }

        OpenOutcome::RetryExhausted(
            last_error.unwrap_or_else(|| io::Error::other("file could not be opened")),
        )
    }
}
