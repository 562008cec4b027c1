/// A single path being shredded and the states it moves through
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ShredError};
use crate::utils::principal::{self, Principal};

/// What kind of filesystem entry a target is, as seen without following links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Per-target lifecycle.
///
/// `Discovered -> PermissionChecked -> Opened -> Overwriting(1..N) ->
/// Verified | VerificationFailed -> Deleted | Retained`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Discovered,
    PermissionChecked,
    Opened,
    Overwriting { pass: u32 },
    Verified,
    VerificationFailed,
    Deleted,
    Retained,
}

impl TargetState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TargetState::Deleted | TargetState::Retained)
    }
}

/// Path plus the metadata cached when processing of it began
#[derive(Debug)]
pub struct ShredTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
    pub size: u64,
    pub is_symlink: bool,
    pub principal: Principal,
    state: TargetState,
}

impl ShredTarget {
    /// Stat `path` without following a final symlink
    pub fn inspect(path: &Path) -> Result<Self> {
        let meta = fs::symlink_metadata(path).map_err(|e| ShredError::io(path, e))?;
        let file_type = meta.file_type();

        let kind = if file_type.is_symlink() {
            TargetKind::Symlink
        } else if file_type.is_dir() {
            TargetKind::Directory
        } else if file_type.is_file() {
            TargetKind::File
        } else {
            TargetKind::Other
        };

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            size: meta.len(),
            is_symlink: kind == TargetKind::Symlink,
            principal: principal::classify(&meta),
            state: TargetState::Discovered,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn advance(&mut self, next: TargetState) {
        if self.state.is_terminal() {
            tracing::warn!(
                path = %self.path.display(),
                from = ?self.state,
                to = ?next,
                "State change after terminal state"
            );
        }
        tracing::debug!(
            path = %self.path.display(),
            from = ?self.state,
            to = ?next,
            "Target state change"
        );
        self.state = next;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainReason {
    /// Overwritten on purpose without deletion
    KeepFiles,
    /// Some pass could not be confirmed on disk
    VerificationFailed,
    /// Overwritten, but every deletion attempt failed
    DeleteFailed,
    /// Directory still holds entries after recursion
    NotEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Symlink,
    DanglingSymlink,
    NotRecursive,
    DirectoryCycle,
    DryRun,
}

/// Terminal outcome of one target
#[derive(Debug)]
pub enum TargetOutcome {
    Deleted,
    Retained(RetainReason),
    Skipped(SkipReason),
    Failed(ShredError),
}

impl TargetOutcome {
    /// Whether this outcome should turn the exit status into a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TargetOutcome::Failed(_)
                | TargetOutcome::Retained(RetainReason::VerificationFailed)
                | TargetOutcome::Retained(RetainReason::DeleteFailed)
        )
    }
}
