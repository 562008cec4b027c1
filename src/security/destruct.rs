/// Obfuscated deletion of shredded files
///
/// Process:
/// 1. Strip every permission bit
/// 2. Rename to a random 32-character name inside a neutral directory
/// 3. Let the rename settle, then scrub extended attributes / streams
/// 4. Settle again
/// 5. Delete by the obfuscated path (original path if the rename failed)
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::overwrite::RandomSource;
use crate::utils::platform::PlatformFileOps;

/// Length of generated obfuscated names
pub const OBFUSCATED_NAME_LEN: usize = 32;

/// Attempts at finding an unused name before giving up on a directory
const NAME_ATTEMPTS: usize = 4;

/// Serialises name generation plus rename across every deleter in the process
static RENAME_LOCK: Mutex<()> = Mutex::new(());

pub struct ObfuscatedDeleter<'a> {
    ops: &'a dyn PlatformFileOps,
    temp_dir: PathBuf,
    settle_delay: Duration,
}

impl<'a> ObfuscatedDeleter<'a> {
    pub fn new(ops: &'a dyn PlatformFileOps, temp_dir: PathBuf, settle_delay: Duration) -> Self {
        Self {
            ops,
            temp_dir,
            settle_delay,
        }
    }

    /// Remove `path` from the filesystem under a random name.
    ///
    /// Every step is best effort and logged on failure. Returns false when
    /// neither the obfuscated nor the original path could be deleted.
    pub fn destroy(&self, path: &Path, random: &mut RandomSource) -> bool {
        if let Err(e) = strip_permissions(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove permissions");
        }

        let current = match self.obfuscate(path, random) {
            Some(renamed) => renamed,
            None => path.to_path_buf(),
        };

        thread::sleep(self.settle_delay);
        match self.ops.strip_metadata(&current) {
            Ok(removed) if removed > 0 => {
                tracing::debug!(path = %current.display(), removed, "Metadata scrubbed")
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %current.display(), error = %e, "Failed to clean up metadata")
            }
        }
        thread::sleep(self.settle_delay);

        match fs::remove_file(&current) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Deleted");
                true
            }
            Err(e) if current != path => {
                tracing::warn!(
                    path = %current.display(),
                    error = %e,
                    "Failed to delete obfuscated file, trying original path"
                );
                remove_original(path)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to delete file");
                false
            }
        }
    }

    /// Rename `path` to a random name, first in the neutral directory, then
    /// next to the original. None when the file could not be renamed at all.
    fn obfuscate(&self, path: &Path, random: &mut RandomSource) -> Option<PathBuf> {
        let _guard = RENAME_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match rename_into(path, &self.temp_dir, random) {
            Ok(renamed) => {
                tracing::debug!(from = %path.display(), to = %renamed.display(), "Renamed to temporary location");
                return Some(renamed);
            }
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    temp_dir = %self.temp_dir.display(),
                    error = %e,
                    "Rename into temporary directory failed"
                );
            }
        }

        let sibling_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        match rename_into(path, sibling_dir, random) {
            Ok(renamed) => {
                tracing::debug!(from = %path.display(), to = %renamed.display(), "Renamed in place");
                Some(renamed)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to rename file");
                None
            }
        }
    }
}

fn rename_into(path: &Path, dir: &Path, random: &mut RandomSource) -> io::Result<PathBuf> {
    for _ in 0..NAME_ATTEMPTS {
        let candidate = dir.join(random.alphanumeric(OBFUSCATED_NAME_LEN));
        if candidate.symlink_metadata().is_ok() {
            continue;
        }
        fs::rename(path, &candidate)?;
        return Ok(candidate);
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no unused obfuscated name found",
    ))
}

fn remove_original(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Deleted");
            true
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}

#[cfg(unix)]
fn strip_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o000))
}

// Read-only would block DeleteFileW, so there is nothing useful to strip here
#[cfg(not(unix))]
fn strip_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
