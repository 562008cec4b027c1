/// Permission assessment and negotiation for stubborn files
use std::fs;
use std::io;
use std::path::Path;

use crate::utils::platform::PlatformFileOps;
#[cfg(unix)]
use crate::utils::principal::{self, Principal};

/// What the invoking principal may do with a file.
///
/// `interrogation_failed` means the bits could not be read at all. In that
/// case `readable`/`writable` carry no information; it is not a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionState {
    pub readable: bool,
    pub writable: bool,
    pub interrogation_failed: bool,
}

impl PermissionState {
    pub fn granted() -> Self {
        Self {
            readable: true,
            writable: true,
            interrogation_failed: false,
        }
    }

    pub fn unknown() -> Self {
        Self {
            readable: false,
            writable: false,
            interrogation_failed: true,
        }
    }

    /// Whether the state permits overwriting (and reading back when `need_read`)
    pub fn allows(&self, need_read: bool) -> bool {
        !self.interrogation_failed && self.writable && (self.readable || !need_read)
    }
}

/// Read the permission bits of `path` for the invoking principal
pub fn interrogate(path: &Path) -> io::Result<PermissionState> {
    let meta = fs::metadata(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let principal = principal::classify(&meta);
        if principal == Principal::Elevated {
            return Ok(PermissionState::granted());
        }

        let mode = meta.permissions().mode();
        let (read_bit, write_bit) = principal.rw_bits();
        Ok(PermissionState {
            readable: mode & read_bit != 0,
            writable: mode & write_bit != 0,
            interrogation_failed: false,
        })
    }

    #[cfg(not(unix))]
    {
        Ok(PermissionState {
            readable: true,
            writable: !meta.permissions().readonly(),
            interrogation_failed: false,
        })
    }
}

pub struct PermissionNegotiator<'a> {
    ops: &'a dyn PlatformFileOps,
}

impl<'a> PermissionNegotiator<'a> {
    pub fn new(ops: &'a dyn PlatformFileOps) -> Self {
        Self { ops }
    }

    /// Permission state of `path`; failures to read it are reported as
    /// [`PermissionState::unknown`], never as a denial
    pub fn assess(&self, path: &Path) -> PermissionState {
        interrogate(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to retrieve file permissions");
            PermissionState::unknown()
        })
    }

    /// Try to obtain read/write access to `path`.
    ///
    /// Clears read-only / deny-all owner bits (keeping owner execute only if it
    /// was already set), strips extended attributes and re-checks access.
    /// Returns whether write access is now confirmed. A file that is already
    /// readable and writable is left untouched.
    pub fn negotiate(&self, path: &Path) -> bool {
        let before = self.assess(path);
        if before.interrogation_failed {
            return false;
        }
        if before.readable && before.writable {
            tracing::debug!(path = %path.display(), "Permissions already sufficient");
            return true;
        }

        if let Err(e) = grant_owner_rw(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to update permissions");
        }

        match self.ops.strip_metadata(path) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::debug!(path = %path.display(), removed, "Stripped extended attributes")
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Extended attribute strip failed")
            }
        }

        let confirmed = check_write_access(path);
        if confirmed {
            tracing::info!(path = %path.display(), "Write access acquired");
        } else {
            tracing::warn!(path = %path.display(), "Could not acquire write access");
        }
        confirmed
    }
}

/// Add owner read/write, plus owner execute only when it was already present
fn grant_owner_rw(path: &Path) -> io::Result<()> {
    let meta = fs::metadata(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = meta.permissions().mode() & 0o7777;
        let owner_exec = mode & 0o100 != 0;
        let wanted = if owner_exec { 0o700 } else { 0o600 };
        let new_mode = mode | wanted;

        if new_mode != mode {
            fs::set_permissions(path, fs::Permissions::from_mode(new_mode))?;
            tracing::info!(
                path = %path.display(),
                mode = %format!("{:o}", new_mode),
                "Added owner permissions ({})",
                if owner_exec { "u+rwx" } else { "u+rw" }
            );
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let mut perms = meta.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            fs::set_permissions(path, perms)?;
            tracing::info!(path = %path.display(), "Cleared read-only attribute");
        }
        Ok(())
    }
}

fn check_write_access(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use nix::unistd::{AccessFlags, access};
        access(path, AccessFlags::W_OK).is_ok()
    }

    #[cfg(not(unix))]
    {
        fs::OpenOptions::new().write(true).open(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::platform::FixedBlockOps;
    use crate::utils::principal::is_elevated;

    #[test]
    fn test_assess_own_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let ops = FixedBlockOps(4096);
        let state = PermissionNegotiator::new(&ops).assess(file.path());

        assert_eq!(state, PermissionState::granted());
        assert!(state.allows(true));
    }

    #[test]
    fn test_assess_missing_file_is_unknown_not_denied() {
        let dir = tempfile::tempdir().unwrap();
        let ops = FixedBlockOps(4096);
        let state = PermissionNegotiator::new(&ops).assess(&dir.path().join("nope"));

        assert!(state.interrogation_failed);
        assert!(!state.allows(false));
        assert!(interrogate(&dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn file_with_mode(dir: &Path, name: &str, mode: u32) -> std::path::PathBuf {
            let path = dir.join(name);
            fs::write(&path, b"stubborn").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            path
        }

        fn mode_of(path: &Path) -> u32 {
            fs::metadata(path).unwrap().permissions().mode() & 0o7777
        }

        #[test]
        fn test_read_only_file_is_denied_not_unknown() {
            if is_elevated() {
                return;
            }
            let dir = tempfile::tempdir().unwrap();
            let path = file_with_mode(dir.path(), "ro.txt", 0o444);

            let state = interrogate(&path).unwrap();
            assert!(state.readable);
            assert!(!state.writable);
            assert!(!state.interrogation_failed);
        }

        #[test]
        fn test_negotiate_is_idempotent_on_writable_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = file_with_mode(dir.path(), "rw.txt", 0o644);
            let ops = FixedBlockOps(4096);
            let negotiator = PermissionNegotiator::new(&ops);

            assert!(negotiator.negotiate(&path));
            assert!(negotiator.negotiate(&path));
            assert_eq!(mode_of(&path), 0o644);
        }

        #[test]
        fn test_negotiate_grants_owner_rw_only() {
            let dir = tempfile::tempdir().unwrap();
            let path = file_with_mode(dir.path(), "ro.txt", 0o444);
            let ops = FixedBlockOps(4096);

            assert!(PermissionNegotiator::new(&ops).negotiate(&path));
            let mode = mode_of(&path);
            if !is_elevated() {
                assert_eq!(mode, 0o644);
            }
            assert_eq!(mode & 0o111, 0);
            assert_eq!(mode & 0o022, 0);
        }

        #[test]
        fn test_negotiate_keeps_existing_owner_exec() {
            if is_elevated() {
                return;
            }
            let dir = tempfile::tempdir().unwrap();
            let path = file_with_mode(dir.path(), "tool.sh", 0o500);
            let ops = FixedBlockOps(4096);

            assert!(PermissionNegotiator::new(&ops).negotiate(&path));
            assert_eq!(mode_of(&path), 0o700);
        }

        #[test]
        fn test_negotiate_deny_all() {
            if is_elevated() {
                return;
            }
            let dir = tempfile::tempdir().unwrap();
            let path = file_with_mode(dir.path(), "locked.bin", 0o000);
            let ops = FixedBlockOps(4096);

            assert!(PermissionNegotiator::new(&ops).negotiate(&path));
            assert_eq!(mode_of(&path), 0o600);
        }
    }
}
