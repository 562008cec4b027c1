/// Invoking principal utilities
///
/// Works out how the running process relates to a file: owner, group member,
/// other, or an elevated principal that bypasses permission bits.
use std::fs::Metadata;

/// Relationship between the invoking principal and a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// Administrative principal (root); permission bits do not apply
    Elevated,
    Owner,
    Group,
    Other,
}

impl Principal {
    /// Read and write permission bits that apply to this principal
    pub fn rw_bits(self) -> (u32, u32) {
        match self {
            Principal::Elevated => (0, 0),
            Principal::Owner => (0o400, 0o200),
            Principal::Group => (0o040, 0o020),
            Principal::Other => (0o004, 0o002),
        }
    }
}

/// Whether the running process is elevated
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Classify the invoking principal against the owner of `meta`
pub fn classify(meta: &Metadata) -> Principal {
    #[cfg(unix)]
    {
        use nix::unistd::{Gid, Uid, getegid, geteuid};
        use std::os::unix::fs::MetadataExt;

        if is_elevated() {
            return Principal::Elevated;
        }
        let euid = geteuid();
        if euid == Uid::from_raw(meta.uid()) {
            return Principal::Owner;
        }

        let file_gid = Gid::from_raw(meta.gid());
        if getegid() == file_gid || in_supplementary_group(file_gid) {
            return Principal::Group;
        }

        Principal::Other
    }

    #[cfg(not(unix))]
    {
        let _ = meta;
        if is_elevated() {
            Principal::Elevated
        } else {
            Principal::Owner
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn in_supplementary_group(gid: nix::unistd::Gid) -> bool {
    nix::unistd::getgroups()
        .map(|groups| groups.contains(&gid))
        .unwrap_or(false)
}

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
fn in_supplementary_group(_gid: nix::unistd::Gid) -> bool {
    false
}
