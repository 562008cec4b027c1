/// Platform-specific file operations
///
/// Block size discovery, durable sync and metadata scrubbing differ per OS.
/// The shredding core only talks to [`PlatformFileOps`]; [`NativeFileOps`]
/// carries one implementation per target platform.
use std::fs::File;
use std::io;
use std::path::Path;

/// Block size used when the storage cannot tell us its preferred unit
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Capability interface over the OS-specific file syscalls
pub trait PlatformFileOps {
    /// Preferred I/O unit of the storage holding `path`, if it can be queried
    fn block_size(&self, path: &Path) -> Option<u64>;

    /// Push written data for `file` down to durable storage
    fn sync(&self, file: &File) -> io::Result<()>;

    /// Remove extended attributes / alternate data streams from `path`.
    /// Returns how many were removed.
    fn strip_metadata(&self, path: &Path) -> io::Result<usize>;
}

/// Resolve the block size for `path`, falling back to [`DEFAULT_BLOCK_SIZE`]
pub fn optimal_block_size(ops: &dyn PlatformFileOps, path: &Path) -> usize {
    match ops.block_size(path) {
        Some(size) if size > 0 => usize::try_from(size).unwrap_or(DEFAULT_BLOCK_SIZE),
        _ => {
            tracing::debug!(
                path = %path.display(),
                "Block size unavailable, using default {}",
                DEFAULT_BLOCK_SIZE
            );
            DEFAULT_BLOCK_SIZE
        }
    }
}

/// Operations backed by the running operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileOps;

impl PlatformFileOps for NativeFileOps {
    fn block_size(&self, path: &Path) -> Option<u64> {
        #[cfg(unix)]
        {
            // statvfs wants something that exists; files are queried through their directory
            let stat_path = if path.is_dir() {
                path
            } else {
                match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                }
            };

            match nix::sys::statvfs::statvfs(stat_path) {
                Ok(stat) => Some(stat.fragment_size() as u64),
                Err(e) => {
                    tracing::error!(path = %stat_path.display(), error = %e, "Error getting block size");
                    None
                }
            }
        }

        #[cfg(windows)]
        {
            let _ = path;
            windows::cluster_size()
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = path;
            tracing::info!("OS type could not be determined, using default block size");
            None
        }
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    fn strip_metadata(&self, path: &Path) -> io::Result<usize> {
        #[cfg(any(target_os = "linux", target_os = "android", target_os = "macos"))]
        {
            xattr::strip_all(path)
        }

        #[cfg(windows)]
        {
            windows::strip_alternate_streams(path)
        }

        #[cfg(not(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            windows
        )))]
        {
            let _ = path;
            Ok(0)
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos"))]
mod xattr {
    use std::ffi::CString;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    fn to_cstring(bytes: &[u8]) -> io::Result<CString> {
        CString::new(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    fn list(path: &CString, buf: &mut [u8]) -> isize {
        let ptr = buf.as_mut_ptr() as *mut libc::c_char;

        #[cfg(any(target_os = "linux", target_os = "android"))]
        let len = unsafe { libc::listxattr(path.as_ptr(), ptr, buf.len()) };

        #[cfg(target_os = "macos")]
        let len = unsafe { libc::listxattr(path.as_ptr(), ptr, buf.len(), 0) };

        len as isize
    }

    fn remove(path: &CString, name: &CString) -> libc::c_int {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        let ret = unsafe { libc::removexattr(path.as_ptr(), name.as_ptr()) };

        #[cfg(target_os = "macos")]
        let ret = unsafe { libc::removexattr(path.as_ptr(), name.as_ptr(), 0) };

        ret
    }

    /// Remove every extended attribute the caller is allowed to remove
    pub fn strip_all(path: &Path) -> io::Result<usize> {
        let c_path = to_cstring(path.as_os_str().as_bytes())?;

        // First call sizes the NUL-separated name list
        let needed = list(&c_path, &mut []);
        if needed < 0 {
            return Err(io::Error::last_os_error());
        }
        if needed == 0 {
            return Ok(0);
        }

        let mut names = vec![0u8; needed as usize];
        let len = list(&c_path, &mut names);
        if len < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut removed = 0;
        for name in names[..len as usize].split(|&b| b == 0).filter(|n| !n.is_empty()) {
            let c_name = to_cstring(name)?;
            if remove(&c_path, &c_name) == 0 {
                removed += 1;
            } else {
                tracing::debug!(
                    path = %path.display(),
                    attribute = %String::from_utf8_lossy(name),
                    error = %io::Error::last_os_error(),
                    "Failed to remove extended attribute"
                );
            }
        }

        Ok(removed)
    }
}

#[cfg(windows)]
mod windows {
    use std::ffi::OsString;
    use std::io;
    use std::iter::once;
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr;
    use winapi::shared::minwindef::{DWORD, LPVOID};
    use winapi::um::fileapi::{
        DeleteFileW, FindClose, FindFirstStreamW, FindNextStreamW, GetDiskFreeSpaceW,
    };
    use winapi::um::handleapi::INVALID_HANDLE_VALUE;
    use winapi::um::minwinbase::{FindStreamInfoStandard, WIN32_FIND_STREAM_DATA};

    // The unnamed stream holding the file content itself
    const DEFAULT_STREAM: &str = "::$DATA";

    fn wide(s: &std::ffi::OsStr) -> Vec<u16> {
        s.encode_wide().chain(once(0)).collect()
    }

    /// Sectors per cluster × bytes per sector of the current drive
    pub fn cluster_size() -> Option<u64> {
        let mut sectors_per_cluster: DWORD = 0;
        let mut bytes_per_sector: DWORD = 0;
        let mut free_clusters: DWORD = 0;
        let mut total_clusters: DWORD = 0;

        let ok = unsafe {
            GetDiskFreeSpaceW(
                ptr::null(),
                &mut sectors_per_cluster,
                &mut bytes_per_sector,
                &mut free_clusters,
                &mut total_clusters,
            )
        };

        if ok == 0 {
            tracing::error!(error = %io::Error::last_os_error(), "Error getting block size on Windows");
            return None;
        }

        Some(sectors_per_cluster as u64 * bytes_per_sector as u64)
    }

    /// Delete every named alternate data stream attached to `path`
    pub fn strip_alternate_streams(path: &Path) -> io::Result<usize> {
        let wide_path = wide(path.as_os_str());
        let mut data: WIN32_FIND_STREAM_DATA = unsafe { mem::zeroed() };

        let handle = unsafe {
            FindFirstStreamW(
                wide_path.as_ptr(),
                FindStreamInfoStandard,
                &mut data as *mut WIN32_FIND_STREAM_DATA as LPVOID,
                0,
            )
        };

        if handle == INVALID_HANDLE_VALUE {
            let err = io::Error::last_os_error();
            // ERROR_HANDLE_EOF: the file has no streams to report
            return if err.raw_os_error() == Some(38) { Ok(0) } else { Err(err) };
        }

        let mut streams = Vec::new();
        loop {
            let len = data
                .cStreamName
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(data.cStreamName.len());
            let name = String::from_utf16_lossy(&data.cStreamName[..len]);
            if name != DEFAULT_STREAM {
                streams.push(name);
            }

            let more = unsafe {
                FindNextStreamW(handle, &mut data as *mut WIN32_FIND_STREAM_DATA as LPVOID)
            };
            if more == 0 {
                break;
            }
        }
        unsafe { FindClose(handle) };

        let mut removed = 0;
        for stream in streams {
            let mut target = OsString::from(path.as_os_str());
            target.push(&stream);
            let wide_target = wide(&target);

            if unsafe { DeleteFileW(wide_target.as_ptr()) } != 0 {
                removed += 1;
            } else {
                tracing::debug!(
                    path = %path.display(),
                    stream = %stream,
                    error = %io::Error::last_os_error(),
                    "Failed to delete alternate data stream"
                );
            }
        }

        Ok(removed)
    }
}

/// Test double with a fixed block size and no-op metadata handling
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedBlockOps(pub u64);

#[cfg(test)]
impl PlatformFileOps for FixedBlockOps {
    fn block_size(&self, _path: &Path) -> Option<u64> {
        Some(self.0)
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    fn strip_metadata(&self, _path: &Path) -> io::Result<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct NoBlockSize;

    impl PlatformFileOps for NoBlockSize {
        fn block_size(&self, _path: &Path) -> Option<u64> {
            None
        }

        fn sync(&self, _file: &File) -> io::Result<()> {
            Ok(())
        }

        fn strip_metadata(&self, _path: &Path) -> io::Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_default_block_size_when_unavailable() {
        assert_eq!(optimal_block_size(&NoBlockSize, Path::new("x")), DEFAULT_BLOCK_SIZE);
        assert_eq!(optimal_block_size(&FixedBlockOps(0), Path::new("x")), DEFAULT_BLOCK_SIZE);
        assert_eq!(optimal_block_size(&FixedBlockOps(512), Path::new("x")), 512);
    }

    #[test]
    fn test_native_block_size_is_positive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("attrs.bin");
        std::fs::write(&file, b"attrs").unwrap();

        assert!(optimal_block_size(&NativeFileOps, &file) > 0);
    }

    #[test]
    fn test_native_strip_metadata_on_plain_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"no attributes here").unwrap();

        // Some filesystems refuse listxattr entirely; content must survive either way
        let _ = NativeFileOps.strip_metadata(file.path());
        assert_eq!(std::fs::read(file.path()).unwrap(), b"no attributes here");
    }
}
