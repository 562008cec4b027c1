/// Verification module - Confirm overwritten bytes reached the disk
pub mod compare;
pub mod hash;

pub use compare::compare_with_disk;
pub use hash::{ContentHasher, Sha256Hasher};

use std::path::Path;

/// Result of checking on-disk content against the last written pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Mismatch,
    /// The file could not be read back; callers treat this as a mismatch
    Inconclusive,
}

impl VerificationOutcome {
    pub fn is_verified(self) -> bool {
        self == VerificationOutcome::Verified
    }
}

/// Verification engine.
///
/// Uses content hashing when a hasher is configured and falls back to a
/// block-wise byte comparison when there is none or when hashing could not
/// read the file.
pub struct Verifier {
    hasher: Option<Box<dyn ContentHasher>>,
}

impl Verifier {
    /// SHA-256 verification when `hashing` is set, byte comparison otherwise
    pub fn new(hashing: bool) -> Self {
        if hashing {
            Self::with_hasher(Box::new(Sha256Hasher))
        } else {
            Self::byte_compare()
        }
    }

    pub fn with_hasher(hasher: Box<dyn ContentHasher>) -> Self {
        Self {
            hasher: Some(hasher),
        }
    }

    pub fn byte_compare() -> Self {
        Self { hasher: None }
    }

    pub fn verify(&self, path: &Path, expected: &[u8], block_size: usize) -> VerificationOutcome {
        if let Some(hasher) = &self.hasher {
            match hasher.hash_file(path) {
                Ok(on_disk) => {
                    return if on_disk == hasher.hash_bytes(expected) {
                        tracing::info!(path = %path.display(), "Successfully verified file hash");
                        VerificationOutcome::Verified
                    } else {
                        tracing::warn!(path = %path.display(), "Hash mismatch");
                        VerificationOutcome::Mismatch
                    };
                }
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "Hashing could not read file, falling back to byte comparison"
                    );
                }
            }
        }

        compare_with_disk(path, expected, block_size)
    }
}

/// Hasher double that reports a wrong digest for files whose name contains
/// `marker`, and defers to SHA-256 for everything else
#[cfg(test)]
pub struct CorruptingHasher {
    pub marker: &'static str,
}

#[cfg(test)]
impl ContentHasher for CorruptingHasher {
    fn hash_file(&self, path: &Path) -> std::io::Result<String> {
        let digest = Sha256Hasher.hash_file(path)?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some_and(|n| n.contains(self.marker)) {
            Ok(format!("corrupted-{}", digest))
        } else {
            Ok(digest)
        }
    }

    fn hash_bytes(&self, data: &[u8]) -> String {
        Sha256Hasher.hash_bytes(data)
    }
}
