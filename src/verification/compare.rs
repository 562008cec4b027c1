/// Byte-by-byte verification fallback
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::VerificationOutcome;

/// Walk the file in `block_size` windows and require exact equality with
/// `expected`. The first differing window short-circuits as a mismatch.
pub fn compare_with_disk(path: &Path, expected: &[u8], block_size: usize) -> VerificationOutcome {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "File failed to open for verification");
            return VerificationOutcome::Inconclusive;
        }
    };

    match file.metadata() {
        Ok(meta) if meta.len() != expected.len() as u64 => {
            tracing::warn!(
                path = %path.display(),
                on_disk = meta.len(),
                expected = expected.len(),
                "Verification failed: size changed"
            );
            return VerificationOutcome::Mismatch;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to stat file for verification");
            return VerificationOutcome::Inconclusive;
        }
    }

    let block_size = block_size.max(1);
    let mut buffer = vec![0u8; block_size];

    for (index, window) in expected.chunks(block_size).enumerate() {
        let read = &mut buffer[..window.len()];
        if let Err(e) = file.read_exact(read) {
            tracing::error!(path = %path.display(), error = %e, "Read failed during verification");
            return VerificationOutcome::Inconclusive;
        }

        if *read != *window {
            tracing::debug!(
                path = %path.display(),
                offset = index * block_size,
                "Verification failed at offset"
            );
            return VerificationOutcome::Mismatch;
        }
    }

    VerificationOutcome::Verified
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_identical_content_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7) as u8).collect();
        fs::write(&path, &data).unwrap();

        assert_eq!(compare_with_disk(&path, &data, 4096), VerificationOutcome::Verified);
    }

    #[test]
    fn test_single_byte_difference_is_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diff.bin");
        let data = vec![0xAAu8; 10_000];
        let mut on_disk = data.clone();
        on_disk[9_999] = 0xAB;
        fs::write(&path, &on_disk).unwrap();

        assert_eq!(compare_with_disk(&path, &data, 4096), VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_length_difference_is_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        fs::write(&path, vec![1u8; 10]).unwrap();

        assert_eq!(compare_with_disk(&path, &[1u8; 11], 4), VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_unreadable_is_inconclusive() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            compare_with_disk(&dir.path().join("missing"), b"abc", 4096),
            VerificationOutcome::Inconclusive
        );
    }
}
