/// Overwrite pass engine
use rand::RngCore;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use super::plan::{PassPlan, Pattern};
use super::random::RandomSource;
use crate::error::{Result, ShredError};
use crate::utils::platform::{PlatformFileOps, optimal_block_size};

pub struct OverwriteEngine<'a> {
    ops: &'a dyn PlatformFileOps,
}

impl<'a> OverwriteEngine<'a> {
    pub fn new(ops: &'a dyn PlatformFileOps) -> Self {
        Self { ops }
    }

    /// Execute one pass of `plan` over the first `file_size` bytes of `file`.
    ///
    /// The file is walked in block-sized windows; every step of the plan is
    /// written over a window before moving to the next one. With `retain`, the
    /// bytes of the final step are returned in full so the caller can verify
    /// them; otherwise the returned buffer is empty. The file is never resized.
    /// On a write error the file is left exactly as far as the failing write
    /// reached.
    #[allow(clippy::too_many_arguments)]
    pub fn run_pass(
        &self,
        file: &mut File,
        path: &Path,
        file_size: u64,
        plan: &PassPlan,
        pass_index: u32,
        random: &mut RandomSource,
        retain: bool,
    ) -> Result<Vec<u8>> {
        let retained_len = usize::try_from(file_size).map_err(|_| {
            ShredError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "file too large to overwrite"),
            )
        })?;

        let block_size = optimal_block_size(self.ops, path);
        let final_index = plan.final_index();
        let mut buffer = vec![0u8; block_size];
        let mut written = if retain { vec![0u8; retained_len] } else { Vec::new() };

        tracing::debug!(
            path = %path.display(),
            pass = pass_index + 1,
            block_size,
            steps = plan.steps().len(),
            "Starting overwrite pass"
        );

        let mut offset = 0usize;
        while offset < retained_len {
            let len = block_size.min(retained_len - offset);
            let chunk = &mut buffer[..len];

            for (step_index, pattern) in plan.steps().iter().enumerate() {
                match pattern {
                    Pattern::Fixed(byte) => chunk.fill(*byte),
                    Pattern::Random if plan.is_secure() => random
                        .block_rng(pass_index, step_index, offset as u64)
                        .fill_bytes(chunk),
                    Pattern::Random => random.fill(chunk),
                }

                file.seek(SeekFrom::Start(offset as u64))
                    .map_err(|e| ShredError::io(path, e))?;
                file.write_all(chunk).map_err(|e| ShredError::io(path, e))?;

                if retain && step_index == final_index {
                    written[offset..offset + len].copy_from_slice(chunk);
                }
            }

            offset += len;
        }

        file.flush().map_err(|e| ShredError::io(path, e))?;
        self.ops.sync(file).map_err(|e| ShredError::io(path, e))?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::platform::FixedBlockOps;
    use std::fs::{self, OpenOptions};

    fn fixture(dir: &Path, name: &str, size: usize) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![0x5Au8; size]).unwrap();
        path
    }

    fn open_rw(path: &Path) -> File {
        OpenOptions::new().read(true).write(true).open(path).unwrap()
    }

    #[test]
    fn test_random_pass_matches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "a.txt", 10_000);
        let ops = FixedBlockOps(4096);
        let mut random = RandomSource::seeded(11);

        let mut file = open_rw(&path);
        let written = OverwriteEngine::new(&ops)
            .run_pass(&mut file, &path, 10_000, &PassPlan::random(), 0, &mut random, true)
            .unwrap();
        drop(file);

        let on_disk = fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), 10_000);
        assert_eq!(on_disk, written);
        assert_ne!(on_disk, vec![0x5Au8; 10_000]);
    }

    #[test]
    fn test_seeded_pass_content_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "b.bin", 8192);
        let ops = FixedBlockOps(4096);

        let mut file = open_rw(&path);
        let written = OverwriteEngine::new(&ops)
            .run_pass(&mut file, &path, 8192, &PassPlan::random(), 0, &mut RandomSource::seeded(5), true)
            .unwrap();

        let mut expected_source = RandomSource::seeded(5);
        let mut expected = vec![0u8; 8192];
        let (first, second) = expected.split_at_mut(4096);
        expected_source.fill(first);
        expected_source.fill(second);

        assert_eq!(written, expected);
        assert_eq!(fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn test_odd_block_size_covers_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "odd.bin", 1000);
        let ops = FixedBlockOps(7);

        let mut file = open_rw(&path);
        let written = OverwriteEngine::new(&ops)
            .run_pass(&mut file, &path, 1000, &PassPlan::random(), 0, &mut RandomSource::seeded(3), true)
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), written);
    }

    #[test]
    fn test_secure_pass_is_deterministic_with_seed() {
        let dir = tempfile::tempdir().unwrap();
        let first = fixture(dir.path(), "s1.bin", 5000);
        let second = fixture(dir.path(), "s2.bin", 5000);
        let ops = FixedBlockOps(1024);
        let engine = OverwriteEngine::new(&ops);

        let mut file = open_rw(&first);
        let written_first = engine
            .run_pass(&mut file, &first, 5000, &PassPlan::secure(), 2, &mut RandomSource::seeded(99), true)
            .unwrap();
        let mut file = open_rw(&second);
        let written_second = engine
            .run_pass(&mut file, &second, 5000, &PassPlan::secure(), 2, &mut RandomSource::seeded(99), true)
            .unwrap();

        assert_eq!(written_first, written_second);
        assert_eq!(fs::read(&first).unwrap(), written_first);
        // Final step is random, never one of the fixed fills
        assert!(written_first.iter().any(|&b| b != 0x00 && b != 0xFF));
    }

    #[test]
    fn test_does_not_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "tail.bin", 100);
        let ops = FixedBlockOps(4096);

        let mut file = open_rw(&path);
        OverwriteEngine::new(&ops)
            .run_pass(&mut file, &path, 100, &PassPlan::secure(), 0, &mut RandomSource::seeded(1), true)
            .unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn test_without_retention_returns_nothing_but_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "unverified.bin", 6000);
        let ops = FixedBlockOps(4096);

        let mut file = open_rw(&path);
        let written = OverwriteEngine::new(&ops)
            .run_pass(&mut file, &path, 6000, &PassPlan::random(), 0, &mut RandomSource::seeded(8), false)
            .unwrap();

        assert!(written.is_empty());
        let on_disk = fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), 6000);
        assert_ne!(on_disk, vec![0x5Au8; 6000]);
    }

    #[test]
    fn test_empty_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "empty.bin", 0);
        let ops = FixedBlockOps(4096);

        let mut file = open_rw(&path);
        let written = OverwriteEngine::new(&ops)
            .run_pass(&mut file, &path, 0, &PassPlan::random(), 0, &mut RandomSource::seeded(1), true)
            .unwrap();

        assert!(written.is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
