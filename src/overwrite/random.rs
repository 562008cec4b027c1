/// Random byte source for overwrite patterns and obfuscated names
///
/// Bytes come from the OS CSPRNG by default. If that source fails, the
/// source switches permanently to a seeded PRNG and keeps going instead of
/// aborting the run. [`RandomSource::seeded`] makes every draw reproducible.
use rand::distr::Alphanumeric;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng, TryRngCore};
use std::time::{SystemTime, UNIX_EPOCH};

/// Where random bytes are drawn from before any fallback kicks in
pub trait EntropySource {
    /// Fill `dest` completely or report why it could not
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), String>;
}

/// Operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), String> {
        OsRng.try_fill_bytes(dest).map_err(|e| e.to_string())
    }
}

/// Deterministic entropy from a fixed seed
#[cfg(test)]
pub struct SeededEntropy(StdRng);

#[cfg(test)]
impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

#[cfg(test)]
impl EntropySource for SeededEntropy {
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), String> {
        self.0.fill_bytes(dest);
        Ok(())
    }
}

pub struct RandomSource {
    primary: Box<dyn EntropySource>,
    fallback: Option<StdRng>,
}

impl RandomSource {
    /// Random source backed by the OS CSPRNG
    pub fn system() -> Self {
        Self::with_entropy(Box::new(OsEntropy))
    }

    /// Fully reproducible random source
    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self::with_entropy(Box::new(SeededEntropy::new(seed)))
    }

    pub fn with_entropy(primary: Box<dyn EntropySource>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Whether the primary source failed and the PRNG fallback is in use
    #[cfg(test)]
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn fill(&mut self, dest: &mut [u8]) {
        if let Some(rng) = self.fallback.as_mut() {
            rng.fill_bytes(dest);
            return;
        }

        if let Err(e) = self.primary.try_fill(dest) {
            tracing::warn!(error = %e, "Secure random source unavailable, falling back to seeded PRNG");
            let mut rng = StdRng::seed_from_u64(fallback_seed());
            rng.fill_bytes(dest);
            self.fallback = Some(rng);
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    /// PRNG for one block of one sub-pass.
    ///
    /// The seed mixes a fresh draw with the pass index, sub-pass and offset so
    /// the interleaving is not globally reproducible from a single seed leak.
    pub fn block_rng(&mut self, pass: u32, sub_pass: usize, offset: u64) -> StdRng {
        let seed = self
            .next_u64()
            .wrapping_add(u64::from(pass))
            .wrapping_add(sub_pass as u64)
            .wrapping_add(offset);
        StdRng::seed_from_u64(seed)
    }

    /// Random `[A-Za-z0-9]` string of `len` characters
    pub fn alphanumeric(&mut self, len: usize) -> String {
        StdRng::seed_from_u64(self.next_u64())
            .sample_iter(Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::system()
    }
}

fn fallback_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ u64::from(std::process::id()).rotate_left(32)
}

/// Entropy double that fails on every call
#[cfg(test)]
pub struct FailingEntropy {
    pub calls: std::rc::Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl EntropySource for FailingEntropy {
    fn try_fill(&mut self, _dest: &mut [u8]) -> Result<(), String> {
        self.calls.set(self.calls.get() + 1);
        Err("entropy source unavailable".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = RandomSource::seeded(42);
        let mut b = RandomSource::seeded(42);
        let mut c = RandomSource::seeded(43);

        let (mut buf_a, mut buf_b, mut buf_c) = ([0u8; 64], [0u8; 64], [0u8; 64]);
        a.fill(&mut buf_a);
        b.fill(&mut buf_b);
        c.fill(&mut buf_c);

        assert_eq!(buf_a, buf_b);
        assert_ne!(buf_a, buf_c);
    }

    #[test]
    fn test_fallback_when_entropy_fails() {
        let calls = Rc::new(Cell::new(0));
        let mut source = RandomSource::with_entropy(Box::new(FailingEntropy {
            calls: calls.clone(),
        }));

        let mut buf = [0u8; 256];
        source.fill(&mut buf);
        assert!(source.is_fallback());
        assert!(buf.iter().any(|&b| b != buf[0]));

        // Primary is not retried once the fallback took over
        source.fill(&mut buf);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_system_source_fills() {
        let mut source = RandomSource::system();
        let mut buf = [0u8; 128];
        source.fill(&mut buf);
        assert!(!source.is_fallback());
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_alphanumeric_names() {
        let mut source = RandomSource::seeded(7);
        let name = source.alphanumeric(32);
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(name, source.alphanumeric(32));
    }

    #[test]
    fn test_block_rng_depends_on_offset() {
        let mut a = RandomSource::seeded(1);
        let mut b = RandomSource::seeded(1);
        let x = a.block_rng(0, 1, 0).next_u64();
        let y = b.block_rng(0, 1, 4096).next_u64();
        assert_ne!(x, y);
    }
}
