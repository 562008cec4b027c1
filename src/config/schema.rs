/// Configuration schema for the shredder
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ShredError};

/// Immutable run configuration, built once and passed into every component
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShredConfig {
    /// Number of overwrite passes per file
    #[serde(default = "default_passes")]
    pub passes: u32,

    /// Descend into directories
    #[serde(default)]
    pub recursive: bool,

    /// Overwrite but do not delete
    #[serde(default)]
    pub keep_files: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Resolve symlinks and shred their targets instead of skipping them
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Multi-pattern (DoD-style) overwrite instead of a single random fill
    #[serde(default)]
    pub secure_mode: bool,

    /// Log what would happen without touching anything
    #[serde(default)]
    pub dry_run: bool,

    /// Verify on-disk content after every pass
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Try to acquire read/write rights on files that deny them
    #[serde(default)]
    pub force: bool,

    /// Use SHA-256 content hashing for verification.
    /// false = byte-by-byte comparison only
    #[serde(default = "default_true")]
    pub hash_verification: bool,

    /// Open attempts before a file is abandoned
    #[serde(default = "default_open_attempts")]
    pub open_attempts: u32,

    /// Delay between open attempts (milliseconds)
    #[serde(default = "default_open_retry_delay_ms")]
    pub open_retry_delay_ms: u64,

    /// Pause around the metadata scrub during deletion (milliseconds)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Directory obfuscated files are moved into before deletion.
    /// None = system temporary directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

fn default_passes() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_open_attempts() -> u32 {
    10
}

fn default_open_retry_delay_ms() -> u64 {
    500
}

fn default_settle_delay_ms() -> u64 {
    50
}

impl Default for ShredConfig {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            recursive: false,
            keep_files: false,
            verbose: false,
            follow_symlinks: false,
            secure_mode: false,
            dry_run: false,
            verify: true,
            force: false,
            hash_verification: true,
            open_attempts: default_open_attempts(),
            open_retry_delay_ms: default_open_retry_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            temp_dir: None,
        }
    }
}

impl ShredConfig {
    pub fn open_retry_delay(&self) -> Duration {
        Duration::from_millis(self.open_retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Effective neutral directory for obfuscated renames
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.passes == 0 {
            return Err(ShredError::InvalidConfig(
                "passes must be a positive integer".to_string(),
            ));
        }

        if self.open_attempts == 0 {
            return Err(ShredError::InvalidConfig(
                "open_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = ShredConfig::default();
        assert!(config.validate().is_ok());

        config.passes = 0;
        assert!(config.validate().is_err());

        config.passes = 50;
        config.open_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_values() {
        let config: ShredConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ShredConfig::default());
        assert_eq!(config.passes, 3);
        assert!(config.verify);
        assert!(config.hash_verification);
        assert!(!config.keep_files);
        assert_eq!(config.open_attempts, 10);
        assert_eq!(config.open_retry_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_temp_dir_override() {
        let json = r#"{ "temp_dir": "/var/tmp/scratch", "secure_mode": true }"#;
        let config: ShredConfig = serde_json::from_str(json).unwrap();
        assert!(config.secure_mode);
        assert_eq!(config.temp_dir(), PathBuf::from("/var/tmp/scratch"));
    }
}
