/// Error taxonomy for the shredder
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure a single target (or the run setup) can end in.
///
/// Permission denial and permission interrogation failure are deliberately
/// separate variants: the first means the bits were read and deny access,
/// the second means they could not be read at all.
#[derive(Error, Debug)]
pub enum ShredError {
    /// I/O failure tied to a specific path.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission bits were read and deny the access we need.
    #[error("Permission denied for '{}'", path.display())]
    PermissionDenied { path: PathBuf },

    /// Permission bits could not be determined.
    #[error("Could not determine permissions of '{}': {source}", path.display())]
    PermissionInterrogation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be opened for overwriting within the retry bound.
    #[error("Failed to open '{}' after {attempts} attempts: {source}", path.display())]
    OpenRetryExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// Neither a regular file, a directory nor a symlink.
    #[error("'{}' is not a valid file or directory", path.display())]
    Unsupported { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file '{}': {source}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    /// A panic caught at the per-target boundary.
    #[error("Unexpected failure while processing '{}': {message}", path.display())]
    Unexpected { path: PathBuf, message: String },
}

impl ShredError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ShredError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShredError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_path() {
        let err = ShredError::PermissionDenied {
            path: PathBuf::from("/tmp/secret.txt"),
        };
        assert_eq!(err.to_string(), "Permission denied for '/tmp/secret.txt'");
    }

    #[test]
    fn test_interrogation_is_not_denial() {
        let err = ShredError::PermissionInterrogation {
            path: PathBuf::from("a.txt"),
            source: io::Error::new(io::ErrorKind::Other, "stat failed"),
        };
        assert!(!matches!(err, ShredError::PermissionDenied { .. }));
        assert!(err.to_string().contains("Could not determine permissions"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: ShredError = parse_err.into();
        assert!(err.to_string().starts_with("Failed to parse config"));
    }
}
