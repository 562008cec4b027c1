/// Configuration loader
use super::schema::ShredConfig;
use crate::error::{Result, ShredError};
use std::fs;
use std::path::Path;

/// Load configuration from a JSON file.
///
/// Missing fields take their defaults; the result is validated before it is
/// returned.
pub fn load_config(path: &Path) -> Result<ShredConfig> {
    let content = fs::read_to_string(path).map_err(|source| ShredError::ConfigLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let config: ShredConfig = serde_json::from_str(&content)?;

    config.validate()?;

    Ok(config)
}
