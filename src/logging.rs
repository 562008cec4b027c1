/// Structured logging setup
///
/// Everything goes to stderr through `tracing-subscriber`. Progress, dry-run
/// intent and the final summary use their own targets so they stay visible
/// at the default `warn` level. `RUST_LOG` replaces the defaults entirely.
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{Result, ShredError};

const ALWAYS_ON: &str = "shredder::progress=info,shredder::dry_run=info,shredder::summary=info";

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "info" } else { "warn" };
    format!("{level},{ALWAYS_ON}")
}

fn build_filter(verbose: bool) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directives(verbose))
            .map_err(|e| ShredError::Logging(e.to_string())),
    }
}

pub fn init(verbose: bool) -> Result<()> {
    let filter = build_filter(verbose)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ShredError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for verbose in [false, true] {
            let directives = default_directives(verbose);
            assert!(EnvFilter::try_new(&directives).is_ok(), "{directives}");
        }
    }

    #[test]
    fn test_verbose_raises_level() {
        assert!(default_directives(false).starts_with("warn,"));
        assert!(default_directives(true).starts_with("info,"));
        assert!(default_directives(false).contains("shredder::progress=info"));
    }
}
