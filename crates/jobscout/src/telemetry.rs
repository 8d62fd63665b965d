//! Process-wide logging setup. Called once from `main`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "jobscout=debug"
    } else {
        "jobscout=info"
    }
}

/// Install the global subscriber: human-readable lines on stderr, plus plain
/// lines appended to `log_file` when given. `RUST_LOG` takes precedence over
/// `verbose`.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("logger already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "jobscout=info");
        assert_eq!(default_directive(true), "jobscout=debug");
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let err = init(false, Some(Path::new("/nonexistent/dir/jobscout.log"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open log file"));
    }
}
