//! Logging setup for the mirror node.
//!
//! The libraries only emit `tracing` events; installing a subscriber is
//! the binary's job.

use crate::args::Args;
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the debug flag.
/// The JSON flag switches to structured output for log shippers.
pub fn setup_logging(args: &Args) -> Result<()> {
    let level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_initialization_is_an_error_not_a_panic() {
        let args = Args::default();
        let first = setup_logging(&args);
        let second = setup_logging(&args);
        // Another test may have installed the subscriber first; either way
        // only one installation can succeed and none may panic.
        assert!(first.is_err() || second.is_err());
    }
}
