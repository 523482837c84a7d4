//! Diagnostic output setup for binaries and demos.
//!
//! The library itself only emits `tracing` events; what gets printed is
//! decided by whichever subscriber the application installs. [`init`] is a
//! shortcut that installs a formatted stderr subscriber whose threshold is
//! `RUST_LOG` when set, else `level`.

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes. Safe to call more than once.
pub fn init(level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(%level, "ftss-net logging initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(Level::DEBUG);
        assert!(!init(Level::TRACE));
    }
}
