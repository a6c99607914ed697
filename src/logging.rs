//! `tracing` subscriber setup for binaries built on this crate.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `suitekit=trace`.
pub const LOG_ENV: &str = "SUITEKIT_LOG";

static INIT: OnceCell<()> = OnceCell::new();

/// Installs a stderr subscriber. `SUITEKIT_LOG` wins over `verbosity`. Only the first call
/// has an effect.
pub fn init(verbosity: u8) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

/// Directive used when `SUITEKIT_LOG` is unset: `-v` shows phase changes, `-vv` every
/// registration and filter decision.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "suitekit=debug",
        _ => "suitekit=trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_directives() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "suitekit=debug");
        assert_eq!(default_directive(7), "suitekit=trace");
    }

    #[test]
    fn init_is_idempotent() {
        init(0);
        init(2);
        assert!(INIT.get().is_some());
    }
}
