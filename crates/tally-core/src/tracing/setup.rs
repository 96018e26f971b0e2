//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the Tally logging system.
///
/// Reads the `TALLY_LOG` environment variable for per-target log levels,
/// e.g. `TALLY_LOG=tally_storage=debug,tally_core=warn`.
///
/// Falls back to `tally_storage=info,tally_core=info` if `TALLY_LOG` is not
/// set or is invalid. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("TALLY_LOG")
            .unwrap_or_else(|_| EnvFilter::new("tally_storage=info,tally_core=info"));

        // A host that already installed a subscriber keeps it.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(filter)
            .try_init();
    });
}
