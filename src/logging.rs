//! Diagnostic logging setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive.
pub const DEFAULT_FILTER: &str = "rsg=warn";
/// Filter directive used with `--verbose`.
pub const VERBOSE_FILTER: &str = "rsg=info";

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `verbose`.
///
/// Returns false if a global subscriber was already set.
pub fn init(verbose: bool) -> bool {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}
