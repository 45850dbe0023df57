pub use tracing::{self, debug, error, info, instrument, trace, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset
const DEFAULT_DIRECTIVE: &str = "netvc=info";

/// Sets up the logging for any crate. A panic anywhere is logged and terminates the process
pub fn setup_log() {
    std::panic::set_hook(Box::new(|info| {
        error!(target: "netvc", "Panic occurred: {}", info);
        std::process::exit(1);
    }));

    setup_log_no_panic_hook()
}

/// Installs the subscriber only. Safe to call repeatedly; later calls are ignored
pub fn setup_log_no_panic_hook() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = SubscriberBuilder::default()
        .with_line_number(true)
        .with_file(true)
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(filter)
        .finish()
        .try_init();
}
