//! Logging initialization.
//!
//! Controlled by `GIT_TF_LOG`:
//! - `"stderr"` → JSON spans/events to stderr, filtered by `RUST_LOG`
//!   (default `info`)
//! - unset → compact human-readable events to stderr at `warn`, raised to
//!   `info` with `-v` and `debug` with `-vv`
//!
//! User-facing progress is printed to stdout by the commands themselves and
//! is not affected by either mode.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Install the global subscriber. Call once, before any command runs.
pub fn init(verbose: u8) {
    match std::env::var("GIT_TF_LOG").ok().as_deref() {
        Some("stderr") => init_json(),
        _ => init_compact(verbose),
    }
}

/// JSON spans/events to stderr via tracing-subscriber's JSON formatter.
fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .init();
}

fn init_compact(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
