//! Tracing setup.
//!
//! Logs go to stderr so that CLI subcommands can print clean JSON to stdout.
//! `RUST_LOG` controls the filter (default `info`); `AWAYBOT_LOG_FORMAT=json`
//! switches to line-delimited JSON output for log collectors.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Call once, at startup.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let format = std::env::var("AWAYBOT_LOG_FORMAT").unwrap_or_default();

    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
