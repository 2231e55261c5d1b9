//! Tracing setup for the sidecar.
//!
//! Stdout carries the IPC protocol, so every log line goes to stderr.
//! `RUST_LOG` selects verbosity (default `info`); `REPORTCARDD_LOG_JSON=1`
//! switches to newline-delimited JSON.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const JSON_ENV: &str = "REPORTCARDD_LOG_JSON";

fn json_requested() -> bool {
    std::env::var(JSON_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_requested() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
            .try_init()
            .ok();
    }
}
