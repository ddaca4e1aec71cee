//! Telemetry & Observability
//!
//! Structured logging for playback:
//! - Span per run, group and step (see `timeline::player`)
//! - Configurable log levels via RUST_LOG or the config file
//! - Log-safe rendering of labels that come from plan files

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sanitize a string for safe log output by escaping control characters.
/// Plan files are user-supplied, so labels could embed newlines that forge
/// log entries.
pub fn sanitize_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x1b' => out.push_str("\\e"),
            '\x00' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}

/// Pick the filter directive to use.
///
/// `RUST_LOG` wins over the configured filter; `--verbose` forces `info`
/// when neither is set. Returns `None` when logging should stay off so the
/// terminal view is not interleaved with log lines.
pub fn resolve_filter(configured: Option<&str>, verbose: bool) -> Option<String> {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return Some(filter);
    }
    match configured {
        Some(filter) => Some(filter.to_string()),
        None if verbose => Some(Level::INFO.to_string().to_lowercase()),
        None => None,
    }
}

/// Initialize global tracing for the CLI.
pub fn init_tracing(configured: Option<&str>, verbose: bool) {
    if let Some(filter) = resolve_filter(configured, verbose) {
        init_tracing_with_filter(&filter);
    }
}

/// Initialize with custom filter string
pub fn init_tracing_with_filter(filter: &str) {
    // Skip if already initialized
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_level(true)
            .compact()
            .with_writer(std::io::stderr);

        let filter_layer = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}

/// Initialize tracing for tests with a simple subscriber
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
