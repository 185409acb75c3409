/*!
 * Structured Tracing
 * Host-side subscriber setup and spans around native calls
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::ffi::ReturnCode;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Native calls slower than this are logged at debug level
pub const SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - TSURUGI_BRIDGE_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering one native entry point invocation
pub struct NativeCallSpan {
    span: tracing::Span,
    start: Instant,
    operation: &'static str,
}

impl NativeCallSpan {
    pub fn new(operation: &'static str) -> Self {
        let span = span!(
            Level::TRACE,
            "native_call",
            operation = operation,
            duration_us = tracing::field::Empty,
            rc = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            operation,
        }
    }

    /// Record the status code returned by the call
    pub fn record_rc(&self, rc: ReturnCode) {
        self.span.record("rc", tracing::field::display(rc));
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for NativeCallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_CALL_THRESHOLD {
            debug!(
                operation = self.operation,
                duration_ms = duration.as_millis() as u64,
                "slow native call"
            );
        }
    }
}

/// Log a teardown that needed longer than expected
pub fn warn_slow_teardown(manager: &str, duration: Duration) {
    if duration > SLOW_CALL_THRESHOLD {
        warn!(manager, duration_ms = duration.as_millis() as u64, "slow resource manager teardown");
    }
}
