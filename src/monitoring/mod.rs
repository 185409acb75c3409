/*!
 * Monitoring
 * Structured tracing for native calls and resource teardown
 */

mod tracer;

pub use tracer::{init_tracing, warn_slow_teardown, NativeCallSpan, SLOW_CALL_THRESHOLD};
