/*!
 * Bridge Limits and Constants
 *
 * Sizing defaults for manager regions and registries, plus the
 * environment variable names the bridge reads.
 */

// =============================================================================
// ALLOCATION REGION
// =============================================================================

/// Initial capacity of a manager's allocation region (4KB)
/// Out-parameters and short argument strings fit without a second chunk
pub const DEFAULT_REGION_CAPACITY: usize = 4 * 1024;

// =============================================================================
// RESOURCE REGISTRY
// =============================================================================

/// Initial registry capacity per manager
pub const REGISTRY_INITIAL_CAPACITY: usize = 64;

/// Registry shard count (power of two, required by dashmap)
/// [PERF] Few shards: a manager scope is usually driven by a handful of threads
pub const REGISTRY_SHARDS: usize = 8;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Native library location, consulted when no explicit path is configured
pub const ENV_LIBRARY_PATH: &str = "TSURUGI_FFI_LIBRARY_PATH";

/// Filter expression for the native library's own logger
pub const ENV_NATIVE_LOG: &str = "TSURUGI_FFI_LOG";

/// Output file for the native library's own logger
pub const ENV_NATIVE_LOG_FILE: &str = "TSURUGI_FFI_LOG_FILE";

/// Selects JSON output for host-side tracing
pub const ENV_TRACE_JSON: &str = "TSURUGI_BRIDGE_TRACE_JSON";
