/*!
 * Native Library Loading
 *
 * Resolves the symbol table once per process from a shared library, or wraps
 * an in-process table. Function pointers stay valid while the library lives.
 */

use super::api::{NativeApi, SYMBOLS};
use crate::core::{BridgeConfig, BridgeError, BridgeResult};
use libloading::Library;
use parking_lot::{const_mutex, Mutex};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

static GLOBAL: OnceLock<Arc<NativeLibrary>> = OnceLock::new();
static GLOBAL_LOAD: Mutex<()> = const_mutex(());

/// Where a symbol table came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOrigin {
    Path(PathBuf),
    InProcess(&'static str),
}

/// Loaded native client library
pub struct NativeLibrary {
    api: NativeApi,
    origin: LibraryOrigin,
    // Keeps the mapped image alive for the function pointers in `api`
    _library: Option<Library>,
}

impl NativeLibrary {
    /// Load a shared library and resolve every `tsurugi_ffi_*` entry point
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let load_error = |reason: String| BridgeError::LibraryLoad {
            path: path.clone(),
            reason,
        };

        // SAFETY: loading runs the library's initializers; the caller vouches
        // for the path pointing at the native client library.
        let library = unsafe { Library::new(&path) }.map_err(|e| load_error(e.to_string()))?;

        let mut index = 0usize;
        let mut next = || {
            let name = SYMBOLS[index];
            index += 1;
            name
        };

        // SAFETY: each type matches the C prototype of the named symbol
        let api = unsafe {
            NativeApi {
                context_create: resolve(&library, next()).map_err(&load_error)?,
                context_get_return_code: resolve(&library, next()).map_err(&load_error)?,
                context_get_error_name: resolve(&library, next()).map_err(&load_error)?,
                context_get_error_type: resolve(&library, next()).map_err(&load_error)?,
                context_get_error_message: resolve(&library, next()).map_err(&load_error)?,
                context_get_server_error_category_number: resolve(&library, next())
                    .map_err(&load_error)?,
                context_get_server_error_category_str: resolve(&library, next())
                    .map_err(&load_error)?,
                context_get_server_error_code_number: resolve(&library, next())
                    .map_err(&load_error)?,
                context_get_server_error_structured_code: resolve(&library, next())
                    .map_err(&load_error)?,
                context_dispose: resolve(&library, next()).map_err(&load_error)?,
                cancel_job_wait: resolve(&library, next()).map_err(&load_error)?,
                cancel_job_is_done: resolve(&library, next()).map_err(&load_error)?,
                cancel_job_dispose: resolve(&library, next()).map_err(&load_error)?,
                job_get_name: resolve(&library, next()).map_err(&load_error)?,
                job_wait: resolve(&library, next()).map_err(&load_error)?,
                job_is_done: resolve(&library, next()).map_err(&load_error)?,
                job_take: resolve(&library, next()).map_err(&load_error)?,
                job_take_for: resolve(&library, next()).map_err(&load_error)?,
                job_take_if_ready: resolve(&library, next()).map_err(&load_error)?,
                job_cancel: resolve(&library, next()).map_err(&load_error)?,
                job_cancel_for: resolve(&library, next()).map_err(&load_error)?,
                job_cancel_async: resolve(&library, next()).map_err(&load_error)?,
                job_close: resolve(&library, next()).map_err(&load_error)?,
                job_dispose: resolve(&library, next()).map_err(&load_error)?,
                env_logger_init: resolve(&library, next()).map_err(&load_error)?,
            }
        };

        info!(path = %path.display(), symbols = SYMBOLS.len(), "Native library loaded");

        Ok(Arc::new(Self {
            api,
            origin: LibraryOrigin::Path(path),
            _library: Some(library),
        }))
    }

    /// Wrap a symbol table whose functions live in this process
    pub fn from_api(api: NativeApi, label: &'static str) -> Arc<Self> {
        debug!(label, "Using in-process native symbol table");
        Arc::new(Self {
            api,
            origin: LibraryOrigin::InProcess(label),
            _library: None,
        })
    }

    /// Process-wide library, loaded on first use from the configured path
    pub fn global(config: &BridgeConfig) -> BridgeResult<Arc<Self>> {
        if let Some(library) = GLOBAL.get() {
            return Ok(Arc::clone(library));
        }

        let _guard = GLOBAL_LOAD.lock();
        if let Some(library) = GLOBAL.get() {
            return Ok(Arc::clone(library));
        }

        let library = Self::load(config.resolve_library_path()?)?;
        Ok(Arc::clone(GLOBAL.get_or_init(|| library)))
    }

    #[inline]
    pub fn api(&self) -> &NativeApi {
        &self.api
    }

    pub fn origin(&self) -> &LibraryOrigin {
        &self.origin
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// # Safety
///
/// `T` must be the exact function-pointer type of the exported symbol.
unsafe fn resolve<T: Copy>(library: &Library, name: &str) -> Result<T, String> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|e| format!("missing symbol {name}: {e}"))
}
