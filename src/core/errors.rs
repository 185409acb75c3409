/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::ResourceKind;
use crate::context::NativeDiagnostic;
use crate::ffi::rc::{RcType, ReturnCode};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Where a failure originated, which decides whether a retry can help
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Misuse of the bridge or bad arguments; never retried
    LocalArgument,
    /// Client-side runtime failure (timeout, I/O); retry at caller's discretion
    ClientRuntime,
    /// Diagnostic reported by the database server; surfaced verbatim
    ServerDiagnostic,
}

/// Errors raised by the bridge
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum BridgeError {
    #[error("{kind} already closed")]
    #[diagnostic(
        code(bridge::already_closed),
        help("The native object was released. Create a new one instead of reusing it.")
    )]
    AlreadyClosed { kind: ResourceKind },

    #[error("Job<{name}> already taken")]
    #[diagnostic(
        code(bridge::already_taken),
        help("A job result can be consumed once. Keep the value returned by the first take.")
    )]
    AlreadyTaken { name: String },

    #[error("resource manager already closed")]
    #[diagnostic(
        code(bridge::manager_closed),
        help("Allocations and registrations are only valid while the manager scope is open.")
    )]
    ManagerClosed,

    #[error("invalid argument: {0}")]
    #[diagnostic(code(bridge::argument))]
    Argument(String),

    #[error("native call {operation} returned a null handle")]
    #[diagnostic(
        code(bridge::null_handle),
        help("The native library reported success without producing an object.")
    )]
    NullHandle { operation: &'static str },

    #[error("{message}")]
    #[diagnostic(code(bridge::native))]
    Native {
        rc: ReturnCode,
        message: String,
        diagnostic: Option<NativeDiagnostic>,
    },

    #[error("failed to load native library {}: {reason}", .path.display())]
    #[diagnostic(
        code(bridge::library_load),
        help("Check the library path and that every tsurugi_ffi_* symbol is exported.")
    )]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(bridge::config))]
    Config(String),

    #[error("{count} failure(s) during teardown, first: {primary}")]
    #[diagnostic(
        code(bridge::teardown),
        help("Every resource was still released. Related errors list the remaining failures.")
    )]
    Teardown {
        count: usize,
        primary: Box<BridgeError>,
        #[related]
        secondary: Vec<BridgeError>,
    },
}

impl BridgeError {
    /// Build a native failure from a status code and the context snapshot, if any
    pub fn native(rc: ReturnCode, diagnostic: Option<NativeDiagnostic>) -> Self {
        let message = diagnostic
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or_else(|| format!("native call failed with {}", rc.name()));
        BridgeError::Native {
            rc,
            message,
            diagnostic,
        }
    }

    /// Fold collected teardown failures into one error; `None` when empty
    pub fn aggregate(mut errors: Vec<BridgeError>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        let count = errors.len();
        let primary = errors.remove(0);
        Some(BridgeError::Teardown {
            count,
            primary: Box::new(primary),
            secondary: errors,
        })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::Native { rc, .. } => match rc.rc_type() {
                RcType::CoreServerError => ErrorCategory::ServerDiagnostic,
                RcType::CoreClientError => ErrorCategory::ClientRuntime,
                RcType::Ok | RcType::FfiError => ErrorCategory::LocalArgument,
            },
            BridgeError::LibraryLoad { .. } | BridgeError::NullHandle { .. } => {
                ErrorCategory::ClientRuntime
            }
            BridgeError::Teardown { primary, .. } => primary.category(),
            _ => ErrorCategory::LocalArgument,
        }
    }

    /// True when a bounded operation hit its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Native { rc, .. } if *rc == ReturnCode::CORE_CLIENT_TIMEOUT_ERROR)
    }

    /// Native status code carried by this error, if it came from the library
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            BridgeError::Native { rc, .. } => Some(*rc),
            BridgeError::Teardown { primary, .. } => primary.return_code(),
            _ => None,
        }
    }

    /// Server diagnostic attached to a native failure
    pub fn diagnostic(&self) -> Option<&NativeDiagnostic> {
        match self {
            BridgeError::Native { diagnostic, .. } => diagnostic.as_ref(),
            _ => None,
        }
    }
}
