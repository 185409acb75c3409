/*!
 * Native Diagnostic Snapshot
 */

use crate::core::RawHandle;
use crate::ffi::api::NativeApi;
use crate::ffi::rc::{RcType, ReturnCode};
use crate::ffi::read_string;
use serde::{Deserialize, Serialize};
use std::ffi::c_char;
use std::ptr;

/// Everything a context reported about the most recent failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeDiagnostic {
    pub rc: ReturnCode,
    pub rc_type: RcType,
    pub name: Option<String>,
    pub message: Option<String>,
    pub server_category_number: Option<i32>,
    pub server_category_str: Option<String>,
    pub server_code_number: Option<i32>,
    pub structured_code: Option<String>,
}

impl NativeDiagnostic {
    /// Snapshot carrying only the status code
    pub fn from_code(rc: ReturnCode) -> Self {
        Self {
            rc,
            rc_type: rc.rc_type(),
            name: Some(rc.name().into_owned()),
            message: None,
            server_category_number: None,
            server_category_str: None,
            server_code_number: None,
            structured_code: None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.rc_type == RcType::CoreServerError
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"rc\":{}}}", self.rc.raw()))
    }
}

/// Read every diagnostic field from a live context
///
/// Individual getters that fail leave their field empty. The caller holds the
/// context's lock so returned strings stay valid while they are copied.
pub(crate) fn read_diagnostic(api: &NativeApi, context: RawHandle, rc: ReturnCode) -> NativeDiagnostic {
    let ctx = context.as_ptr();
    let mut diagnostic = NativeDiagnostic::from_code(rc);

    // SAFETY: ctx is a live context; every out pointer is a valid local
    unsafe {
        let mut text: *const c_char = ptr::null();
        if ReturnCode::from((api.context_get_error_name)(ctx, &mut text)).is_ok() {
            if let Some(name) = read_string(text) {
                diagnostic.name = Some(name);
            }
        }

        text = ptr::null();
        if ReturnCode::from((api.context_get_error_message)(ctx, &mut text)).is_ok() {
            diagnostic.message = read_string(text);
        }

        if !diagnostic.is_server_error() {
            return diagnostic;
        }

        let mut number = 0i32;
        if ReturnCode::from((api.context_get_server_error_category_number)(ctx, &mut number)).is_ok() {
            diagnostic.server_category_number = Some(number);
        }

        text = ptr::null();
        if ReturnCode::from((api.context_get_server_error_category_str)(ctx, &mut text)).is_ok() {
            diagnostic.server_category_str = read_string(text);
        }

        number = 0;
        if ReturnCode::from((api.context_get_server_error_code_number)(ctx, &mut number)).is_ok() {
            diagnostic.server_code_number = Some(number);
        }

        text = ptr::null();
        if ReturnCode::from((api.context_get_server_error_structured_code)(ctx, &mut text)).is_ok() {
            diagnostic.structured_code = read_string(text);
        }
    }

    diagnostic
}
