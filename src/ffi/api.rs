/*!
 * Native Entry Points
 *
 * Function-pointer table for every `tsurugi_ffi_*` symbol the core consumes.
 * Handles are passed as opaque pointers; a null context means "no diagnostics".
 */

use std::ffi::{c_char, c_void};

/// Raw status code as returned across the boundary
pub type RawRc = u32;

pub type CreateFn = unsafe extern "C" fn(out: *mut *mut c_void) -> RawRc;
pub type DisposeFn = unsafe extern "C" fn(handle: *mut c_void);
pub type GetU32Fn = unsafe extern "C" fn(ctx: *mut c_void, out: *mut u32) -> RawRc;
pub type GetI32Fn = unsafe extern "C" fn(ctx: *mut c_void, out: *mut i32) -> RawRc;
pub type GetStrFn = unsafe extern "C" fn(ctx: *mut c_void, out: *mut *const c_char) -> RawRc;

pub type TargetStrFn =
    unsafe extern "C" fn(ctx: *mut c_void, target: *mut c_void, out: *mut *const c_char) -> RawRc;
pub type TargetBoolFn =
    unsafe extern "C" fn(ctx: *mut c_void, target: *mut c_void, out: *mut bool) -> RawRc;
pub type TargetTimedBoolFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    target: *mut c_void,
    timeout_nanos: u64,
    out: *mut bool,
) -> RawRc;
pub type TargetHandleFn =
    unsafe extern "C" fn(ctx: *mut c_void, target: *mut c_void, out: *mut *mut c_void) -> RawRc;
pub type TargetTimedHandleFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    target: *mut c_void,
    timeout_nanos: u64,
    out: *mut *mut c_void,
) -> RawRc;
pub type TakeIfReadyFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    target: *mut c_void,
    is_ready_out: *mut bool,
    value_out: *mut *mut c_void,
) -> RawRc;
pub type TargetFn = unsafe extern "C" fn(ctx: *mut c_void, target: *mut c_void) -> RawRc;
pub type LoggerInitFn =
    unsafe extern "C" fn(filters: *const c_char, file_path: *const c_char) -> RawRc;

/// Symbol table of the native client library
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub context_create: CreateFn,
    pub context_get_return_code: GetU32Fn,
    pub context_get_error_name: GetStrFn,
    pub context_get_error_type: GetU32Fn,
    pub context_get_error_message: GetStrFn,
    pub context_get_server_error_category_number: GetI32Fn,
    pub context_get_server_error_category_str: GetStrFn,
    pub context_get_server_error_code_number: GetI32Fn,
    pub context_get_server_error_structured_code: GetStrFn,
    pub context_dispose: DisposeFn,

    pub cancel_job_wait: TargetTimedBoolFn,
    pub cancel_job_is_done: TargetBoolFn,
    pub cancel_job_dispose: DisposeFn,

    pub job_get_name: TargetStrFn,
    pub job_wait: TargetTimedBoolFn,
    pub job_is_done: TargetBoolFn,
    pub job_take: TargetHandleFn,
    pub job_take_for: TargetTimedHandleFn,
    pub job_take_if_ready: TakeIfReadyFn,
    pub job_cancel: TargetBoolFn,
    pub job_cancel_for: TargetTimedBoolFn,
    pub job_cancel_async: TargetHandleFn,
    pub job_close: TargetFn,
    pub job_dispose: DisposeFn,

    pub env_logger_init: LoggerInitFn,
}

/// Exported symbol names, in `NativeApi` field order
pub const SYMBOLS: [&str; 25] = [
    "tsurugi_ffi_context_create",
    "tsurugi_ffi_context_get_return_code",
    "tsurugi_ffi_context_get_error_name",
    "tsurugi_ffi_context_get_error_type",
    "tsurugi_ffi_context_get_error_message",
    "tsurugi_ffi_context_get_server_error_category_number",
    "tsurugi_ffi_context_get_server_error_category_str",
    "tsurugi_ffi_context_get_server_error_code_number",
    "tsurugi_ffi_context_get_server_error_structured_code",
    "tsurugi_ffi_context_dispose",
    "tsurugi_ffi_cancel_job_wait",
    "tsurugi_ffi_cancel_job_is_done",
    "tsurugi_ffi_cancel_job_dispose",
    "tsurugi_ffi_job_get_name",
    "tsurugi_ffi_job_wait",
    "tsurugi_ffi_job_is_done",
    "tsurugi_ffi_job_take",
    "tsurugi_ffi_job_take_for",
    "tsurugi_ffi_job_take_if_ready",
    "tsurugi_ffi_job_cancel",
    "tsurugi_ffi_job_cancel_for",
    "tsurugi_ffi_job_cancel_async",
    "tsurugi_ffi_job_close",
    "tsurugi_ffi_job_dispose",
    "tsurugi_ffi_env_logger_init",
];
