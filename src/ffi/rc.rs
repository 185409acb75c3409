/*!
 * Return Codes
 *
 * Every native entry point returns a `u32` status. Bits 30-31 carry the
 * type; FFI errors use bits 24-29 for the group and the low bits for detail,
 * core client errors use bits 16-29 for the kind.
 */

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Status code returned by a native entry point
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnCode(u32);

/// Coarse origin of a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RcType {
    Ok,
    FfiError,
    CoreClientError,
    CoreServerError,
}

impl RcType {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0b11 {
            0 => RcType::Ok,
            1 => RcType::FfiError,
            2 => RcType::CoreClientError,
            _ => RcType::CoreServerError,
        }
    }
}

const TYPE_SHIFT: u32 = 30;

impl ReturnCode {
    pub const OK: Self = Self(0);

    pub const FFI_BASE: Self = Self(1 << TYPE_SHIFT);
    pub const FFI_ARG_ERROR: Self = Self(Self::FFI_BASE.0 | (0 << 24));
    pub const FFI_ARG0_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 0);
    pub const FFI_ARG1_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 1);
    pub const FFI_ARG2_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 2);
    pub const FFI_ARG3_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 3);
    pub const FFI_ARG4_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 4);
    pub const FFI_ARG5_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 5);
    pub const FFI_ARG6_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 6);
    pub const FFI_ARG7_ERROR: Self = Self(Self::FFI_ARG_ERROR.0 | 7);
    pub const FFI_JOB_ERROR: Self = Self(Self::FFI_BASE.0 | (1 << 24));
    pub const FFI_JOB_ALREADY_CLOSED: Self = Self(Self::FFI_JOB_ERROR.0 | 1);
    pub const FFI_ERROR: Self = Self(Self::FFI_BASE.0 | (2 << 24));
    pub const FFI_NUL_ERROR: Self = Self(Self::FFI_ERROR.0 | 1);
    pub const FFI_DIAGNOSTIC_CODE_NOT_FOUND: Self = Self(Self::FFI_ERROR.0 | 2);

    pub const CORE_CLIENT_ERROR: Self = Self(2 << TYPE_SHIFT);
    pub const CORE_CLIENT_CLIENT_ERROR: Self = Self(Self::CORE_CLIENT_ERROR.0 | (1 << 16));
    pub const CORE_CLIENT_TIMEOUT_ERROR: Self = Self(Self::CORE_CLIENT_ERROR.0 | (2 << 16));
    pub const CORE_CLIENT_IO_ERROR: Self = Self(Self::CORE_CLIENT_ERROR.0 | (3 << 16));

    pub const CORE_SERVER_ERROR: Self = Self(3 << TYPE_SHIFT);

    /// Argument-position error for the n-th parameter (0-based, up to 7)
    pub const fn arg_error(position: u32) -> Self {
        Self(Self::FFI_ARG_ERROR.0 | (position & 0x7))
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    pub fn rc_type(self) -> RcType {
        RcType::from_raw(self.0 >> TYPE_SHIFT)
    }

    /// Symbolic name, or `Rc%08x` for codes without one
    pub fn name(self) -> Cow<'static, str> {
        let known = match self {
            Self::OK => "OK",
            Self::FFI_ARG0_ERROR => "FFI_ARG0_ERROR",
            Self::FFI_ARG1_ERROR => "FFI_ARG1_ERROR",
            Self::FFI_ARG2_ERROR => "FFI_ARG2_ERROR",
            Self::FFI_ARG3_ERROR => "FFI_ARG3_ERROR",
            Self::FFI_ARG4_ERROR => "FFI_ARG4_ERROR",
            Self::FFI_ARG5_ERROR => "FFI_ARG5_ERROR",
            Self::FFI_ARG6_ERROR => "FFI_ARG6_ERROR",
            Self::FFI_ARG7_ERROR => "FFI_ARG7_ERROR",
            Self::FFI_JOB_ALREADY_CLOSED => "FFI_JOB_ALREADY_CLOSED",
            Self::FFI_NUL_ERROR => "FFI_NUL_ERROR",
            Self::FFI_DIAGNOSTIC_CODE_NOT_FOUND => "FFI_DIAGNOSTIC_CODE_NOT_FOUND",
            Self::CORE_CLIENT_CLIENT_ERROR => "CORE_CLIENT_CLIENT_ERROR",
            Self::CORE_CLIENT_TIMEOUT_ERROR => "CORE_CLIENT_TIMEOUT_ERROR",
            Self::CORE_CLIENT_IO_ERROR => "CORE_CLIENT_IO_ERROR",
            Self::CORE_SERVER_ERROR => "CORE_SERVER_ERROR",
            _ => return Cow::Owned(format!("Rc{:08x}", self.0)),
        };
        Cow::Borrowed(known)
    }
}

impl From<u32> for ReturnCode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReturnCode({}, {:#010x})", self.name(), self.0)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
