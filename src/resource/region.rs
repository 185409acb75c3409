/*!
 * Allocation Region
 * Bump-allocated scratch memory for marshalling native call arguments
 */

use crate::core::{BridgeError, BridgeResult, RawHandle};
use bumpalo::Bump;
use parking_lot::Mutex;
use std::ffi::{c_char, c_void};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

// Region storage
//
// # Lifetime
//
// The manager drops its reference at close; scratch buffers still in flight
// keep the chunks mapped until they are dropped, so pointers handed to an
// in-progress native call never dangle. New allocations fail once closed.
pub(crate) struct Region {
    bump: Arc<Mutex<Bump>>,
}

impl Region {
    pub(crate) fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: Arc::new(Mutex::new(Bump::with_capacity(bytes))),
        }
    }

    pub(crate) fn allocated_bytes(&self) -> usize {
        self.bump.lock().allocated_bytes()
    }

    /// Copy `value` into the region
    pub(crate) fn alloc<T: Copy>(&self, value: T) -> Scratch<T> {
        let ptr = NonNull::from(self.bump.lock().alloc(value));
        Scratch::new(ptr, 1, &self.bump)
    }

    /// Copy a slice into the region; empty slices still get a valid pointer
    pub(crate) fn alloc_slice<T: Copy>(&self, values: &[T]) -> Scratch<T> {
        let ptr = {
            let bump = self.bump.lock();
            let slice = bump.alloc_slice_copy(values);
            NonNull::new(slice.as_mut_ptr()).unwrap_or(NonNull::dangling())
        };
        Scratch::new(ptr, values.len(), &self.bump)
    }

    /// NUL-terminated copy of `value`
    pub(crate) fn alloc_c_string(&self, value: &str) -> BridgeResult<Scratch<c_char>> {
        if value.as_bytes().contains(&0) {
            return Err(BridgeError::Argument(format!(
                "string contains an interior NUL byte: {:?}",
                value
            )));
        }
        let ptr = {
            let bump = self.bump.lock();
            let bytes = bump.alloc_slice_fill_copy(value.len() + 1, 0u8);
            bytes[..value.len()].copy_from_slice(value.as_bytes());
            NonNull::from(&mut bytes[0]).cast::<c_char>()
        };
        Ok(Scratch::new(ptr, value.len() + 1, &self.bump))
    }

    /// Bytes handed back by dropping the manager's reference
    pub(crate) fn release(self) -> usize {
        let bytes = self.allocated_bytes();
        drop(self);
        bytes
    }
}

/// Scratch buffer carved from a manager's region
///
/// Valid for reads and native writes for as long as it lives. Not `Send`:
/// scratch belongs to the call that allocated it.
pub struct Scratch<T> {
    ptr: NonNull<T>,
    len: usize,
    _region: Arc<Mutex<Bump>>,
}

impl<T: Copy> Scratch<T> {
    fn new(ptr: NonNull<T>, len: usize, region: &Arc<Mutex<Bump>>) -> Self {
        Self {
            ptr,
            len,
            _region: Arc::clone(region),
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Pointer suitable for a native out-parameter
    #[inline]
    pub fn as_mut_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Number of `T` elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current value of the first element
    ///
    /// Panics on an empty buffer.
    pub fn read(&self) -> T {
        assert!(self.len > 0, "read from empty scratch buffer");
        // SAFETY: ptr is valid for `len` elements while `_region` is alive
        unsafe { self.ptr.as_ptr().read() }
    }

    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: ptr is valid for `len` initialized elements
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> fmt::Debug for Scratch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratch")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Handle array in the layout native list parameters expect
pub(crate) fn handle_pointers(handles: &[RawHandle]) -> Vec<*mut c_void> {
    handles.iter().map(|h| h.as_ptr()).collect()
}
