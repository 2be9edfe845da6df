//! C FFI surface of the Lingo CDTS engines
//!
//! This crate is the stable boundary between the engines and foreign host
//! runtimes. The API follows these principles:
//! - ABI-stable: only C-compatible types cross the boundary
//! - CDTS trees travel as opaque pointers; layout is not part of the ABI
//! - Callback tables are plain-old-data structs of function pointers
//! - Error handling via `char**` out-parameters; the callee allocates the
//!   UTF-8 message through the process allocator hooks, the caller frees it
//! - No entry point unwinds

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod buffers;
mod callbacks;

pub use buffers::*;
pub use callbacks::{ConstructCallbacks, RawCallable, RawHandle, RawTypeInfo, TraverseCallbacks};

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use lingo_core::alloc::{self, allocator_hooks, install_allocator_hooks, AllocatorHooks};
use lingo_core::{Cdt, CdtError, CdtResult, Cdts, XCall};

// ============================================================================
// Error out-parameter plumbing
// ============================================================================

unsafe fn set_error(out_err: *mut *mut c_char, message: &str) {
    if !out_err.is_null() {
        *out_err = alloc::alloc_error_string(message.as_bytes());
    }
}

/// Run `f`, converting both `Err` and panics into the error out-parameter.
unsafe fn guard<F: FnOnce() -> CdtResult<()>>(out_err: *mut *mut c_char, f: F) {
    if !out_err.is_null() {
        *out_err = std::ptr::null_mut();
    }
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => set_error(out_err, &e.to_string()),
        Err(_) => {
            tracing::error!("panic crossed a lingo entry point");
            set_error(out_err, "internal panic in lingo entry point");
        }
    }
}

fn null_cdts() -> CdtError {
    CdtError::TypeMismatch {
        expected: "CDTS".into(),
        got: "null".into(),
    }
}

// ============================================================================
// Traverse / construct entry points
// ============================================================================

/// Traverse `pcdts` through a C callback table.
///
/// # Safety
/// `pcdts` must be a valid CDTS pointer, `cb` a valid table; both are
/// borrowed for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn lingo_traverse_cdts(
    pcdts: *const Cdts,
    cb: *const TraverseCallbacks,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pcdts.is_null() {
            return Err(null_cdts());
        }
        if cb.is_null() {
            return Err(CdtError::ForeignError("callback table is null".into()));
        }
        unsafe { callbacks::traverse_with_table(&*pcdts, &*cb) }
    });
}

/// Traverse a single value through a C callback table.
///
/// # Safety
/// Same contract as [`lingo_traverse_cdts`], with a CDT pointer.
#[no_mangle]
pub unsafe extern "C" fn lingo_traverse_cdt(
    pcdt: *const Cdt,
    cb: *const TraverseCallbacks,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pcdt.is_null() {
            return Err(null_cdts());
        }
        if cb.is_null() {
            return Err(CdtError::ForeignError("callback table is null".into()));
        }
        unsafe { callbacks::traverse_one_with_table(&*pcdt, &*cb) }
    });
}

/// Populate `pcdts` through a C callback table. An empty CDTS is sized from
/// `get_root_elements_count` first.
///
/// # Safety
/// `pcdts` must be a valid, exclusively held CDTS pointer and `cb` a valid
/// table.
#[no_mangle]
pub unsafe extern "C" fn lingo_construct_cdts(
    pcdts: *mut Cdts,
    cb: *const ConstructCallbacks,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pcdts.is_null() {
            return Err(null_cdts());
        }
        if cb.is_null() {
            return Err(CdtError::ForeignError("callback table is null".into()));
        }
        unsafe { callbacks::construct_with_table(&mut *pcdts, &*cb) }
    });
}

/// Populate a single value through a C callback table.
///
/// # Safety
/// Same contract as [`lingo_construct_cdts`], with a CDT pointer.
#[no_mangle]
pub unsafe extern "C" fn lingo_construct_cdt(
    pcdt: *mut Cdt,
    cb: *const ConstructCallbacks,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pcdt.is_null() {
            return Err(null_cdts());
        }
        if cb.is_null() {
            return Err(CdtError::ForeignError("callback table is null".into()));
        }
        unsafe { callbacks::construct_one_with_table(&mut *pcdt, &*cb) }
    });
}

// ============================================================================
// xcall dispatch
// ============================================================================

/// Dispatch an xcall with no parameters and no return values.
///
/// # Safety
/// `pxcall` must be a valid xcall whose entry has the matching signature.
#[no_mangle]
pub unsafe extern "C" fn lingo_xcall_no_params_no_ret(
    pxcall: *mut XCall,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pxcall.is_null() {
            return Err(CdtError::ForeignError("xcall is null".into()));
        }
        unsafe { (*pxcall).call_no_params_no_ret() }
    });
}

/// Dispatch an xcall with parameters and no return values.
///
/// # Safety
/// `pxcall` must be valid for the `fn(ctx, cdts*, err)` shape and `params`
/// must be a valid CDTS.
#[no_mangle]
pub unsafe extern "C" fn lingo_xcall_params_no_ret(
    pxcall: *mut XCall,
    params: *mut Cdts,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pxcall.is_null() {
            return Err(CdtError::ForeignError("xcall is null".into()));
        }
        if params.is_null() {
            return Err(null_cdts());
        }
        unsafe { (*pxcall).call_params_no_ret(params) }
    });
}

/// Dispatch an xcall with no parameters and return values.
///
/// # Safety
/// `pxcall` must be valid for the `fn(ctx, cdts*, err)` shape and `rets`
/// must be a valid CDTS the callee may fill.
#[no_mangle]
pub unsafe extern "C" fn lingo_xcall_no_params_ret(
    pxcall: *mut XCall,
    rets: *mut Cdts,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pxcall.is_null() {
            return Err(CdtError::ForeignError("xcall is null".into()));
        }
        if rets.is_null() {
            return Err(null_cdts());
        }
        unsafe { (*pxcall).call_no_params_ret(rets) }
    });
}

/// Dispatch an xcall with parameters and return values. `pair` points at two
/// contiguous CDTS buffers: `pair[0]` inputs, `pair[1]` outputs (see
/// [`lingo_alloc_cdts_buffer`]).
///
/// # Safety
/// `pxcall` must be valid for the paired shape and `pair` must come from
/// [`lingo_alloc_cdts_buffer`] or an equivalent two-slot allocation.
#[no_mangle]
pub unsafe extern "C" fn lingo_xcall_params_ret(
    pxcall: *mut XCall,
    pair: *mut Cdts,
    out_err: *mut *mut c_char,
) {
    guard(out_err, || {
        if pxcall.is_null() {
            return Err(CdtError::ForeignError("xcall is null".into()));
        }
        if pair.is_null() {
            return Err(null_cdts());
        }
        unsafe { (*pxcall).call_params_ret(pair) }
    });
}

// ============================================================================
// Allocators
// ============================================================================

/// Allocate a NUL-terminated copy of `len` bytes through the process
/// allocator hooks. Used for error messages and exported strings.
///
/// # Safety
/// `bytes` must point at `len` readable bytes (null is allowed when `len`
/// is 0).
#[no_mangle]
pub unsafe extern "C" fn lingo_alloc_string(bytes: *const c_char, len: u64) -> *mut c_char {
    (allocator_hooks().alloc_string)(bytes, len)
}

/// Free a string obtained from [`lingo_alloc_string`] or an error
/// out-parameter. Null is a no-op.
///
/// # Safety
/// `ptr` must come from the process allocator hooks.
#[no_mangle]
pub unsafe extern "C" fn lingo_free_string(ptr: *mut c_char) {
    (allocator_hooks().free)(ptr as *mut c_void)
}

/// Allocate `size` bytes through the process allocator hooks.
///
/// # Safety
/// The returned pointer must be released with [`lingo_free_memory`].
#[no_mangle]
pub unsafe extern "C" fn lingo_alloc_memory(size: u64) -> *mut c_void {
    (allocator_hooks().alloc)(size)
}

/// Free memory obtained from [`lingo_alloc_memory`]. Null is a no-op.
///
/// # Safety
/// `ptr` must come from the process allocator hooks.
#[no_mangle]
pub unsafe extern "C" fn lingo_free_memory(ptr: *mut c_void) {
    (allocator_hooks().free)(ptr)
}

/// Install the process-wide allocator hooks. Must happen before the first
/// boundary crossing; returns 0 (and keeps the existing table) if hooks were
/// already installed.
///
/// # Safety
/// The three functions must form a coherent allocator and stay valid for the
/// process lifetime.
#[no_mangle]
pub unsafe extern "C" fn lingo_install_allocator_hooks(
    alloc_fn: unsafe extern "C" fn(u64) -> *mut c_void,
    free_fn: unsafe extern "C" fn(*mut c_void),
    alloc_string_fn: unsafe extern "C" fn(*const c_char, u64) -> *mut c_char,
) -> u8 {
    let installed = install_allocator_hooks(AllocatorHooks {
        alloc: alloc_fn,
        free: free_fn,
        alloc_string: alloc_string_fn,
    });
    if !installed {
        tracing::warn!("allocator hooks were already installed; keeping the existing table");
    }
    installed as u8
}

// ============================================================================
// Version information
// ============================================================================

/// Version string of the lingo runtime; static, do not free.
#[no_mangle]
pub extern "C" fn lingo_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}
