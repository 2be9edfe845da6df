//! Cross-runtime call dispatch.
//!
//! An xcall is an opaque `(entry, context)` pointer pair. The entry is a C
//! function whose exact signature is chosen by whether the call carries
//! parameters and/or return values; the four shapes are fixed and part of the
//! cross-plugin ABI. The callee reports failure by allocating a UTF-8 message
//! into the `char**` error out-parameter; the caller frees it through the
//! process allocator hooks.

use std::ffi::c_void;
use std::fmt;
use std::os::raw::c_char;

use crate::alloc::allocator_hooks;
use crate::cdt::Cdts;
use crate::{CdtError, CdtResult};

type EntryNoCdts = unsafe extern "C" fn(ctx: *mut c_void, err: *mut *mut c_char);
type EntryWithCdts = unsafe extern "C" fn(ctx: *mut c_void, cdts: *mut Cdts, err: *mut *mut c_char);

/// Opaque entry-point/context pair of a cross-runtime callable.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct XCall {
    entry: *const c_void,
    context: *mut c_void,
}

unsafe impl Send for XCall {}
unsafe impl Sync for XCall {}

impl XCall {
    /// Build from raw parts. A null entry yields an xcall that fails every
    /// invocation; see [`XCall::is_valid`].
    pub fn new(entry: *const c_void, context: *mut c_void) -> Self {
        XCall { entry, context }
    }

    /// The raw entry pointer.
    pub fn entry(&self) -> *const c_void {
        self.entry
    }

    /// The raw context pointer.
    pub fn context(&self) -> *mut c_void {
        self.context
    }

    /// Whether the entry pointer is set.
    pub fn is_valid(&self) -> bool {
        !self.entry.is_null()
    }

    fn require_valid(&self) -> CdtResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CdtError::ForeignError("xcall entry point is null".into()))
        }
    }

    /// Shape: no parameters, no return values.
    ///
    /// # Safety
    /// The entry must have the `fn(ctx, err)` C signature and `context` must
    /// be the value it expects.
    pub unsafe fn call_no_params_no_ret(&self) -> CdtResult<()> {
        self.require_valid()?;
        let f: EntryNoCdts = std::mem::transmute(self.entry);
        let mut err: *mut c_char = std::ptr::null_mut();
        f(self.context, &mut err);
        consume_error(err)
    }

    /// Shape: parameters, no return values. `params` is a single CDTS.
    ///
    /// # Safety
    /// The entry must have the `fn(ctx, cdts*, err)` C signature; `params`
    /// must be valid for the duration of the call.
    pub unsafe fn call_params_no_ret(&self, params: *mut Cdts) -> CdtResult<()> {
        self.call_with_cdts(params)
    }

    /// Shape: no parameters, return values. `rets` is a single CDTS the
    /// callee fills.
    ///
    /// # Safety
    /// Same contract as [`XCall::call_params_no_ret`].
    pub unsafe fn call_no_params_ret(&self, rets: *mut Cdts) -> CdtResult<()> {
        self.call_with_cdts(rets)
    }

    /// Shape: parameters and return values. `pair` points at two contiguous
    /// CDTS buffers: `pair[0]` inputs, `pair[1]` outputs.
    ///
    /// # Safety
    /// `pair` must point at two contiguous, valid CDTS values.
    pub unsafe fn call_params_ret(&self, pair: *mut Cdts) -> CdtResult<()> {
        self.call_with_cdts(pair)
    }

    unsafe fn call_with_cdts(&self, cdts: *mut Cdts) -> CdtResult<()> {
        self.require_valid()?;
        let f: EntryWithCdts = std::mem::transmute(self.entry);
        let mut err: *mut c_char = std::ptr::null_mut();
        f(self.context, cdts, &mut err);
        consume_error(err)
    }
}

impl fmt::Debug for XCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XCall")
            .field("entry", &self.entry)
            .field("context", &self.context)
            .finish()
    }
}

/// Read a callee-allocated error message, free it through the allocator
/// hooks, and convert it to a `ForeignError`.
unsafe fn consume_error(err: *mut c_char) -> CdtResult<()> {
    if err.is_null() {
        return Ok(());
    }
    let message = std::ffi::CStr::from_ptr(err).to_string_lossy().into_owned();
    (allocator_hooks().free)(err as *mut c_void);
    Err(CdtError::ForeignError(message))
}
