//! Foreign-object handle protocol.
//!
//! A handle is a `(raw, runtime_id, release_fn)` triple: an opaque pointer
//! meaningful only to the runtime identified by `runtime_id`, plus the unique
//! destructor for the foreign-side representation. The releaser must be
//! called exactly once, by exactly one owner. [`Releaser`] is therefore not
//! clonable, and [`Handle`] runs it on drop; passing the same referent into a
//! foreign call uses [`Handle::transport_copy`], which carries no releaser.

use std::ffi::c_void;
use std::fmt;

/// C signature of a handle releaser. Receives the raw handle pointer.
/// Releasers must not unwind and must not report errors.
pub type ReleaseFn = unsafe extern "C" fn(raw: *mut c_void);

/// Owned releaser of a foreign handle.
///
/// Deliberately not `Clone`: two live releasers for the same raw handle
/// would violate the single-owner contract.
pub struct Releaser(ReleaseFn);

impl Releaser {
    /// Wrap a raw release function.
    pub fn new(f: ReleaseFn) -> Self {
        Releaser(f)
    }

    /// The underlying function pointer, for export across the C boundary.
    pub fn as_fn(&self) -> ReleaseFn {
        self.0
    }

    /// Consume the releaser, invoking it on `raw`.
    ///
    /// # Safety
    /// `raw` must be the raw handle this releaser was minted for, and no
    /// other releaser for the same handle may exist.
    pub unsafe fn invoke(self, raw: *mut c_void) {
        (self.0)(raw)
    }
}

impl fmt::Debug for Releaser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Releaser({:p})", self.0 as *const ())
    }
}

/// An opaque reference to an object owned by a foreign runtime.
pub struct Handle {
    raw: *mut c_void,
    runtime_id: u64,
    releaser: Option<Releaser>,
}

// The raw pointer is opaque to every runtime but its producer; whether the
// referent may migrate between threads is the producing runtime's contract,
// the same as for the values the engines already move across xcalls.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    /// Build a handle from its parts. The handle becomes the single owner of
    /// `releaser`, if one is given.
    pub fn new(raw: *mut c_void, runtime_id: u64, releaser: Option<Releaser>) -> Self {
        Handle {
            raw,
            runtime_id,
            releaser,
        }
    }

    /// The raw pointer, meaningful only to the producing runtime.
    pub fn raw(&self) -> *mut c_void {
        self.raw
    }

    /// Identifier of the producing runtime.
    pub fn runtime_id(&self) -> u64 {
        self.runtime_id
    }

    /// Whether this handle owns a releaser.
    pub fn has_releaser(&self) -> bool {
        self.releaser.is_some()
    }

    /// The release function pointer, if any, for read-only export.
    pub fn release_fn(&self) -> Option<ReleaseFn> {
        self.releaser.as_ref().map(Releaser::as_fn)
    }

    /// A copy for passing the same referent through a call boundary.
    ///
    /// The copy carries no releaser; destruction of the referent remains the
    /// responsibility of `self`.
    pub fn transport_copy(&self) -> Handle {
        Handle {
            raw: self.raw,
            runtime_id: self.runtime_id,
            releaser: None,
        }
    }

    /// Decompose without running the releaser. The caller takes over the
    /// release obligation.
    pub fn into_raw_parts(mut self) -> (*mut c_void, u64, Option<ReleaseFn>) {
        let release = self.releaser.take().map(|r| r.as_fn());
        (self.raw, self.runtime_id, release)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            // A null raw handle with a live releaser is a protocol violation;
            // invoking the releaser on null would be worse than leaking.
            if !self.raw.is_null() {
                unsafe { releaser.invoke(self.raw) };
            }
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.runtime_id == other.runtime_id
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("raw", &self.raw)
            .field("runtime_id", &self.runtime_id)
            .field("has_releaser", &self.releaser.is_some())
            .finish()
    }
}
