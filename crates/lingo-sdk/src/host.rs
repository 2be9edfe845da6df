//! Host object registration: wrapping foreign handles into host-managed
//! objects and deciding when a handle may pass through unwrapped.

use std::ffi::c_void;

use lingo_core::handle::ReleaseFn;
use lingo_core::{BoxingHost, CdtResult, Handle};

/// Outcome of importing a handle into a host runtime.
#[derive(Debug)]
pub enum Imported {
    /// The handle was produced by this runtime: `raw` is the host's own
    /// object, returned to host management together with any release
    /// obligation the handle still carried.
    Native {
        /// The host object itself.
        raw: *mut c_void,
        /// Release obligation, if the handle owned one.
        release: Option<ReleaseFn>,
    },
    /// A foreign handle, boxed into a host-managed wrapper object. The
    /// wrapper owns the handle; its destructor runs the original releaser
    /// exactly once.
    Wrapped(*mut c_void),
}

/// Registration surface a host runtime provides for handle objects.
///
/// Extends [`BoxingHost`] (boxing/unboxing of primitive scalars) with the
/// wrapper protocol for arbitrary foreign objects. Whether a handle belongs
/// to the host is answered by [`BoxingHost::owns`] - the passthrough policy
/// lives here, not inline at call sites.
pub trait HostObjects: BoxingHost {
    /// Wrap a foreign handle in a host-managed object. The wrapper takes
    /// ownership: when the host's garbage mechanism collects it, the
    /// handle's releaser must run exactly once.
    fn wrap(&self, handle: Handle) -> CdtResult<*mut c_void>;

    /// Reverse accessor: the triple behind a wrapper produced by
    /// [`HostObjects::wrap`]. The returned handle is a transport copy; the
    /// wrapper keeps the release obligation.
    fn unwrap_object(&self, object: *mut c_void) -> CdtResult<Handle>;

    /// Import a handle arriving from a call: pass the host's own objects
    /// through, wrap everything else.
    fn import(&self, handle: Handle) -> CdtResult<Imported> {
        if self.owns(handle.runtime_id()) {
            let (raw, _, release) = handle.into_raw_parts();
            Ok(Imported::Native { raw, release })
        } else {
            Ok(Imported::Wrapped(self.wrap(handle)?))
        }
    }
}
