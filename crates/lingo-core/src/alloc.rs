//! Process-wide allocator hooks.
//!
//! Every allocation that crosses the cross-plugin boundary (error messages,
//! exported strings, plugin scratch memory) goes through a single table of C
//! allocator functions so that whichever side frees a pointer uses the
//! allocator that produced it. The host harness installs the table exactly
//! once at startup; if nothing is installed, a malloc-style default backed by
//! the Rust global allocator is used.

use std::ffi::c_void;
use std::os::raw::c_char;

use once_cell::sync::OnceCell;

/// C allocator functions shared by every plugin in the process.
#[derive(Clone, Copy)]
pub struct AllocatorHooks {
    /// Allocate `size` bytes; null on failure.
    pub alloc: unsafe extern "C" fn(size: u64) -> *mut c_void,
    /// Free a pointer obtained from `alloc` or `alloc_string`.
    pub free: unsafe extern "C" fn(ptr: *mut c_void),
    /// Allocate a NUL-terminated copy of `len` bytes; null on failure.
    pub alloc_string: unsafe extern "C" fn(bytes: *const c_char, len: u64) -> *mut c_char,
}

static HOOKS: OnceCell<AllocatorHooks> = OnceCell::new();

/// Install the process-wide allocator hooks.
///
/// Returns `false` if hooks were already installed (including the implicit
/// default installed by a prior allocation); the existing table is kept.
pub fn install_allocator_hooks(hooks: AllocatorHooks) -> bool {
    HOOKS.set(hooks).is_ok()
}

/// The installed hooks, or the malloc-style default.
pub fn allocator_hooks() -> AllocatorHooks {
    *HOOKS.get_or_init(default_hooks)
}

fn default_hooks() -> AllocatorHooks {
    AllocatorHooks {
        alloc: default_alloc,
        free: default_free,
        alloc_string: default_alloc_string,
    }
}

// The default allocator prefixes each block with its size so `free` can
// reconstruct the layout; C callers see only the payload pointer.

const HEADER: usize = std::mem::size_of::<u64>();

unsafe extern "C" fn default_alloc(size: u64) -> *mut c_void {
    let total = size as usize + HEADER;
    let layout = match std::alloc::Layout::from_size_align(total, HEADER) {
        Ok(l) => l,
        Err(_) => return std::ptr::null_mut(),
    };
    let base = std::alloc::alloc(layout);
    if base.is_null() {
        return std::ptr::null_mut();
    }
    (base as *mut u64).write(total as u64);
    base.add(HEADER) as *mut c_void
}

unsafe extern "C" fn default_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let base = (ptr as *mut u8).sub(HEADER);
    let total = (base as *const u64).read() as usize;
    let layout = std::alloc::Layout::from_size_align_unchecked(total, HEADER);
    std::alloc::dealloc(base, layout);
}

unsafe extern "C" fn default_alloc_string(bytes: *const c_char, len: u64) -> *mut c_char {
    let dst = default_alloc(len + 1) as *mut c_char;
    if dst.is_null() {
        return std::ptr::null_mut();
    }
    if !bytes.is_null() && len > 0 {
        std::ptr::copy_nonoverlapping(bytes, dst, len as usize);
    }
    dst.add(len as usize).write(0);
    dst
}

/// Allocate a NUL-terminated error message through the hooks. Used to fill
/// `char**` error out-parameters; the receiver frees it with the hooks'
/// `free`.
pub fn alloc_error_string(message: &[u8]) -> *mut c_char {
    let hooks = allocator_hooks();
    unsafe { (hooks.alloc_string)(message.as_ptr() as *const c_char, message.len() as u64) }
}
