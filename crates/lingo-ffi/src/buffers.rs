//! CDTS buffer allocation for xcalls, and the bulk fill helpers used by
//! fast-path construct callbacks.
//!
//! An xcall buffer is two contiguous CDTS values: `[0]` the parameters,
//! `[1]` the return values. Buffers recycle through a small per-thread pool
//! so a hot call path does not pay an allocation per invocation; the pool is
//! dropped at thread exit.
//!
//! C code never sees the CDTS layout. A fast-path `construct_array_fast`
//! callback receives the target array as an opaque pointer and fills it with
//! one `lingo_cdts_fill_*` call over its contiguous native buffer.

use std::cell::RefCell;
use std::ffi::c_void;

use lingo_core::{Cdt, Cdts, Dimensions, Handle, Releaser, TypeTag};

use crate::callbacks::RawHandle;

/// Upper bound of recycled xcall buffers kept per thread.
const BUFFER_POOL_LIMIT: usize = 50;

thread_local! {
    static BUFFER_POOL: RefCell<Vec<Box<[Cdts; 2]>>> = const { RefCell::new(Vec::new()) };
}

/// Allocate a two-slot CDTS pair with pre-sized, null-filled children.
///
/// # Safety
/// The returned pointer must be released with [`lingo_free_cdts_buffer`] and
/// nothing else.
#[no_mangle]
pub unsafe extern "C" fn lingo_alloc_cdts_buffer(params_len: u64, rets_len: u64) -> *mut Cdts {
    let mut pair = BUFFER_POOL
        .with(|pool| pool.borrow_mut().pop())
        .unwrap_or_else(|| Box::new([Cdts::empty_root(), Cdts::empty_root()]));
    pair[0] = Cdts::with_len(params_len as usize, Dimensions::Fixed(1), TypeTag::ANY);
    pair[1] = Cdts::with_len(rets_len as usize, Dimensions::Fixed(1), TypeTag::ANY);
    Box::into_raw(pair) as *mut Cdts
}

/// Free a buffer obtained from [`lingo_alloc_cdts_buffer`]. All values the
/// pair owns (strings, handles, nested arrays) are destroyed; handle
/// releasers run here. Null is a no-op.
///
/// # Safety
/// `pcdts` must come from [`lingo_alloc_cdts_buffer`] and must not be used
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn lingo_free_cdts_buffer(pcdts: *mut Cdts) {
    if pcdts.is_null() {
        return;
    }
    let mut pair = Box::from_raw(pcdts as *mut [Cdts; 2]);
    // drop the contents now; only the empty shell is recycled
    pair[0] = Cdts::empty_root();
    pair[1] = Cdts::empty_root();
    BUFFER_POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < BUFFER_POOL_LIMIT {
            pool.push(pair);
        }
    });
}

/// Index into a CDTS pair (or any contiguous CDTS allocation).
///
/// # Safety
/// `pcdts` must point at an allocation holding at least `index + 1`
/// contiguous CDTS values.
#[no_mangle]
pub unsafe extern "C" fn lingo_cdts_pair_at(pcdts: *mut Cdts, index: u64) -> *mut Cdts {
    pcdts.add(index as usize)
}

/// Element count of a CDTS; 0 for null.
///
/// # Safety
/// `pcdts` must be a valid CDTS pointer or null.
#[no_mangle]
pub unsafe extern "C" fn lingo_cdts_len(pcdts: *const Cdts) -> u64 {
    if pcdts.is_null() {
        0
    } else {
        (*pcdts).len() as u64
    }
}

/// Pointer to the value at `index` inside a CDTS, for use with the
/// single-value traverse/construct entry points. Null if `pcdts` is null or
/// `index` is out of bounds.
///
/// # Safety
/// `pcdts` must be a valid CDTS pointer or null; the returned pointer is
/// invalidated by anything that resizes the CDTS.
#[no_mangle]
pub unsafe extern "C" fn lingo_cdts_at(pcdts: *mut Cdts, index: u64) -> *mut Cdt {
    if pcdts.is_null() {
        return std::ptr::null_mut();
    }
    match (*pcdts).get_mut(index as usize) {
        Some(item) => item as *mut Cdt,
        None => std::ptr::null_mut(),
    }
}

macro_rules! fill_fn {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $make:expr) => {
        $(#[$doc])*
        ///
        /// # Safety
        /// `out` must be a valid CDTS pointer and `values` must point at
        /// `len` readable elements (null is allowed when `len` is 0).
        #[no_mangle]
        pub unsafe extern "C" fn $name(out: *mut Cdts, values: *const $ty, len: u64) {
            if out.is_null() || (values.is_null() && len > 0) {
                return;
            }
            let values = std::slice::from_raw_parts(values, len as usize);
            let make: fn(&$ty) -> Cdt = $make;
            (*out).set_items(values.iter().map(make).collect());
        }
    };
}

fill_fn!(
    /// Bulk-fill an array from contiguous 64-bit floats.
    lingo_cdts_fill_float64, f64, |v| Cdt::float64(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous 32-bit floats.
    lingo_cdts_fill_float32, f32, |v| Cdt::float32(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous signed 8-bit integers.
    lingo_cdts_fill_int8, i8, |v| Cdt::int8(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous signed 16-bit integers.
    lingo_cdts_fill_int16, i16, |v| Cdt::int16(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous signed 32-bit integers.
    lingo_cdts_fill_int32, i32, |v| Cdt::int32(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous signed 64-bit integers.
    lingo_cdts_fill_int64, i64, |v| Cdt::int64(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous unsigned 8-bit integers.
    lingo_cdts_fill_uint8, u8, |v| Cdt::uint8(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous unsigned 16-bit integers.
    lingo_cdts_fill_uint16, u16, |v| Cdt::uint16(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous unsigned 32-bit integers.
    lingo_cdts_fill_uint32, u32, |v| Cdt::uint32(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous unsigned 64-bit integers.
    lingo_cdts_fill_uint64, u64, |v| Cdt::uint64(*v)
);
fill_fn!(
    /// Bulk-fill an array from contiguous booleans (nonzero is true).
    lingo_cdts_fill_bool, u8, |v| Cdt::bool(*v != 0)
);

/// Bulk-fill an array from contiguous handle triples. Each triple's releaser
/// transfers to the array: the tree becomes its single owner.
///
/// # Safety
/// `out` must be a valid CDTS pointer and `values` must point at `len`
/// readable triples. Each releaser must not already be owned elsewhere.
#[no_mangle]
pub unsafe extern "C" fn lingo_cdts_fill_handle(out: *mut Cdts, values: *const RawHandle, len: u64) {
    if out.is_null() || (values.is_null() && len > 0) {
        return;
    }
    let values = std::slice::from_raw_parts(values, len as usize);
    (*out).set_items(
        values
            .iter()
            .map(|h| Cdt::handle(Handle::new(h.raw, h.runtime_id, h.release.map(Releaser::new))))
            .collect(),
    );
}
