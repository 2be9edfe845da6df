//! C callback tables and their bridges onto the core traits.
//!
//! The tables are plain-old-data structs of function pointers plus an opaque
//! context pointer; their layout is the ABI between the engines and foreign
//! hosts. Hosts build a table, hand it to an entry point and retain
//! ownership. Every callback receives the context pointer last.
//!
//! A function pointer left null is only an error if the tree being walked
//! actually needs it; the bridge then fails with a `ForeignError` naming the
//! missing callback instead of jumping through null.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use lingo_core::alloc::allocator_hooks;
use lingo_core::handle::ReleaseFn;
use lingo_core::{
    ArrayMetadata, ArrayVisit, Callable, Cdt, CdtError, CdtResult, Cdts, Char16, Char32, Char8,
    ConstructSource, Dimensions, Handle, Releaser, TraverseVisitor, TypeInfo, TypeTag, XCall,
};

/// C signature of a scalar leaf callback.
pub type OnScalar<T> =
    unsafe extern "C" fn(index: *const u64, index_len: u64, value: T, ctx: *mut c_void);

/// C signature of a string leaf callback; the pointer is NUL-terminated and
/// valid only for the duration of the call.
pub type OnString<U> =
    unsafe extern "C" fn(index: *const u64, index_len: u64, value: *const U, ctx: *mut c_void);

/// C signature of a scalar leaf getter.
pub type GetScalar<T> =
    unsafe extern "C" fn(index: *const u64, index_len: u64, ctx: *mut c_void) -> T;

/// C signature of a string/handle/callable getter with an ownership
/// out-flag: nonzero means the engine must free the returned allocation
/// through the process allocator hooks once it has copied it.
pub type GetOwned<T> = unsafe extern "C" fn(
    index: *const u64,
    index_len: u64,
    is_free_required: *mut u8,
    ctx: *mut c_void,
) -> T;

/// Handle triple as it crosses the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawHandle {
    /// Opaque pointer meaningful to the producing runtime.
    pub raw: *mut c_void,
    /// Identifier of the producing runtime.
    pub runtime_id: u64,
    /// Releaser; null for non-owning copies.
    pub release: Option<ReleaseFn>,
}

/// Callable descriptor as it crosses the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawCallable {
    /// xcall entry point.
    pub entry: *const c_void,
    /// xcall context.
    pub context: *mut c_void,
    /// Parameter type tags, `param_count` entries.
    pub param_types: *const u64,
    /// Number of parameter types.
    pub param_count: u64,
    /// Return type tags, `ret_count` entries.
    pub ret_types: *const u64,
    /// Number of return types.
    pub ret_count: u64,
}

/// Type description returned by `get_type_info`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawTypeInfo {
    /// Type tag bits.
    pub tag: u64,
    /// Optional alias bytes (not NUL-terminated); may be null.
    pub alias: *const c_char,
    /// Length of `alias` in bytes.
    pub alias_len: u64,
    /// Array nesting depth; `-1` for mixed/unknown.
    pub fixed_dimensions: i64,
}

/// Traverse callback table. Zero-initializing yields an all-null table.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TraverseCallbacks {
    /// Opaque host state, passed to every callback.
    pub context: *mut c_void,
    /// 64-bit float leaf.
    pub on_float64: Option<OnScalar<f64>>,
    /// 32-bit float leaf.
    pub on_float32: Option<OnScalar<f32>>,
    /// Signed 8-bit integer leaf.
    pub on_int8: Option<OnScalar<i8>>,
    /// Unsigned 8-bit integer leaf.
    pub on_uint8: Option<OnScalar<u8>>,
    /// Signed 16-bit integer leaf.
    pub on_int16: Option<OnScalar<i16>>,
    /// Unsigned 16-bit integer leaf.
    pub on_uint16: Option<OnScalar<u16>>,
    /// Signed 32-bit integer leaf.
    pub on_int32: Option<OnScalar<i32>>,
    /// Unsigned 32-bit integer leaf.
    pub on_uint32: Option<OnScalar<u32>>,
    /// Signed 64-bit integer leaf.
    pub on_int64: Option<OnScalar<i64>>,
    /// Unsigned 64-bit integer leaf.
    pub on_uint64: Option<OnScalar<u64>>,
    /// Boolean leaf; nonzero is true.
    pub on_bool: Option<OnScalar<u8>>,
    /// UTF-8 character leaf.
    pub on_char8: Option<OnScalar<Char8>>,
    /// UTF-8 string leaf.
    pub on_string8: Option<OnString<c_char>>,
    /// UTF-16 character leaf.
    pub on_char16: Option<OnScalar<Char16>>,
    /// UTF-16 string leaf.
    pub on_string16: Option<OnString<u16>>,
    /// UTF-32 character leaf.
    pub on_char32: Option<OnScalar<Char32>>,
    /// UTF-32 string leaf.
    pub on_string32: Option<OnString<u32>>,
    /// Handle leaf; the triple is a read-only view.
    pub on_handle: Option<
        unsafe extern "C" fn(index: *const u64, index_len: u64, value: *const RawHandle, ctx: *mut c_void),
    >,
    /// Callable leaf; the descriptor is a read-only view.
    pub on_callable: Option<
        unsafe extern "C" fn(index: *const u64, index_len: u64, value: *const RawCallable, ctx: *mut c_void),
    >,
    /// Null leaf.
    pub on_null: Option<unsafe extern "C" fn(index: *const u64, index_len: u64, ctx: *mut c_void)>,
    /// Array entry. Return 0 to short-circuit (the callback consumed the
    /// subtree), nonzero to let the engine recurse.
    pub on_array: Option<
        unsafe extern "C" fn(
            index: *const u64,
            index_len: u64,
            value: *const Cdts,
            fixed_dimensions: i64,
            common_type: u64,
            ctx: *mut c_void,
        ) -> u8,
    >,
}

fn missing(name: &str) -> CdtError {
    CdtError::ForeignError(format!("callback table has no {name}"))
}

/// Adapter driving a C traverse table from the core visitor trait.
pub(crate) struct CallbackVisitor<'a> {
    cb: &'a TraverseCallbacks,
}

impl<'a> CallbackVisitor<'a> {
    pub(crate) fn new(cb: &'a TraverseCallbacks) -> Self {
        CallbackVisitor { cb }
    }
}

macro_rules! emit_scalar {
    ($self:ident, $field:ident, $index:ident, $value:expr) => {{
        let f = $self.cb.$field.ok_or_else(|| missing(stringify!($field)))?;
        unsafe { f($index.as_ptr(), $index.len() as u64, $value, $self.cb.context) };
        Ok(())
    }};
}

impl TraverseVisitor for CallbackVisitor<'_> {
    fn on_float64(&mut self, index: &[u64], value: f64) -> CdtResult<()> {
        emit_scalar!(self, on_float64, index, value)
    }

    fn on_float32(&mut self, index: &[u64], value: f32) -> CdtResult<()> {
        emit_scalar!(self, on_float32, index, value)
    }

    fn on_int8(&mut self, index: &[u64], value: i8) -> CdtResult<()> {
        emit_scalar!(self, on_int8, index, value)
    }

    fn on_int16(&mut self, index: &[u64], value: i16) -> CdtResult<()> {
        emit_scalar!(self, on_int16, index, value)
    }

    fn on_int32(&mut self, index: &[u64], value: i32) -> CdtResult<()> {
        emit_scalar!(self, on_int32, index, value)
    }

    fn on_int64(&mut self, index: &[u64], value: i64) -> CdtResult<()> {
        emit_scalar!(self, on_int64, index, value)
    }

    fn on_uint8(&mut self, index: &[u64], value: u8) -> CdtResult<()> {
        emit_scalar!(self, on_uint8, index, value)
    }

    fn on_uint16(&mut self, index: &[u64], value: u16) -> CdtResult<()> {
        emit_scalar!(self, on_uint16, index, value)
    }

    fn on_uint32(&mut self, index: &[u64], value: u32) -> CdtResult<()> {
        emit_scalar!(self, on_uint32, index, value)
    }

    fn on_uint64(&mut self, index: &[u64], value: u64) -> CdtResult<()> {
        emit_scalar!(self, on_uint64, index, value)
    }

    fn on_bool(&mut self, index: &[u64], value: bool) -> CdtResult<()> {
        emit_scalar!(self, on_bool, index, value as u8)
    }

    fn on_char8(&mut self, index: &[u64], value: Char8) -> CdtResult<()> {
        emit_scalar!(self, on_char8, index, value)
    }

    fn on_char16(&mut self, index: &[u64], value: Char16) -> CdtResult<()> {
        emit_scalar!(self, on_char16, index, value)
    }

    fn on_char32(&mut self, index: &[u64], value: Char32) -> CdtResult<()> {
        emit_scalar!(self, on_char32, index, value)
    }

    fn on_string8(&mut self, index: &[u64], value: &str) -> CdtResult<()> {
        let f = self.cb.on_string8.ok_or_else(|| missing("on_string8"))?;
        let temp = CString::new(value).map_err(|_| CdtError::InvalidEncoding("UTF-8"))?;
        unsafe { f(index.as_ptr(), index.len() as u64, temp.as_ptr(), self.cb.context) };
        Ok(())
    }

    fn on_string16(&mut self, index: &[u64], value: &[u16]) -> CdtResult<()> {
        let f = self.cb.on_string16.ok_or_else(|| missing("on_string16"))?;
        let mut temp = Vec::with_capacity(value.len() + 1);
        temp.extend_from_slice(value);
        temp.push(0);
        unsafe { f(index.as_ptr(), index.len() as u64, temp.as_ptr(), self.cb.context) };
        Ok(())
    }

    fn on_string32(&mut self, index: &[u64], value: &[u32]) -> CdtResult<()> {
        let f = self.cb.on_string32.ok_or_else(|| missing("on_string32"))?;
        let mut temp = Vec::with_capacity(value.len() + 1);
        temp.extend_from_slice(value);
        temp.push(0);
        unsafe { f(index.as_ptr(), index.len() as u64, temp.as_ptr(), self.cb.context) };
        Ok(())
    }

    fn on_handle(&mut self, index: &[u64], value: &Handle) -> CdtResult<()> {
        let f = self.cb.on_handle.ok_or_else(|| missing("on_handle"))?;
        if value.raw().is_null() && value.has_releaser() {
            return Err(CdtError::HandleProtocolViolation(
                "handle with null raw pointer carries a releaser".into(),
            ));
        }
        let view = RawHandle {
            raw: value.raw(),
            runtime_id: value.runtime_id(),
            release: value.release_fn(),
        };
        unsafe { f(index.as_ptr(), index.len() as u64, &view, self.cb.context) };
        Ok(())
    }

    fn on_callable(&mut self, index: &[u64], value: &Callable) -> CdtResult<()> {
        let f = self.cb.on_callable.ok_or_else(|| missing("on_callable"))?;
        let params: Vec<u64> = value.param_types().iter().map(|t| t.bits()).collect();
        let rets: Vec<u64> = value.ret_types().iter().map(|t| t.bits()).collect();
        let view = RawCallable {
            entry: value.xcall().entry(),
            context: value.xcall().context(),
            param_types: params.as_ptr(),
            param_count: params.len() as u64,
            ret_types: rets.as_ptr(),
            ret_count: rets.len() as u64,
        };
        unsafe { f(index.as_ptr(), index.len() as u64, &view, self.cb.context) };
        Ok(())
    }

    fn on_null(&mut self, index: &[u64]) -> CdtResult<()> {
        let f = self.cb.on_null.ok_or_else(|| missing("on_null"))?;
        unsafe { f(index.as_ptr(), index.len() as u64, self.cb.context) };
        Ok(())
    }

    fn on_array(
        &mut self,
        index: &[u64],
        array: &Cdts,
        dimensions: Dimensions,
        element_type: TypeTag,
    ) -> CdtResult<ArrayVisit> {
        let f = self.cb.on_array.ok_or_else(|| missing("on_array"))?;
        let recurse = unsafe {
            f(
                index.as_ptr(),
                index.len() as u64,
                array,
                dimensions.to_raw(),
                element_type.bits(),
                self.cb.context,
            )
        };
        Ok(if recurse == 0 {
            ArrayVisit::ShortCircuit
        } else {
            ArrayVisit::Recurse
        })
    }
}

/// Construct callback table. Zero-initializing yields an all-null table.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ConstructCallbacks {
    /// Opaque host state, passed to every callback.
    pub context: *mut c_void,
    /// Number of root elements; consulted only for an empty target root.
    pub get_root_elements_count: Option<unsafe extern "C" fn(ctx: *mut c_void) -> u64>,
    /// Concrete type of a position.
    pub get_type_info: Option<
        unsafe extern "C" fn(index: *const u64, index_len: u64, ctx: *mut c_void) -> RawTypeInfo,
    >,
    /// Shape of the array at a position. The out-parameters arrive seeded
    /// from the preceding `get_type_info` answer; the callback may overwrite
    /// them. Returns the element count. Setting `*out_fast_path` nonzero
    /// promises that `construct_array_fast` will fill the array.
    pub get_array_metadata: Option<
        unsafe extern "C" fn(
            index: *const u64,
            index_len: u64,
            out_fixed_dimensions: *mut i64,
            out_common_type: *mut u64,
            out_fast_path: *mut u8,
            ctx: *mut c_void,
        ) -> u64,
    >,
    /// Bulk-fill the freshly allocated array (see `lingo_cdts_fill_*`).
    /// Called only after `get_array_metadata` requested the fast path.
    pub construct_array_fast: Option<
        unsafe extern "C" fn(index: *const u64, index_len: u64, out: *mut Cdts, ctx: *mut c_void),
    >,
    /// 64-bit float getter.
    pub get_float64: Option<GetScalar<f64>>,
    /// 32-bit float getter.
    pub get_float32: Option<GetScalar<f32>>,
    /// Signed 8-bit integer getter.
    pub get_int8: Option<GetScalar<i8>>,
    /// Unsigned 8-bit integer getter.
    pub get_uint8: Option<GetScalar<u8>>,
    /// Signed 16-bit integer getter.
    pub get_int16: Option<GetScalar<i16>>,
    /// Unsigned 16-bit integer getter.
    pub get_uint16: Option<GetScalar<u16>>,
    /// Signed 32-bit integer getter.
    pub get_int32: Option<GetScalar<i32>>,
    /// Unsigned 32-bit integer getter.
    pub get_uint32: Option<GetScalar<u32>>,
    /// Signed 64-bit integer getter.
    pub get_int64: Option<GetScalar<i64>>,
    /// Unsigned 64-bit integer getter.
    pub get_uint64: Option<GetScalar<u64>>,
    /// Boolean getter; nonzero is true.
    pub get_bool: Option<GetScalar<u8>>,
    /// UTF-8 character getter.
    pub get_char8: Option<GetScalar<Char8>>,
    /// UTF-8 string getter; NUL-terminated.
    pub get_string8: Option<GetOwned<*mut c_char>>,
    /// UTF-16 character getter.
    pub get_char16: Option<GetScalar<Char16>>,
    /// UTF-16 string getter; NUL-terminated.
    pub get_string16: Option<GetOwned<*mut u16>>,
    /// UTF-32 character getter.
    pub get_char32: Option<GetScalar<Char32>>,
    /// UTF-32 string getter; NUL-terminated.
    pub get_string32: Option<GetOwned<*mut u32>>,
    /// Handle getter.
    pub get_handle: Option<GetOwned<*mut RawHandle>>,
    /// Callable getter.
    pub get_callable: Option<GetOwned<*mut RawCallable>>,
}

/// Adapter answering the core construct trait from a C table.
pub(crate) struct CallbackSource<'a> {
    cb: &'a ConstructCallbacks,
    /// Last `get_type_info` answer, used to seed array metadata out-params.
    last_info: Option<(TypeTag, i64)>,
}

impl<'a> CallbackSource<'a> {
    pub(crate) fn new(cb: &'a ConstructCallbacks) -> Self {
        CallbackSource {
            cb,
            last_info: None,
        }
    }
}

macro_rules! fetch_scalar {
    ($self:ident, $field:ident, $index:ident) => {{
        let f = $self.cb.$field.ok_or_else(|| missing(stringify!($field)))?;
        Ok(unsafe { f($index.as_ptr(), $index.len() as u64, $self.cb.context) })
    }};
}

/// Length of a NUL-terminated unit sequence.
unsafe fn unit_strlen<U: Copy + PartialEq + Default>(mut ptr: *const U) -> usize {
    let zero = U::default();
    let mut len = 0;
    while *ptr != zero {
        ptr = ptr.add(1);
        len += 1;
    }
    len
}

unsafe fn free_foreign(ptr: *mut c_void) {
    (allocator_hooks().free)(ptr)
}

impl ConstructSource for CallbackSource<'_> {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        let f = self
            .cb
            .get_root_elements_count
            .ok_or_else(|| missing("get_root_elements_count"))?;
        Ok(unsafe { f(self.cb.context) })
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        let f = self.cb.get_type_info.ok_or_else(|| missing("get_type_info"))?;
        let raw = unsafe { f(index.as_ptr(), index.len() as u64, self.cb.context) };
        let tag = TypeTag::from_raw(raw.tag);
        self.last_info = Some((tag, raw.fixed_dimensions));

        let alias = if raw.alias.is_null() || raw.alias_len == 0 {
            None
        } else {
            let bytes = unsafe {
                std::slice::from_raw_parts(raw.alias as *const u8, raw.alias_len as usize)
            };
            Some(
                std::str::from_utf8(bytes)
                    .map_err(|_| CdtError::InvalidEncoding("UTF-8"))?
                    .to_string(),
            )
        };

        Ok(TypeInfo {
            tag,
            alias,
            dimensions: Dimensions::from_raw(raw.fixed_dimensions),
        })
    }

    fn array_metadata(&mut self, index: &[u64]) -> CdtResult<ArrayMetadata> {
        let f = self
            .cb
            .get_array_metadata
            .ok_or_else(|| missing("get_array_metadata"))?;

        // seed the out-params from the type info that led here
        let (seed_tag, seed_dims) = self
            .last_info
            .unwrap_or((TypeTag::ARRAY, Dimensions::MIXED_RAW));
        let mut dims: i64 = seed_dims;
        let mut common: u64 = seed_tag.element_type().bits();
        let mut fast: u8 = 0;

        let length = unsafe {
            f(
                index.as_ptr(),
                index.len() as u64,
                &mut dims,
                &mut common,
                &mut fast,
                self.cb.context,
            )
        };
        Ok(ArrayMetadata {
            length,
            dimensions: Dimensions::from_raw(dims),
            element_type: TypeTag::from_raw(common),
            fast_path: fast != 0,
        })
    }

    fn build_array_fast(&mut self, index: &[u64], out: &mut Cdts) -> CdtResult<()> {
        let f = self
            .cb
            .construct_array_fast
            .ok_or_else(|| missing("construct_array_fast"))?;
        unsafe { f(index.as_ptr(), index.len() as u64, out, self.cb.context) };
        Ok(())
    }

    fn float64(&mut self, index: &[u64]) -> CdtResult<f64> {
        fetch_scalar!(self, get_float64, index)
    }

    fn float32(&mut self, index: &[u64]) -> CdtResult<f32> {
        fetch_scalar!(self, get_float32, index)
    }

    fn int8(&mut self, index: &[u64]) -> CdtResult<i8> {
        fetch_scalar!(self, get_int8, index)
    }

    fn int16(&mut self, index: &[u64]) -> CdtResult<i16> {
        fetch_scalar!(self, get_int16, index)
    }

    fn int32(&mut self, index: &[u64]) -> CdtResult<i32> {
        fetch_scalar!(self, get_int32, index)
    }

    fn int64(&mut self, index: &[u64]) -> CdtResult<i64> {
        fetch_scalar!(self, get_int64, index)
    }

    fn uint8(&mut self, index: &[u64]) -> CdtResult<u8> {
        fetch_scalar!(self, get_uint8, index)
    }

    fn uint16(&mut self, index: &[u64]) -> CdtResult<u16> {
        fetch_scalar!(self, get_uint16, index)
    }

    fn uint32(&mut self, index: &[u64]) -> CdtResult<u32> {
        fetch_scalar!(self, get_uint32, index)
    }

    fn uint64(&mut self, index: &[u64]) -> CdtResult<u64> {
        fetch_scalar!(self, get_uint64, index)
    }

    fn bool(&mut self, index: &[u64]) -> CdtResult<bool> {
        let f = self.cb.get_bool.ok_or_else(|| missing("get_bool"))?;
        Ok(unsafe { f(index.as_ptr(), index.len() as u64, self.cb.context) } != 0)
    }

    fn char8(&mut self, index: &[u64]) -> CdtResult<Char8> {
        fetch_scalar!(self, get_char8, index)
    }

    fn char16(&mut self, index: &[u64]) -> CdtResult<Char16> {
        fetch_scalar!(self, get_char16, index)
    }

    fn char32(&mut self, index: &[u64]) -> CdtResult<Char32> {
        fetch_scalar!(self, get_char32, index)
    }

    fn string8(&mut self, index: &[u64]) -> CdtResult<String> {
        let f = self.cb.get_string8.ok_or_else(|| missing("get_string8"))?;
        let mut owned: u8 = 0;
        let ptr = unsafe { f(index.as_ptr(), index.len() as u64, &mut owned, self.cb.context) };
        if ptr.is_null() {
            return Err(CdtError::ForeignError("get_string8 returned null".into()));
        }
        let result = unsafe { std::ffi::CStr::from_ptr(ptr) }
            .to_str()
            .map(str::to_string)
            .map_err(|_| CdtError::InvalidEncoding("UTF-8"));
        if owned != 0 {
            unsafe { free_foreign(ptr as *mut c_void) };
        }
        result
    }

    fn string16(&mut self, index: &[u64]) -> CdtResult<Vec<u16>> {
        let f = self.cb.get_string16.ok_or_else(|| missing("get_string16"))?;
        let mut owned: u8 = 0;
        let ptr = unsafe { f(index.as_ptr(), index.len() as u64, &mut owned, self.cb.context) };
        if ptr.is_null() {
            return Err(CdtError::ForeignError("get_string16 returned null".into()));
        }
        let units = unsafe { std::slice::from_raw_parts(ptr, unit_strlen(ptr)) }.to_vec();
        if owned != 0 {
            unsafe { free_foreign(ptr as *mut c_void) };
        }
        Ok(units)
    }

    fn string32(&mut self, index: &[u64]) -> CdtResult<Vec<u32>> {
        let f = self.cb.get_string32.ok_or_else(|| missing("get_string32"))?;
        let mut owned: u8 = 0;
        let ptr = unsafe { f(index.as_ptr(), index.len() as u64, &mut owned, self.cb.context) };
        if ptr.is_null() {
            return Err(CdtError::ForeignError("get_string32 returned null".into()));
        }
        let units = unsafe { std::slice::from_raw_parts(ptr, unit_strlen(ptr)) }.to_vec();
        if owned != 0 {
            unsafe { free_foreign(ptr as *mut c_void) };
        }
        Ok(units)
    }

    fn handle(&mut self, index: &[u64]) -> CdtResult<Handle> {
        let f = self.cb.get_handle.ok_or_else(|| missing("get_handle"))?;
        let mut owned: u8 = 0;
        let ptr = unsafe { f(index.as_ptr(), index.len() as u64, &mut owned, self.cb.context) };
        if ptr.is_null() {
            return Err(CdtError::ForeignError("get_handle returned null".into()));
        }
        let raw = unsafe { *ptr };
        if owned != 0 {
            unsafe { free_foreign(ptr as *mut c_void) };
        }
        if raw.raw.is_null() && raw.release.is_some() {
            return Err(CdtError::HandleProtocolViolation(
                "handle with null raw pointer carries a releaser".into(),
            ));
        }
        Ok(Handle::new(
            raw.raw,
            raw.runtime_id,
            raw.release.map(Releaser::new),
        ))
    }

    fn callable(&mut self, index: &[u64]) -> CdtResult<Callable> {
        let f = self.cb.get_callable.ok_or_else(|| missing("get_callable"))?;
        let mut owned: u8 = 0;
        let ptr = unsafe { f(index.as_ptr(), index.len() as u64, &mut owned, self.cb.context) };
        if ptr.is_null() {
            return Err(CdtError::ForeignError("get_callable returned null".into()));
        }
        let raw = unsafe { std::ptr::read(ptr) };

        let copy_tags = |base: *const u64, count: u64| -> Vec<TypeTag> {
            if base.is_null() || count == 0 {
                Vec::new()
            } else {
                unsafe { std::slice::from_raw_parts(base, count as usize) }
                    .iter()
                    .map(|bits| TypeTag::from_raw(*bits))
                    .collect()
            }
        };
        let params = copy_tags(raw.param_types, raw.param_count);
        let rets = copy_tags(raw.ret_types, raw.ret_count);

        if owned != 0 {
            unsafe {
                if !raw.param_types.is_null() {
                    free_foreign(raw.param_types as *mut c_void);
                }
                if !raw.ret_types.is_null() {
                    free_foreign(raw.ret_types as *mut c_void);
                }
                free_foreign(ptr as *mut c_void);
            }
        }

        Ok(Callable::new(
            XCall::new(raw.entry, raw.context),
            params,
            rets,
        ))
    }
}

/// Drive a traversal of `arr` through a C table.
pub(crate) fn traverse_with_table(arr: &Cdts, cb: &TraverseCallbacks) -> CdtResult<()> {
    let mut visitor = CallbackVisitor::new(cb);
    lingo_core::traverse_cdts(arr, &mut visitor)
}

/// Drive a single-value traversal through a C table.
pub(crate) fn traverse_one_with_table(item: &Cdt, cb: &TraverseCallbacks) -> CdtResult<()> {
    let mut visitor = CallbackVisitor::new(cb);
    lingo_core::traverse_cdt(item, &mut visitor)
}

/// Drive a construction of `arr` through a C table.
pub(crate) fn construct_with_table(arr: &mut Cdts, cb: &ConstructCallbacks) -> CdtResult<()> {
    let mut source = CallbackSource::new(cb);
    lingo_core::construct_cdts(arr, &mut source)
}

/// Drive a single-value construction through a C table.
pub(crate) fn construct_one_with_table(item: &mut Cdt, cb: &ConstructCallbacks) -> CdtResult<()> {
    let mut source = CallbackSource::new(cb);
    lingo_core::construct_cdt(item, &mut source)
}
