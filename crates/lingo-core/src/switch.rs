//! Representation switching on an already-constructed tree.
//!
//! Consumers sometimes need the other in-memory shape of a value: an
//! arithmetic callee wants the primitive behind a boxed integer object, an
//! object-typed parameter wants the boxed form of a primitive scalar. Both
//! operations are position-local; neither walks children.
//!
//! The host supplies boxing/unboxing through [`BoxingHost`]. Whether a
//! handle belongs to the host runtime is decided by [`BoxingHost::owns`],
//! never by comparing runtime ids inline at call sites.

use std::ffi::c_void;

use crate::cdt::{Cdt, CdtValue, Cdts};
use crate::handle::Handle;
use crate::tags::{bits, TypeTag};
use crate::{CdtError, CdtResult};

/// Result of unboxing a host object.
#[derive(Debug, PartialEq)]
pub enum Unboxed {
    /// The referent was a boxed primitive scalar.
    Scalar(CdtValue),
    /// The referent was a host-side string, decoded to UTF-8.
    Str(String),
    /// The referent is an ordinary object; it stays a handle.
    NotPrimitive,
}

/// Host-side boxing and unboxing of primitive scalars.
///
/// One boxing function per primitive tag; the returned raw pointer becomes a
/// handle owned by the tree, so hosts hand out a releaser with it.
pub trait BoxingHost {
    /// Identifier of the host runtime.
    fn runtime_id(&self) -> u64;

    /// Whether a handle produced by `runtime_id` is the host's own object
    /// and may pass through unwrapped.
    fn owns(&self, runtime_id: u64) -> bool {
        runtime_id == self.runtime_id()
    }

    /// Box a 64-bit float.
    fn box_float64(&self, value: f64) -> CdtResult<Handle>;
    /// Box a 32-bit float.
    fn box_float32(&self, value: f32) -> CdtResult<Handle>;
    /// Box a signed 8-bit integer.
    fn box_int8(&self, value: i8) -> CdtResult<Handle>;
    /// Box a signed 16-bit integer.
    fn box_int16(&self, value: i16) -> CdtResult<Handle>;
    /// Box a signed 32-bit integer.
    fn box_int32(&self, value: i32) -> CdtResult<Handle>;
    /// Box a signed 64-bit integer.
    fn box_int64(&self, value: i64) -> CdtResult<Handle>;
    /// Box an unsigned 8-bit integer.
    fn box_uint8(&self, value: u8) -> CdtResult<Handle>;
    /// Box an unsigned 16-bit integer.
    fn box_uint16(&self, value: u16) -> CdtResult<Handle>;
    /// Box an unsigned 32-bit integer.
    fn box_uint32(&self, value: u32) -> CdtResult<Handle>;
    /// Box an unsigned 64-bit integer.
    fn box_uint64(&self, value: u64) -> CdtResult<Handle>;
    /// Box a boolean.
    fn box_bool(&self, value: bool) -> CdtResult<Handle>;

    /// Inspect a host-owned handle's referent.
    fn unbox(&self, handle: &Handle) -> CdtResult<Unboxed>;
}

/// Replace the primitive scalar at `index` with its boxed object form.
///
/// Non-scalar positions (strings, handles, arrays, null, ...) are left
/// untouched. The new handle owns the boxed object.
pub fn switch_to_object(arr: &mut Cdts, index: usize, host: &dyn BoxingHost) -> CdtResult<()> {
    let slot = arr
        .get_mut(index)
        .ok_or_else(|| CdtError::ForeignError(format!("index {index} out of bounds")))?;

    let boxed = match slot.value() {
        CdtValue::Float64(v) => host.box_float64(*v)?,
        CdtValue::Float32(v) => host.box_float32(*v)?,
        CdtValue::Int8(v) => host.box_int8(*v)?,
        CdtValue::Int16(v) => host.box_int16(*v)?,
        CdtValue::Int32(v) => host.box_int32(*v)?,
        CdtValue::Int64(v) => host.box_int64(*v)?,
        CdtValue::UInt8(v) => host.box_uint8(*v)?,
        CdtValue::UInt16(v) => host.box_uint16(*v)?,
        CdtValue::UInt32(v) => host.box_uint32(*v)?,
        CdtValue::UInt64(v) => host.box_uint64(*v)?,
        CdtValue::Bool(v) => host.box_bool(*v)?,
        _ => return Ok(()),
    };
    *slot = Cdt::handle(boxed);
    Ok(())
}

/// Unbox the host-owned handle at `index` into the requested primitive tag.
///
/// - Foreign-runtime handles and non-handle positions are left untouched.
/// - A boxed scalar must be acceptable for `requested` (`ANY` accepts
///   everything, integers may widen); otherwise `TypeMismatch`.
/// - A host string becomes a string of the requested width.
/// - A non-primitive referent with a concrete scalar `requested` is
///   `InvalidType`.
///
/// On success the old handle is dropped, which runs its releaser.
pub fn switch_to_primitive(
    arr: &mut Cdts,
    index: usize,
    requested: TypeTag,
    host: &dyn BoxingHost,
) -> CdtResult<()> {
    let slot = arr
        .get_mut(index)
        .ok_or_else(|| CdtError::ForeignError(format!("index {index} out of bounds")))?;

    let handle = match slot.value() {
        CdtValue::Handle(h) if host.owns(h.runtime_id()) => h,
        _ => return Ok(()),
    };

    match host.unbox(handle)? {
        Unboxed::Scalar(value) => {
            let actual = value.tag();
            if !accepts(requested, actual) {
                return Err(CdtError::TypeMismatch {
                    expected: requested.name().to_string(),
                    got: actual.name().to_string(),
                });
            }
            *slot = Cdt::new(value);
            Ok(())
        }
        Unboxed::Str(s) => {
            let replacement = match requested.bits() {
                bits::ANY | bits::STRING8 => Cdt::string8(s),
                bits::STRING16 => Cdt::string16(s.encode_utf16().collect()),
                bits::STRING32 => Cdt::string32(s.chars().map(|c| c as u32).collect()),
                _ => {
                    return Err(CdtError::TypeMismatch {
                        expected: requested.name().to_string(),
                        got: "string".to_string(),
                    })
                }
            };
            *slot = replacement;
            Ok(())
        }
        Unboxed::NotPrimitive => {
            if requested != TypeTag::ANY && !requested.is_array() {
                return Err(CdtError::InvalidType(format!(
                    "referent is not a boxed primitive; cannot produce {}",
                    requested.name()
                )));
            }
            Ok(())
        }
    }
}

/// Whether a boxed scalar of tag `actual` satisfies `requested`. Integers
/// may widen into larger integer tags; everything else must match exactly.
fn accepts(requested: TypeTag, actual: TypeTag) -> bool {
    if requested == TypeTag::ANY || requested == actual {
        return true;
    }
    match (int_width(actual), int_width(requested)) {
        (Some(from), Some(to)) => from <= to,
        _ => false,
    }
}

fn int_width(tag: TypeTag) -> Option<u8> {
    match tag.bits() {
        bits::INT8 | bits::UINT8 => Some(8),
        bits::INT16 | bits::UINT16 => Some(16),
        bits::INT32 | bits::UINT32 => Some(32),
        bits::INT64 | bits::UINT64 => Some(64),
        _ => None,
    }
}

/// Box a value into a plain heap cell and return the raw pointer, for hosts
/// that have no object table of their own (tests, standalone embedding).
pub fn raw_from_box<T>(value: T) -> *mut c_void {
    Box::into_raw(Box::new(value)) as *mut c_void
}
