//! The traverse engine.
//!
//! Walks a CDTS tree depth-first and emits one visitor call per leaf and one
//! per array, each carrying the index path locating the visit inside the
//! root. Iteration order is strictly lexicographic over index paths. The
//! engine is synchronous, stateless and makes no recovery attempts: a
//! visitor error aborts the walk and surfaces unchanged.
//!
//! The array callback may short-circuit, claiming the whole subtree; the
//! engine then does not recurse into it. This is the read side of the bulk
//! fast path: a visitor that can consume a regular primitive array in one
//! operation skips per-element dispatch entirely.

use crate::callable::Callable;
use crate::cdt::{Cdt, CdtValue, Cdts};
use crate::chars::{Char16, Char32, Char8};
use crate::handle::Handle;
use crate::tags::{Dimensions, TypeTag};
use crate::{CdtError, CdtResult};

/// Decision returned by [`TraverseVisitor::on_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayVisit {
    /// The engine recurses element-by-element.
    Recurse,
    /// The visitor consumed the whole subtree; the engine must not recurse.
    ShortCircuit,
}

/// Typed visitor over a CDTS tree.
///
/// Every method receives the index path of the visited position. Default
/// implementations ignore the value, so a visitor implements only the tags
/// it cares about.
#[allow(unused_variables)]
pub trait TraverseVisitor {
    /// 64-bit float leaf.
    fn on_float64(&mut self, index: &[u64], value: f64) -> CdtResult<()> {
        Ok(())
    }

    /// 32-bit float leaf.
    fn on_float32(&mut self, index: &[u64], value: f32) -> CdtResult<()> {
        Ok(())
    }

    /// Signed 8-bit integer leaf.
    fn on_int8(&mut self, index: &[u64], value: i8) -> CdtResult<()> {
        Ok(())
    }

    /// Signed 16-bit integer leaf.
    fn on_int16(&mut self, index: &[u64], value: i16) -> CdtResult<()> {
        Ok(())
    }

    /// Signed 32-bit integer leaf.
    fn on_int32(&mut self, index: &[u64], value: i32) -> CdtResult<()> {
        Ok(())
    }

    /// Signed 64-bit integer leaf.
    fn on_int64(&mut self, index: &[u64], value: i64) -> CdtResult<()> {
        Ok(())
    }

    /// Unsigned 8-bit integer leaf.
    fn on_uint8(&mut self, index: &[u64], value: u8) -> CdtResult<()> {
        Ok(())
    }

    /// Unsigned 16-bit integer leaf.
    fn on_uint16(&mut self, index: &[u64], value: u16) -> CdtResult<()> {
        Ok(())
    }

    /// Unsigned 32-bit integer leaf.
    fn on_uint32(&mut self, index: &[u64], value: u32) -> CdtResult<()> {
        Ok(())
    }

    /// Unsigned 64-bit integer leaf.
    fn on_uint64(&mut self, index: &[u64], value: u64) -> CdtResult<()> {
        Ok(())
    }

    /// Boolean leaf.
    fn on_bool(&mut self, index: &[u64], value: bool) -> CdtResult<()> {
        Ok(())
    }

    /// UTF-8 character leaf.
    fn on_char8(&mut self, index: &[u64], value: Char8) -> CdtResult<()> {
        Ok(())
    }

    /// UTF-16 character leaf.
    fn on_char16(&mut self, index: &[u64], value: Char16) -> CdtResult<()> {
        Ok(())
    }

    /// UTF-32 character leaf.
    fn on_char32(&mut self, index: &[u64], value: Char32) -> CdtResult<()> {
        Ok(())
    }

    /// UTF-8 string leaf.
    fn on_string8(&mut self, index: &[u64], value: &str) -> CdtResult<()> {
        Ok(())
    }

    /// UTF-16 string leaf.
    fn on_string16(&mut self, index: &[u64], value: &[u16]) -> CdtResult<()> {
        Ok(())
    }

    /// UTF-32 string leaf.
    fn on_string32(&mut self, index: &[u64], value: &[u32]) -> CdtResult<()> {
        Ok(())
    }

    /// Handle leaf. The handle stays owned by the tree.
    fn on_handle(&mut self, index: &[u64], value: &Handle) -> CdtResult<()> {
        Ok(())
    }

    /// Callable leaf.
    fn on_callable(&mut self, index: &[u64], value: &Callable) -> CdtResult<()> {
        Ok(())
    }

    /// Null leaf.
    fn on_null(&mut self, index: &[u64]) -> CdtResult<()> {
        Ok(())
    }

    /// Array entry. `element_type` is the common element type, `ANY` for
    /// heterogeneous arrays. Returning [`ArrayVisit::ShortCircuit`] claims
    /// the subtree.
    fn on_array(
        &mut self,
        index: &[u64],
        array: &Cdts,
        dimensions: Dimensions,
        element_type: TypeTag,
    ) -> CdtResult<ArrayVisit> {
        Ok(ArrayVisit::Recurse)
    }
}

/// Traverse every element of `arr`, starting paths at the root.
pub fn traverse_cdts<V: TraverseVisitor + ?Sized>(arr: &Cdts, visitor: &mut V) -> CdtResult<()> {
    let mut path = Vec::with_capacity(8);
    traverse_elements(arr, visitor, &mut path)
}

/// Traverse a single value with an empty index path.
pub fn traverse_cdt<V: TraverseVisitor + ?Sized>(item: &Cdt, visitor: &mut V) -> CdtResult<()> {
    let mut path = Vec::with_capacity(8);
    traverse_item(item, visitor, &mut path)
}

fn traverse_elements<V: TraverseVisitor + ?Sized>(
    arr: &Cdts,
    visitor: &mut V,
    path: &mut Vec<u64>,
) -> CdtResult<()> {
    for (i, item) in arr.iter().enumerate() {
        path.push(i as u64);
        let result = traverse_item(item, visitor, path);
        path.pop();
        result?;
    }
    Ok(())
}

fn traverse_item<V: TraverseVisitor + ?Sized>(
    item: &Cdt,
    visitor: &mut V,
    path: &mut Vec<u64>,
) -> CdtResult<()> {
    match item.value() {
        CdtValue::Any => Err(CdtError::InvalidType(
            "traversed value must have a concrete type, not any".into(),
        )),
        CdtValue::Null => visitor.on_null(path),
        CdtValue::Float64(v) => visitor.on_float64(path, *v),
        CdtValue::Float32(v) => visitor.on_float32(path, *v),
        CdtValue::Int8(v) => visitor.on_int8(path, *v),
        CdtValue::Int16(v) => visitor.on_int16(path, *v),
        CdtValue::Int32(v) => visitor.on_int32(path, *v),
        CdtValue::Int64(v) => visitor.on_int64(path, *v),
        CdtValue::UInt8(v) => visitor.on_uint8(path, *v),
        CdtValue::UInt16(v) => visitor.on_uint16(path, *v),
        CdtValue::UInt32(v) => visitor.on_uint32(path, *v),
        CdtValue::UInt64(v) => visitor.on_uint64(path, *v),
        CdtValue::Bool(v) => visitor.on_bool(path, *v),
        CdtValue::Char8(v) => visitor.on_char8(path, *v),
        CdtValue::Char16(v) => visitor.on_char16(path, *v),
        CdtValue::Char32(v) => visitor.on_char32(path, *v),
        CdtValue::String8(v) => visitor.on_string8(path, v),
        CdtValue::String16(v) => visitor.on_string16(path, v),
        CdtValue::String32(v) => visitor.on_string32(path, v),
        CdtValue::Handle(v) => visitor.on_handle(path, v),
        CdtValue::Callable(v) => visitor.on_callable(path, v),
        CdtValue::Array(arr) => {
            match visitor.on_array(path, arr, arr.dimensions(), arr.element_type())? {
                ArrayVisit::ShortCircuit => Ok(()),
                ArrayVisit::Recurse => traverse_elements(arr, visitor, path),
            }
        }
    }
}
