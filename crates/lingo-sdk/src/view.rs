//! Typed read access into a CDTS.
//!
//! A [`CdtsView`] answers "give me the i64 at index 3" with a
//! `TypeMismatch` instead of a panic when the tree disagrees, which is what
//! a host binding wants at the boundary where declared and actual types can
//! diverge.

use lingo_core::{Callable, CdtError, CdtResult, CdtValue, Cdts, Handle, TypeTag};

/// Borrowed, typed read access to a CDTS.
#[derive(Clone, Copy, Debug)]
pub struct CdtsView<'a> {
    target: &'a Cdts,
}

impl<'a> CdtsView<'a> {
    /// View over an existing CDTS.
    pub fn new(target: &'a Cdts) -> Self {
        CdtsView { target }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Whether the CDTS has no elements.
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Type tag at `index`.
    pub fn tag_at(&self, index: usize) -> CdtResult<TypeTag> {
        Ok(self.value_at(index)?.tag())
    }

    fn value_at(&self, index: usize) -> CdtResult<&'a CdtValue> {
        self.target
            .get(index)
            .map(|cdt| cdt.value())
            .ok_or_else(|| CdtError::ForeignError(format!("index {index} out of bounds")))
    }

    fn mismatch(expected: TypeTag, got: &CdtValue) -> CdtError {
        CdtError::TypeMismatch {
            expected: expected.name().to_string(),
            got: got.tag().name().to_string(),
        }
    }

    /// The f64 at `index`.
    pub fn float64_at(&self, index: usize) -> CdtResult<f64> {
        match self.value_at(index)? {
            CdtValue::Float64(v) => Ok(*v),
            other => Err(Self::mismatch(TypeTag::FLOAT64, other)),
        }
    }

    /// The f32 at `index`.
    pub fn float32_at(&self, index: usize) -> CdtResult<f32> {
        match self.value_at(index)? {
            CdtValue::Float32(v) => Ok(*v),
            other => Err(Self::mismatch(TypeTag::FLOAT32, other)),
        }
    }

    /// The i32 at `index`.
    pub fn int32_at(&self, index: usize) -> CdtResult<i32> {
        match self.value_at(index)? {
            CdtValue::Int32(v) => Ok(*v),
            other => Err(Self::mismatch(TypeTag::INT32, other)),
        }
    }

    /// The i64 at `index`.
    pub fn int64_at(&self, index: usize) -> CdtResult<i64> {
        match self.value_at(index)? {
            CdtValue::Int64(v) => Ok(*v),
            other => Err(Self::mismatch(TypeTag::INT64, other)),
        }
    }

    /// The u64 at `index`.
    pub fn uint64_at(&self, index: usize) -> CdtResult<u64> {
        match self.value_at(index)? {
            CdtValue::UInt64(v) => Ok(*v),
            other => Err(Self::mismatch(TypeTag::UINT64, other)),
        }
    }

    /// The bool at `index`.
    pub fn bool_at(&self, index: usize) -> CdtResult<bool> {
        match self.value_at(index)? {
            CdtValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(TypeTag::BOOL, other)),
        }
    }

    /// The UTF-8 string at `index`.
    pub fn str8_at(&self, index: usize) -> CdtResult<&'a str> {
        match self.value_at(index)? {
            CdtValue::String8(v) => Ok(v),
            other => Err(Self::mismatch(TypeTag::STRING8, other)),
        }
    }

    /// The UTF-16 units at `index`.
    pub fn string16_at(&self, index: usize) -> CdtResult<&'a [u16]> {
        match self.value_at(index)? {
            CdtValue::String16(v) => Ok(v),
            other => Err(Self::mismatch(TypeTag::STRING16, other)),
        }
    }

    /// The handle at `index`.
    pub fn handle_at(&self, index: usize) -> CdtResult<&'a Handle> {
        match self.value_at(index)? {
            CdtValue::Handle(v) => Ok(v),
            other => Err(Self::mismatch(TypeTag::HANDLE, other)),
        }
    }

    /// The callable at `index`.
    pub fn callable_at(&self, index: usize) -> CdtResult<&'a Callable> {
        match self.value_at(index)? {
            CdtValue::Callable(v) => Ok(v),
            other => Err(Self::mismatch(TypeTag::CALLABLE, other)),
        }
    }

    /// Whether the value at `index` is null.
    pub fn is_null_at(&self, index: usize) -> CdtResult<bool> {
        Ok(matches!(self.value_at(index)?, CdtValue::Null))
    }

    /// A view over the nested array at `index`.
    pub fn array_at(&self, index: usize) -> CdtResult<CdtsView<'a>> {
        match self.value_at(index)? {
            CdtValue::Array(arr) => Ok(CdtsView::new(arr)),
            other => Err(Self::mismatch(TypeTag::ARRAY, other)),
        }
    }
}
