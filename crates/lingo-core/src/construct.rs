//! The construct engine.
//!
//! Dual of the traverse engine: a [`ConstructSource`] externalizes every
//! decision that depends on the source runtime's representation - how many
//! root elements, what type lives at a position, what the value is - and the
//! engine assembles a fully-owned tree from those answers.
//!
//! Regular 1-D primitive arrays may take the bulk fast path: the source
//! promises to fill the freshly allocated child array itself, the engine
//! skips per-element recursion and afterwards verifies the produced length
//! against the declared one.
//!
//! On failure the in-progress subtree is dropped; completed sibling subtrees
//! at earlier indices remain owned by the caller's root.

use crate::callable::Callable;
use crate::cdt::{Cdt, Cdts};
use crate::chars::{Char16, Char32, Char8};
use crate::handle::Handle;
use crate::tags::{bits, Dimensions, TypeInfo, TypeTag};
use crate::{CdtError, CdtResult};

/// Shape of an array position, reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayMetadata {
    /// Number of elements.
    pub length: u64,
    /// Nesting depth of the array rooted here.
    pub dimensions: Dimensions,
    /// Common element type; `ANY` for heterogeneous arrays.
    pub element_type: TypeTag,
    /// The source will fill the array itself via
    /// [`ConstructSource::build_array_fast`].
    pub fast_path: bool,
}

fn unsupported(what: &str) -> CdtError {
    CdtError::ForeignError(format!("construct source does not provide {what}"))
}

/// Supplier of tree shape and leaf values for the construct engine.
///
/// `root_elements_count` and `type_info` are always required; leaf getters
/// default to an error so a source only implements the types it produces.
#[allow(unused_variables)]
pub trait ConstructSource {
    /// Number of top-level elements. Consulted only when the target root is
    /// empty on entry.
    fn root_elements_count(&mut self) -> CdtResult<u64>;

    /// Concrete type of the position at `index`. Returning `ANY` fails the
    /// construction.
    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo>;

    /// Shape of the array at `index`.
    fn array_metadata(&mut self, index: &[u64]) -> CdtResult<ArrayMetadata> {
        Err(unsupported("array metadata"))
    }

    /// Fill `out` in one bulk operation. Called only when the preceding
    /// [`ConstructSource::array_metadata`] requested the fast path; the
    /// engine does not recurse into the subtree afterwards.
    fn build_array_fast(&mut self, index: &[u64], out: &mut Cdts) -> CdtResult<()> {
        Err(unsupported("fast-path array construction"))
    }

    /// 64-bit float at `index`.
    fn float64(&mut self, index: &[u64]) -> CdtResult<f64> {
        Err(unsupported("float64"))
    }

    /// 32-bit float at `index`.
    fn float32(&mut self, index: &[u64]) -> CdtResult<f32> {
        Err(unsupported("float32"))
    }

    /// Signed 8-bit integer at `index`.
    fn int8(&mut self, index: &[u64]) -> CdtResult<i8> {
        Err(unsupported("int8"))
    }

    /// Signed 16-bit integer at `index`.
    fn int16(&mut self, index: &[u64]) -> CdtResult<i16> {
        Err(unsupported("int16"))
    }

    /// Signed 32-bit integer at `index`.
    fn int32(&mut self, index: &[u64]) -> CdtResult<i32> {
        Err(unsupported("int32"))
    }

    /// Signed 64-bit integer at `index`.
    fn int64(&mut self, index: &[u64]) -> CdtResult<i64> {
        Err(unsupported("int64"))
    }

    /// Unsigned 8-bit integer at `index`.
    fn uint8(&mut self, index: &[u64]) -> CdtResult<u8> {
        Err(unsupported("uint8"))
    }

    /// Unsigned 16-bit integer at `index`.
    fn uint16(&mut self, index: &[u64]) -> CdtResult<u16> {
        Err(unsupported("uint16"))
    }

    /// Unsigned 32-bit integer at `index`.
    fn uint32(&mut self, index: &[u64]) -> CdtResult<u32> {
        Err(unsupported("uint32"))
    }

    /// Unsigned 64-bit integer at `index`.
    fn uint64(&mut self, index: &[u64]) -> CdtResult<u64> {
        Err(unsupported("uint64"))
    }

    /// Boolean at `index`.
    fn bool(&mut self, index: &[u64]) -> CdtResult<bool> {
        Err(unsupported("bool"))
    }

    /// UTF-8 character at `index`.
    fn char8(&mut self, index: &[u64]) -> CdtResult<Char8> {
        Err(unsupported("char8"))
    }

    /// UTF-16 character at `index`.
    fn char16(&mut self, index: &[u64]) -> CdtResult<Char16> {
        Err(unsupported("char16"))
    }

    /// UTF-32 character at `index`.
    fn char32(&mut self, index: &[u64]) -> CdtResult<Char32> {
        Err(unsupported("char32"))
    }

    /// UTF-8 string at `index`. The engine owns the returned value.
    fn string8(&mut self, index: &[u64]) -> CdtResult<String> {
        Err(unsupported("string8"))
    }

    /// UTF-16 string at `index`.
    fn string16(&mut self, index: &[u64]) -> CdtResult<Vec<u16>> {
        Err(unsupported("string16"))
    }

    /// UTF-32 string at `index`.
    fn string32(&mut self, index: &[u64]) -> CdtResult<Vec<u32>> {
        Err(unsupported("string32"))
    }

    /// Handle at `index`. The tree becomes the releaser's single owner.
    fn handle(&mut self, index: &[u64]) -> CdtResult<Handle> {
        Err(unsupported("handle"))
    }

    /// Callable at `index`.
    fn callable(&mut self, index: &[u64]) -> CdtResult<Callable> {
        Err(unsupported("callable"))
    }
}

/// Populate `arr` from `source`. An empty root is sized from
/// [`ConstructSource::root_elements_count`] first.
pub fn construct_cdts<S: ConstructSource + ?Sized>(arr: &mut Cdts, source: &mut S) -> CdtResult<()> {
    if arr.is_empty() {
        let count = source.root_elements_count()?;
        arr.resize_null(count as usize);
    }
    let mut path = Vec::with_capacity(8);
    for i in 0..arr.len() {
        path.push(i as u64);
        let result = construct_item(&mut arr[i], source, &mut path);
        path.pop();
        result?;
    }
    Ok(())
}

/// Populate a single value with an empty index path.
pub fn construct_cdt<S: ConstructSource + ?Sized>(item: &mut Cdt, source: &mut S) -> CdtResult<()> {
    let mut path = Vec::with_capacity(8);
    construct_item(item, source, &mut path)
}

fn construct_item<S: ConstructSource + ?Sized>(
    item: &mut Cdt,
    source: &mut S,
    path: &mut Vec<u64>,
) -> CdtResult<()> {
    let info = source.type_info(path)?;
    let tag = info.tag;

    if tag == TypeTag::ANY {
        return Err(CdtError::InvalidType(
            "type info must name a concrete type, not any".into(),
        ));
    }

    if tag.is_array() {
        *item = Cdt::array(construct_array(source, path)?);
        return Ok(());
    }

    *item = match tag.bits() {
        bits::FLOAT64 => Cdt::float64(source.float64(path)?),
        bits::FLOAT32 => Cdt::float32(source.float32(path)?),
        bits::INT8 => Cdt::int8(source.int8(path)?),
        bits::INT16 => Cdt::int16(source.int16(path)?),
        bits::INT32 => Cdt::int32(source.int32(path)?),
        bits::INT64 => Cdt::int64(source.int64(path)?),
        bits::UINT8 => Cdt::uint8(source.uint8(path)?),
        bits::UINT16 => Cdt::uint16(source.uint16(path)?),
        bits::UINT32 => Cdt::uint32(source.uint32(path)?),
        bits::UINT64 => Cdt::uint64(source.uint64(path)?),
        bits::BOOL => Cdt::bool(source.bool(path)?),
        bits::CHAR8 => Cdt::char8(source.char8(path)?),
        bits::CHAR16 => Cdt::char16(source.char16(path)?),
        bits::CHAR32 => Cdt::char32(source.char32(path)?),
        bits::STRING8 => Cdt::string8(source.string8(path)?),
        bits::STRING16 => Cdt::string16(source.string16(path)?),
        bits::STRING32 => Cdt::string32(source.string32(path)?),
        bits::HANDLE => Cdt::handle(source.handle(path)?),
        bits::CALLABLE => Cdt::callable(source.callable(path)?),
        bits::NULL => Cdt::null(),
        other => return Err(CdtError::UnknownTag(other)),
    };
    Ok(())
}

fn construct_array<S: ConstructSource + ?Sized>(
    source: &mut S,
    path: &mut Vec<u64>,
) -> CdtResult<Cdts> {
    let meta = source.array_metadata(path)?;
    let mut child = Cdts::with_len(meta.length as usize, meta.dimensions, meta.element_type);

    if meta.fast_path {
        source.build_array_fast(path, &mut child)?;
        if child.len() as u64 != meta.length {
            return Err(CdtError::ArrayShapeMismatch {
                declared: meta.length,
                produced: child.len() as u64,
            });
        }
        return Ok(child);
    }

    for i in 0..child.len() {
        path.push(i as u64);
        let result = construct_item(&mut child[i], source, path);
        path.pop();
        result?;
    }
    Ok(child)
}
