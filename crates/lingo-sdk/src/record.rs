//! Traversal recording and replay.
//!
//! [`Recording`] is a visitor that captures every callback with its index
//! path, in emission order. [`ReplaySource`] answers the construct engine
//! from such a recording, so `construct(replay(traverse(T)))` rebuilds a
//! tree equal to `T`. The pair is the round-trip harness used by the
//! workspace tests; a host binding can also use a recording as a cheap
//! detached snapshot of a tree's contents.
//!
//! Handles are recorded as `(raw, runtime_id)` pairs and replayed without a
//! releaser: a recording never takes over release obligations, so replaying
//! cannot duplicate a releaser. Handle equality ignores the releaser, which
//! keeps replayed trees equal to their originals.

use std::collections::HashMap;
use std::ffi::c_void;

use lingo_core::{
    ArrayMetadata, ArrayVisit, Callable, CdtError, CdtResult, Cdts, Char16, Char32, Char8,
    ConstructSource, Dimensions, Handle, TraverseVisitor, TypeInfo, TypeTag, XCall,
};

/// One recorded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedValue {
    /// Null leaf.
    Null,
    /// f64 leaf.
    Float64(f64),
    /// f32 leaf.
    Float32(f32),
    /// i8 leaf.
    Int8(i8),
    /// i16 leaf.
    Int16(i16),
    /// i32 leaf.
    Int32(i32),
    /// i64 leaf.
    Int64(i64),
    /// u8 leaf.
    UInt8(u8),
    /// u16 leaf.
    UInt16(u16),
    /// u32 leaf.
    UInt32(u32),
    /// u64 leaf.
    UInt64(u64),
    /// bool leaf.
    Bool(bool),
    /// UTF-8 char leaf.
    Char8(Char8),
    /// UTF-16 char leaf.
    Char16(Char16),
    /// UTF-32 char leaf.
    Char32(Char32),
    /// UTF-8 string leaf.
    String8(String),
    /// UTF-16 string leaf.
    String16(Vec<u16>),
    /// UTF-32 string leaf.
    String32(Vec<u32>),
    /// Handle leaf, without the release obligation.
    Handle {
        /// Raw pointer of the recorded handle.
        raw: *mut c_void,
        /// Producing runtime.
        runtime_id: u64,
    },
    /// Callable leaf.
    Callable {
        /// xcall entry point.
        entry: *const c_void,
        /// xcall context.
        context: *mut c_void,
        /// Declared parameter types.
        param_types: Vec<TypeTag>,
        /// Declared return types.
        ret_types: Vec<TypeTag>,
    },
    /// Array entry.
    Array {
        /// Element count.
        length: u64,
        /// Nesting depth.
        dimensions: Dimensions,
        /// Common element type.
        element_type: TypeTag,
    },
}

impl RecordedValue {
    /// The type tag this payload replays as.
    pub fn tag(&self) -> TypeTag {
        match self {
            RecordedValue::Null => TypeTag::NULL,
            RecordedValue::Float64(_) => TypeTag::FLOAT64,
            RecordedValue::Float32(_) => TypeTag::FLOAT32,
            RecordedValue::Int8(_) => TypeTag::INT8,
            RecordedValue::Int16(_) => TypeTag::INT16,
            RecordedValue::Int32(_) => TypeTag::INT32,
            RecordedValue::Int64(_) => TypeTag::INT64,
            RecordedValue::UInt8(_) => TypeTag::UINT8,
            RecordedValue::UInt16(_) => TypeTag::UINT16,
            RecordedValue::UInt32(_) => TypeTag::UINT32,
            RecordedValue::UInt64(_) => TypeTag::UINT64,
            RecordedValue::Bool(_) => TypeTag::BOOL,
            RecordedValue::Char8(_) => TypeTag::CHAR8,
            RecordedValue::Char16(_) => TypeTag::CHAR16,
            RecordedValue::Char32(_) => TypeTag::CHAR32,
            RecordedValue::String8(_) => TypeTag::STRING8,
            RecordedValue::String16(_) => TypeTag::STRING16,
            RecordedValue::String32(_) => TypeTag::STRING32,
            RecordedValue::Handle { .. } => TypeTag::HANDLE,
            RecordedValue::Callable { .. } => TypeTag::CALLABLE,
            RecordedValue::Array { element_type, .. } => {
                if *element_type == TypeTag::ANY {
                    TypeTag::ARRAY
                } else {
                    *element_type | TypeTag::ARRAY
                }
            }
        }
    }
}

/// One recorded callback: the index path and the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Index path of the visit.
    pub path: Vec<u64>,
    /// Captured payload.
    pub value: RecordedValue,
}

/// Visitor capturing the complete ordered call log of a traversal.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Recording {
    calls: Vec<RecordedCall>,
}

impl Recording {
    /// An empty recording.
    pub fn new() -> Self {
        Recording::default()
    }

    /// The captured calls, in emission order.
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// The captured index paths, in emission order.
    pub fn paths(&self) -> impl Iterator<Item = &[u64]> {
        self.calls.iter().map(|c| c.path.as_slice())
    }

    fn push(&mut self, index: &[u64], value: RecordedValue) {
        self.calls.push(RecordedCall {
            path: index.to_vec(),
            value,
        });
    }
}

impl TraverseVisitor for Recording {
    fn on_float64(&mut self, index: &[u64], v: f64) -> CdtResult<()> {
        self.push(index, RecordedValue::Float64(v));
        Ok(())
    }

    fn on_float32(&mut self, index: &[u64], v: f32) -> CdtResult<()> {
        self.push(index, RecordedValue::Float32(v));
        Ok(())
    }

    fn on_int8(&mut self, index: &[u64], v: i8) -> CdtResult<()> {
        self.push(index, RecordedValue::Int8(v));
        Ok(())
    }

    fn on_int16(&mut self, index: &[u64], v: i16) -> CdtResult<()> {
        self.push(index, RecordedValue::Int16(v));
        Ok(())
    }

    fn on_int32(&mut self, index: &[u64], v: i32) -> CdtResult<()> {
        self.push(index, RecordedValue::Int32(v));
        Ok(())
    }

    fn on_int64(&mut self, index: &[u64], v: i64) -> CdtResult<()> {
        self.push(index, RecordedValue::Int64(v));
        Ok(())
    }

    fn on_uint8(&mut self, index: &[u64], v: u8) -> CdtResult<()> {
        self.push(index, RecordedValue::UInt8(v));
        Ok(())
    }

    fn on_uint16(&mut self, index: &[u64], v: u16) -> CdtResult<()> {
        self.push(index, RecordedValue::UInt16(v));
        Ok(())
    }

    fn on_uint32(&mut self, index: &[u64], v: u32) -> CdtResult<()> {
        self.push(index, RecordedValue::UInt32(v));
        Ok(())
    }

    fn on_uint64(&mut self, index: &[u64], v: u64) -> CdtResult<()> {
        self.push(index, RecordedValue::UInt64(v));
        Ok(())
    }

    fn on_bool(&mut self, index: &[u64], v: bool) -> CdtResult<()> {
        self.push(index, RecordedValue::Bool(v));
        Ok(())
    }

    fn on_char8(&mut self, index: &[u64], v: Char8) -> CdtResult<()> {
        self.push(index, RecordedValue::Char8(v));
        Ok(())
    }

    fn on_char16(&mut self, index: &[u64], v: Char16) -> CdtResult<()> {
        self.push(index, RecordedValue::Char16(v));
        Ok(())
    }

    fn on_char32(&mut self, index: &[u64], v: Char32) -> CdtResult<()> {
        self.push(index, RecordedValue::Char32(v));
        Ok(())
    }

    fn on_string8(&mut self, index: &[u64], v: &str) -> CdtResult<()> {
        self.push(index, RecordedValue::String8(v.to_string()));
        Ok(())
    }

    fn on_string16(&mut self, index: &[u64], v: &[u16]) -> CdtResult<()> {
        self.push(index, RecordedValue::String16(v.to_vec()));
        Ok(())
    }

    fn on_string32(&mut self, index: &[u64], v: &[u32]) -> CdtResult<()> {
        self.push(index, RecordedValue::String32(v.to_vec()));
        Ok(())
    }

    fn on_handle(&mut self, index: &[u64], v: &Handle) -> CdtResult<()> {
        self.push(
            index,
            RecordedValue::Handle {
                raw: v.raw(),
                runtime_id: v.runtime_id(),
            },
        );
        Ok(())
    }

    fn on_callable(&mut self, index: &[u64], v: &Callable) -> CdtResult<()> {
        self.push(
            index,
            RecordedValue::Callable {
                entry: v.xcall().entry(),
                context: v.xcall().context(),
                param_types: v.param_types().to_vec(),
                ret_types: v.ret_types().to_vec(),
            },
        );
        Ok(())
    }

    fn on_null(&mut self, index: &[u64]) -> CdtResult<()> {
        self.push(index, RecordedValue::Null);
        Ok(())
    }

    fn on_array(
        &mut self,
        index: &[u64],
        array: &Cdts,
        dimensions: Dimensions,
        element_type: TypeTag,
    ) -> CdtResult<ArrayVisit> {
        self.push(
            index,
            RecordedValue::Array {
                length: array.len() as u64,
                dimensions,
                element_type,
            },
        );
        Ok(ArrayVisit::Recurse)
    }
}

/// Construct source replaying a [`Recording`].
pub struct ReplaySource {
    by_path: HashMap<Vec<u64>, RecordedValue>,
    root_len: u64,
    use_fast_path: bool,
}

impl ReplaySource {
    /// Replay per-element.
    pub fn new(recording: &Recording) -> Self {
        Self::build(recording, false)
    }

    /// Replay 1-D scalar arrays through the bulk fast path.
    pub fn with_fast_path(recording: &Recording) -> Self {
        Self::build(recording, true)
    }

    fn build(recording: &Recording, use_fast_path: bool) -> Self {
        let mut by_path = HashMap::with_capacity(recording.calls().len());
        let mut root_len = 0u64;
        for call in recording.calls() {
            if call.path.len() == 1 {
                root_len = root_len.max(call.path[0] + 1);
            }
            by_path.insert(call.path.clone(), call.value.clone());
        }
        ReplaySource {
            by_path,
            root_len,
            use_fast_path,
        }
    }

    fn lookup(&self, index: &[u64]) -> CdtResult<&RecordedValue> {
        self.by_path
            .get(index)
            .ok_or_else(|| CdtError::ForeignError(format!("no recorded call at {index:?}")))
    }

    fn scalar_to_cdt(value: &RecordedValue) -> CdtResult<lingo_core::Cdt> {
        use lingo_core::Cdt;
        Ok(match value {
            RecordedValue::Null => Cdt::null(),
            RecordedValue::Float64(v) => Cdt::float64(*v),
            RecordedValue::Float32(v) => Cdt::float32(*v),
            RecordedValue::Int8(v) => Cdt::int8(*v),
            RecordedValue::Int16(v) => Cdt::int16(*v),
            RecordedValue::Int32(v) => Cdt::int32(*v),
            RecordedValue::Int64(v) => Cdt::int64(*v),
            RecordedValue::UInt8(v) => Cdt::uint8(*v),
            RecordedValue::UInt16(v) => Cdt::uint16(*v),
            RecordedValue::UInt32(v) => Cdt::uint32(*v),
            RecordedValue::UInt64(v) => Cdt::uint64(*v),
            RecordedValue::Bool(v) => Cdt::bool(*v),
            RecordedValue::Char8(v) => Cdt::char8(*v),
            RecordedValue::Char16(v) => Cdt::char16(*v),
            RecordedValue::Char32(v) => Cdt::char32(*v),
            RecordedValue::Handle { raw, runtime_id } => {
                Cdt::handle(Handle::new(*raw, *runtime_id, None))
            }
            other => {
                return Err(CdtError::ForeignError(format!(
                    "fast path cannot replay {} elements",
                    other.tag().name()
                )))
            }
        })
    }

    fn expect<T>(
        &self,
        index: &[u64],
        expected: TypeTag,
        extract: impl FnOnce(&RecordedValue) -> Option<T>,
    ) -> CdtResult<T> {
        let value = self.lookup(index)?;
        extract(value).ok_or_else(|| CdtError::TypeMismatch {
            expected: expected.name().to_string(),
            got: value.tag().name().to_string(),
        })
    }
}

impl ConstructSource for ReplaySource {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(self.root_len)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        let value = self.lookup(index)?;
        let dimensions = match value {
            RecordedValue::Array { dimensions, .. } => *dimensions,
            _ => Dimensions::default(),
        };
        Ok(TypeInfo::with_dimensions(value.tag(), dimensions))
    }

    fn array_metadata(&mut self, index: &[u64]) -> CdtResult<ArrayMetadata> {
        match self.lookup(index)? {
            RecordedValue::Array {
                length,
                dimensions,
                element_type,
            } => {
                // bulk replay only pays off for regular 1-D scalar rows
                let fast = self.use_fast_path
                    && *dimensions == Dimensions::Fixed(1)
                    && !element_type.intersects(
                        TypeTag::STRING8
                            | TypeTag::STRING16
                            | TypeTag::STRING32
                            | TypeTag::CALLABLE
                            | TypeTag::ANY
                            | TypeTag::ARRAY,
                    );
                Ok(ArrayMetadata {
                    length: *length,
                    dimensions: *dimensions,
                    element_type: *element_type,
                    fast_path: fast,
                })
            }
            other => Err(CdtError::TypeMismatch {
                expected: "array".to_string(),
                got: other.tag().name().to_string(),
            }),
        }
    }

    fn build_array_fast(&mut self, index: &[u64], out: &mut Cdts) -> CdtResult<()> {
        let mut items = Vec::with_capacity(out.len());
        let mut path = index.to_vec();
        for i in 0..out.len() as u64 {
            path.push(i);
            items.push(Self::scalar_to_cdt(self.lookup(&path)?)?);
            path.pop();
        }
        out.set_items(items);
        Ok(())
    }

    fn float64(&mut self, index: &[u64]) -> CdtResult<f64> {
        self.expect(index, TypeTag::FLOAT64, |v| match v {
            RecordedValue::Float64(x) => Some(*x),
            _ => None,
        })
    }

    fn float32(&mut self, index: &[u64]) -> CdtResult<f32> {
        self.expect(index, TypeTag::FLOAT32, |v| match v {
            RecordedValue::Float32(x) => Some(*x),
            _ => None,
        })
    }

    fn int8(&mut self, index: &[u64]) -> CdtResult<i8> {
        self.expect(index, TypeTag::INT8, |v| match v {
            RecordedValue::Int8(x) => Some(*x),
            _ => None,
        })
    }

    fn int16(&mut self, index: &[u64]) -> CdtResult<i16> {
        self.expect(index, TypeTag::INT16, |v| match v {
            RecordedValue::Int16(x) => Some(*x),
            _ => None,
        })
    }

    fn int32(&mut self, index: &[u64]) -> CdtResult<i32> {
        self.expect(index, TypeTag::INT32, |v| match v {
            RecordedValue::Int32(x) => Some(*x),
            _ => None,
        })
    }

    fn int64(&mut self, index: &[u64]) -> CdtResult<i64> {
        self.expect(index, TypeTag::INT64, |v| match v {
            RecordedValue::Int64(x) => Some(*x),
            _ => None,
        })
    }

    fn uint8(&mut self, index: &[u64]) -> CdtResult<u8> {
        self.expect(index, TypeTag::UINT8, |v| match v {
            RecordedValue::UInt8(x) => Some(*x),
            _ => None,
        })
    }

    fn uint16(&mut self, index: &[u64]) -> CdtResult<u16> {
        self.expect(index, TypeTag::UINT16, |v| match v {
            RecordedValue::UInt16(x) => Some(*x),
            _ => None,
        })
    }

    fn uint32(&mut self, index: &[u64]) -> CdtResult<u32> {
        self.expect(index, TypeTag::UINT32, |v| match v {
            RecordedValue::UInt32(x) => Some(*x),
            _ => None,
        })
    }

    fn uint64(&mut self, index: &[u64]) -> CdtResult<u64> {
        self.expect(index, TypeTag::UINT64, |v| match v {
            RecordedValue::UInt64(x) => Some(*x),
            _ => None,
        })
    }

    fn bool(&mut self, index: &[u64]) -> CdtResult<bool> {
        self.expect(index, TypeTag::BOOL, |v| match v {
            RecordedValue::Bool(x) => Some(*x),
            _ => None,
        })
    }

    fn char8(&mut self, index: &[u64]) -> CdtResult<Char8> {
        self.expect(index, TypeTag::CHAR8, |v| match v {
            RecordedValue::Char8(x) => Some(*x),
            _ => None,
        })
    }

    fn char16(&mut self, index: &[u64]) -> CdtResult<Char16> {
        self.expect(index, TypeTag::CHAR16, |v| match v {
            RecordedValue::Char16(x) => Some(*x),
            _ => None,
        })
    }

    fn char32(&mut self, index: &[u64]) -> CdtResult<Char32> {
        self.expect(index, TypeTag::CHAR32, |v| match v {
            RecordedValue::Char32(x) => Some(*x),
            _ => None,
        })
    }

    fn string8(&mut self, index: &[u64]) -> CdtResult<String> {
        self.expect(index, TypeTag::STRING8, |v| match v {
            RecordedValue::String8(x) => Some(x.clone()),
            _ => None,
        })
    }

    fn string16(&mut self, index: &[u64]) -> CdtResult<Vec<u16>> {
        self.expect(index, TypeTag::STRING16, |v| match v {
            RecordedValue::String16(x) => Some(x.clone()),
            _ => None,
        })
    }

    fn string32(&mut self, index: &[u64]) -> CdtResult<Vec<u32>> {
        self.expect(index, TypeTag::STRING32, |v| match v {
            RecordedValue::String32(x) => Some(x.clone()),
            _ => None,
        })
    }

    fn handle(&mut self, index: &[u64]) -> CdtResult<Handle> {
        self.expect(index, TypeTag::HANDLE, |v| match v {
            RecordedValue::Handle { raw, runtime_id } => {
                Some(Handle::new(*raw, *runtime_id, None))
            }
            _ => None,
        })
    }

    fn callable(&mut self, index: &[u64]) -> CdtResult<Callable> {
        self.expect(index, TypeTag::CALLABLE, |v| match v {
            RecordedValue::Callable {
                entry,
                context,
                param_types,
                ret_types,
            } => Some(Callable::new(
                XCall::new(*entry, *context),
                param_types.clone(),
                ret_types.clone(),
            )),
            _ => None,
        })
    }
}

