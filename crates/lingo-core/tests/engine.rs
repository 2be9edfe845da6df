//! Construct/traverse integration tests.
//!
//! Each test constructs a tree through a `ConstructSource` backed by plain
//! Rust data, then traverses it and checks the emitted calls, the way a pair
//! of host runtimes would hand values to each other.

use std::ffi::c_void;

use lingo_core::{
    construct_cdts, traverse_cdts, ArrayMetadata, ArrayVisit, Callable, Cdt, CdtResult, Cdts,
    Char16, Char32, Char8, ConstructSource, Dimensions, Handle, TraverseVisitor, TypeInfo,
    TypeTag, XCall,
};

/// One recorded traversal callback.
#[derive(Debug, Clone, PartialEq)]
enum Event {
    F32(Vec<u64>, f32),
    F64(Vec<u64>, f64),
    I8(Vec<u64>, i8),
    U8(Vec<u64>, u8),
    I16(Vec<u64>, i16),
    U16(Vec<u64>, u16),
    I32(Vec<u64>, i32),
    U32(Vec<u64>, u32),
    I64(Vec<u64>, i64),
    U64(Vec<u64>, u64),
    Bool(Vec<u64>, bool),
    C8(Vec<u64>, Char8),
    C16(Vec<u64>, Char16),
    C32(Vec<u64>, Char32),
    Str8(Vec<u64>, String),
    Str16(Vec<u64>, Vec<u16>),
    Str32(Vec<u64>, Vec<u32>),
    Handle(Vec<u64>, usize, u64),
    Callable(Vec<u64>, usize),
    Null(Vec<u64>),
    Array(Vec<u64>, usize, i64, u64),
}

#[derive(Default)]
struct Log {
    events: Vec<Event>,
}

impl TraverseVisitor for Log {
    fn on_float32(&mut self, index: &[u64], v: f32) -> CdtResult<()> {
        self.events.push(Event::F32(index.to_vec(), v));
        Ok(())
    }
    fn on_float64(&mut self, index: &[u64], v: f64) -> CdtResult<()> {
        self.events.push(Event::F64(index.to_vec(), v));
        Ok(())
    }
    fn on_int8(&mut self, index: &[u64], v: i8) -> CdtResult<()> {
        self.events.push(Event::I8(index.to_vec(), v));
        Ok(())
    }
    fn on_uint8(&mut self, index: &[u64], v: u8) -> CdtResult<()> {
        self.events.push(Event::U8(index.to_vec(), v));
        Ok(())
    }
    fn on_int16(&mut self, index: &[u64], v: i16) -> CdtResult<()> {
        self.events.push(Event::I16(index.to_vec(), v));
        Ok(())
    }
    fn on_uint16(&mut self, index: &[u64], v: u16) -> CdtResult<()> {
        self.events.push(Event::U16(index.to_vec(), v));
        Ok(())
    }
    fn on_int32(&mut self, index: &[u64], v: i32) -> CdtResult<()> {
        self.events.push(Event::I32(index.to_vec(), v));
        Ok(())
    }
    fn on_uint32(&mut self, index: &[u64], v: u32) -> CdtResult<()> {
        self.events.push(Event::U32(index.to_vec(), v));
        Ok(())
    }
    fn on_int64(&mut self, index: &[u64], v: i64) -> CdtResult<()> {
        self.events.push(Event::I64(index.to_vec(), v));
        Ok(())
    }
    fn on_uint64(&mut self, index: &[u64], v: u64) -> CdtResult<()> {
        self.events.push(Event::U64(index.to_vec(), v));
        Ok(())
    }
    fn on_bool(&mut self, index: &[u64], v: bool) -> CdtResult<()> {
        self.events.push(Event::Bool(index.to_vec(), v));
        Ok(())
    }
    fn on_char8(&mut self, index: &[u64], v: Char8) -> CdtResult<()> {
        self.events.push(Event::C8(index.to_vec(), v));
        Ok(())
    }
    fn on_char16(&mut self, index: &[u64], v: Char16) -> CdtResult<()> {
        self.events.push(Event::C16(index.to_vec(), v));
        Ok(())
    }
    fn on_char32(&mut self, index: &[u64], v: Char32) -> CdtResult<()> {
        self.events.push(Event::C32(index.to_vec(), v));
        Ok(())
    }
    fn on_string8(&mut self, index: &[u64], v: &str) -> CdtResult<()> {
        self.events.push(Event::Str8(index.to_vec(), v.to_string()));
        Ok(())
    }
    fn on_string16(&mut self, index: &[u64], v: &[u16]) -> CdtResult<()> {
        self.events.push(Event::Str16(index.to_vec(), v.to_vec()));
        Ok(())
    }
    fn on_string32(&mut self, index: &[u64], v: &[u32]) -> CdtResult<()> {
        self.events.push(Event::Str32(index.to_vec(), v.to_vec()));
        Ok(())
    }
    fn on_handle(&mut self, index: &[u64], v: &Handle) -> CdtResult<()> {
        self.events
            .push(Event::Handle(index.to_vec(), v.raw() as usize, v.runtime_id()));
        Ok(())
    }
    fn on_callable(&mut self, index: &[u64], v: &Callable) -> CdtResult<()> {
        self.events
            .push(Event::Callable(index.to_vec(), v.xcall().entry() as usize));
        Ok(())
    }
    fn on_null(&mut self, index: &[u64]) -> CdtResult<()> {
        self.events.push(Event::Null(index.to_vec()));
        Ok(())
    }
    fn on_array(
        &mut self,
        index: &[u64],
        array: &Cdts,
        dimensions: Dimensions,
        element_type: TypeTag,
    ) -> CdtResult<ArrayVisit> {
        self.events.push(Event::Array(
            index.to_vec(),
            array.len(),
            dimensions.to_raw(),
            element_type.bits(),
        ));
        Ok(ArrayVisit::Recurse)
    }
}

// ============================================================================
// Full primitive set
// ============================================================================

/// Source producing one value of every leaf type at the root.
struct AllPrims;

const ALL_TAGS: &[TypeTag] = &[
    TypeTag::FLOAT32,
    TypeTag::FLOAT64,
    TypeTag::INT8,
    TypeTag::UINT8,
    TypeTag::INT16,
    TypeTag::UINT16,
    TypeTag::INT32,
    TypeTag::UINT32,
    TypeTag::INT64,
    TypeTag::UINT64,
    TypeTag::BOOL,
    TypeTag::CHAR8,
    TypeTag::CHAR16,
    TypeTag::CHAR32,
    TypeTag::STRING8,
    TypeTag::STRING16,
    TypeTag::STRING32,
    TypeTag::HANDLE,
    TypeTag::CALLABLE,
    TypeTag::NULL,
];

impl ConstructSource for AllPrims {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(ALL_TAGS.len() as u64)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        assert_eq!(index.len(), 1);
        Ok(TypeInfo::new(ALL_TAGS[index[0] as usize]))
    }

    fn float32(&mut self, _: &[u64]) -> CdtResult<f32> {
        Ok(3.14)
    }
    fn float64(&mut self, _: &[u64]) -> CdtResult<f64> {
        Ok(2.71828)
    }
    fn int8(&mut self, _: &[u64]) -> CdtResult<i8> {
        Ok(1)
    }
    fn uint8(&mut self, _: &[u64]) -> CdtResult<u8> {
        Ok(2)
    }
    fn int16(&mut self, _: &[u64]) -> CdtResult<i16> {
        Ok(3)
    }
    fn uint16(&mut self, _: &[u64]) -> CdtResult<u16> {
        Ok(4)
    }
    fn int32(&mut self, _: &[u64]) -> CdtResult<i32> {
        Ok(5)
    }
    fn uint32(&mut self, _: &[u64]) -> CdtResult<u32> {
        Ok(6)
    }
    fn int64(&mut self, _: &[u64]) -> CdtResult<i64> {
        Ok(7)
    }
    fn uint64(&mut self, _: &[u64]) -> CdtResult<u64> {
        Ok(8)
    }
    fn bool(&mut self, _: &[u64]) -> CdtResult<bool> {
        Ok(true)
    }
    fn char8(&mut self, _: &[u64]) -> CdtResult<Char8> {
        Ok(Char8::from_char('\u{05D0}'))
    }
    fn char16(&mut self, _: &[u64]) -> CdtResult<Char16> {
        Ok(Char16::from_char('\u{05D1}'))
    }
    fn char32(&mut self, _: &[u64]) -> CdtResult<Char32> {
        Ok(Char32::from_char('\u{05D2}'))
    }
    fn string8(&mut self, _: &[u64]) -> CdtResult<String> {
        Ok("Hello UTF-8".to_string())
    }
    fn string16(&mut self, _: &[u64]) -> CdtResult<Vec<u16>> {
        Ok("Hello UTF-16".encode_utf16().collect())
    }
    fn string32(&mut self, _: &[u64]) -> CdtResult<Vec<u32>> {
        Ok("Hello UTF-32".chars().map(|c| c as u32).collect())
    }
    fn handle(&mut self, _: &[u64]) -> CdtResult<Handle> {
        Ok(Handle::new(0x1 as *mut c_void, 101, None))
    }
    fn callable(&mut self, _: &[u64]) -> CdtResult<Callable> {
        Ok(Callable::new(
            XCall::new(0x2 as *const c_void, std::ptr::null_mut()),
            vec![TypeTag::INT8, TypeTag::INT16],
            vec![TypeTag::FLOAT32],
        ))
    }
}

#[test]
fn test_all_primitives_roundtrip() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut AllPrims).unwrap();
    assert_eq!(root.len(), ALL_TAGS.len());

    let mut log = Log::default();
    traverse_cdts(&root, &mut log).unwrap();

    let expected = vec![
        Event::F32(vec![0], 3.14),
        Event::F64(vec![1], 2.71828),
        Event::I8(vec![2], 1),
        Event::U8(vec![3], 2),
        Event::I16(vec![4], 3),
        Event::U16(vec![5], 4),
        Event::I32(vec![6], 5),
        Event::U32(vec![7], 6),
        Event::I64(vec![8], 7),
        Event::U64(vec![9], 8),
        Event::Bool(vec![10], true),
        Event::C8(vec![11], Char8::from_char('\u{05D0}')),
        Event::C16(vec![12], Char16::from_char('\u{05D1}')),
        Event::C32(vec![13], Char32::from_char('\u{05D2}')),
        Event::Str8(vec![14], "Hello UTF-8".to_string()),
        Event::Str16(vec![15], "Hello UTF-16".encode_utf16().collect()),
        Event::Str32(vec![16], "Hello UTF-32".chars().map(|c| c as u32).collect()),
        Event::Handle(vec![17], 0x1, 101),
        Event::Callable(vec![18], 0x2),
        Event::Null(vec![19]),
    ];
    assert_eq!(log.events, expected);
}

// ============================================================================
// Scenario: integer echo
// ============================================================================

struct Int64Echo;

impl ConstructSource for Int64Echo {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(1)
    }

    fn type_info(&mut self, _: &[u64]) -> CdtResult<TypeInfo> {
        Ok(TypeInfo::new(TypeTag::INT64))
    }

    fn int64(&mut self, index: &[u64]) -> CdtResult<i64> {
        assert_eq!(index, [0]);
        Ok(-7)
    }
}

#[test]
fn test_int64_echo() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut Int64Echo).unwrap();

    let mut log = Log::default();
    traverse_cdts(&root, &mut log).unwrap();
    assert_eq!(log.events, vec![Event::I64(vec![0], -7)]);
}

// ============================================================================
// Scenario: string array
// ============================================================================

struct TwoStrings;

impl ConstructSource for TwoStrings {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(1)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        if index.len() == 1 {
            Ok(TypeInfo::with_dimensions(
                TypeTag::STRING8 | TypeTag::ARRAY,
                Dimensions::Fixed(1),
            ))
        } else {
            Ok(TypeInfo::new(TypeTag::STRING8))
        }
    }

    fn array_metadata(&mut self, _: &[u64]) -> CdtResult<ArrayMetadata> {
        Ok(ArrayMetadata {
            length: 2,
            dimensions: Dimensions::Fixed(1),
            element_type: TypeTag::STRING8,
            fast_path: false,
        })
    }

    fn string8(&mut self, index: &[u64]) -> CdtResult<String> {
        Ok(match index[1] {
            0 => "hello".to_string(),
            _ => "world".to_string(),
        })
    }
}

#[test]
fn test_string8_array() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut TwoStrings).unwrap();

    let mut log = Log::default();
    traverse_cdts(&root, &mut log).unwrap();
    assert_eq!(
        log.events,
        vec![
            Event::Array(vec![0], 2, 1, TypeTag::STRING8.bits()),
            Event::Str8(vec![0, 0], "hello".to_string()),
            Event::Str8(vec![0, 1], "world".to_string()),
        ]
    );
}

// ============================================================================
// Scenario: ragged 2-D int array
// ============================================================================

/// `{ {1}, {2,3,4}, {5,6,7,8} }` behind one root slot.
struct Ragged2D {
    rows: Vec<Vec<i32>>,
}

impl Ragged2D {
    fn new() -> Self {
        Ragged2D {
            rows: vec![vec![1], vec![2, 3, 4], vec![5, 6, 7, 8]],
        }
    }
}

impl ConstructSource for Ragged2D {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(1)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        match index.len() {
            1 | 2 => Ok(TypeInfo::with_dimensions(
                TypeTag::INT32 | TypeTag::ARRAY,
                Dimensions::Fixed((3 - index.len()) as u64),
            )),
            _ => Ok(TypeInfo::new(TypeTag::INT32)),
        }
    }

    fn array_metadata(&mut self, index: &[u64]) -> CdtResult<ArrayMetadata> {
        match index.len() {
            1 => Ok(ArrayMetadata {
                length: self.rows.len() as u64,
                dimensions: Dimensions::Fixed(2),
                element_type: TypeTag::INT32,
                fast_path: false,
            }),
            2 => Ok(ArrayMetadata {
                length: self.rows[index[1] as usize].len() as u64,
                dimensions: Dimensions::Fixed(1),
                element_type: TypeTag::INT32,
                fast_path: false,
            }),
            _ => unreachable!("no arrays deeper than 2"),
        }
    }

    fn int32(&mut self, index: &[u64]) -> CdtResult<i32> {
        Ok(self.rows[index[1] as usize][index[2] as usize])
    }
}

#[test]
fn test_ragged_2d_int_array() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut Ragged2D::new()).unwrap();

    let mut log = Log::default();
    traverse_cdts(&root, &mut log).unwrap();

    let i32_bits = TypeTag::INT32.bits();
    assert_eq!(
        log.events,
        vec![
            Event::Array(vec![0], 3, 2, i32_bits),
            Event::Array(vec![0, 0], 1, 1, i32_bits),
            Event::I32(vec![0, 0, 0], 1),
            Event::Array(vec![0, 1], 3, 1, i32_bits),
            Event::I32(vec![0, 1, 0], 2),
            Event::I32(vec![0, 1, 1], 3),
            Event::I32(vec![0, 1, 2], 4),
            Event::Array(vec![0, 2], 4, 1, i32_bits),
            Event::I32(vec![0, 2, 0], 5),
            Event::I32(vec![0, 2, 1], 6),
            Event::I32(vec![0, 2, 2], 7),
            Event::I32(vec![0, 2, 3], 8),
        ]
    );
}

// ============================================================================
// Scenario: fast-path bulk construction
// ============================================================================

struct Doubles {
    values: Vec<f64>,
    fast: bool,
}

impl ConstructSource for Doubles {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(1)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        if index.len() == 1 {
            Ok(TypeInfo::with_dimensions(
                TypeTag::FLOAT64 | TypeTag::ARRAY,
                Dimensions::Fixed(1),
            ))
        } else {
            Ok(TypeInfo::new(TypeTag::FLOAT64))
        }
    }

    fn array_metadata(&mut self, _: &[u64]) -> CdtResult<ArrayMetadata> {
        Ok(ArrayMetadata {
            length: self.values.len() as u64,
            dimensions: Dimensions::Fixed(1),
            element_type: TypeTag::FLOAT64,
            fast_path: self.fast,
        })
    }

    fn build_array_fast(&mut self, _: &[u64], out: &mut Cdts) -> CdtResult<()> {
        out.set_items(self.values.iter().map(|v| Cdt::float64(*v)).collect());
        Ok(())
    }

    fn float64(&mut self, index: &[u64]) -> CdtResult<f64> {
        Ok(self.values[index[1] as usize])
    }
}

#[test]
fn test_fast_path_f64_1024_equivalence() {
    let values: Vec<f64> = (0..1024).map(|i| i as f64 * 0.5).collect();

    let mut fast_root = Cdts::empty_root();
    construct_cdts(
        &mut fast_root,
        &mut Doubles {
            values: values.clone(),
            fast: true,
        },
    )
    .unwrap();

    let mut slow_root = Cdts::empty_root();
    construct_cdts(
        &mut slow_root,
        &mut Doubles {
            values: values.clone(),
            fast: false,
        },
    )
    .unwrap();

    assert_eq!(fast_root, slow_root);

    let mut log = Log::default();
    traverse_cdts(&fast_root, &mut log).unwrap();
    assert_eq!(log.events.len(), 1 + values.len());
    assert_eq!(log.events[1], Event::F64(vec![0, 0], 0.0));
    assert_eq!(log.events[1024], Event::F64(vec![0, 1023], 1023.0 * 0.5));
}

// ============================================================================
// Depth stress
// ============================================================================

/// A chain of single-element arrays, `depth` levels deep, ending in one i32.
struct DeepChain {
    depth: usize,
}

impl ConstructSource for DeepChain {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(1)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        if index.len() <= self.depth {
            Ok(TypeInfo::with_dimensions(
                TypeTag::INT32 | TypeTag::ARRAY,
                Dimensions::Fixed((self.depth - index.len() + 1) as u64),
            ))
        } else {
            Ok(TypeInfo::new(TypeTag::INT32))
        }
    }

    fn array_metadata(&mut self, index: &[u64]) -> CdtResult<ArrayMetadata> {
        Ok(ArrayMetadata {
            length: 1,
            dimensions: Dimensions::Fixed((self.depth - index.len() + 1) as u64),
            element_type: TypeTag::INT32,
            fast_path: false,
        })
    }

    fn int32(&mut self, _: &[u64]) -> CdtResult<i32> {
        Ok(99)
    }
}

#[test]
fn test_depth_16_tree() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut DeepChain { depth: 16 }).unwrap();

    let mut log = Log::default();
    traverse_cdts(&root, &mut log).unwrap();

    // 16 array events plus the single leaf
    assert_eq!(log.events.len(), 17);
    assert_eq!(log.events[16], Event::I32(vec![0; 17], 99));
}

// ============================================================================
// Traverse idempotence
// ============================================================================

#[test]
fn test_traverse_is_idempotent() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut Ragged2D::new()).unwrap();

    let mut first = Log::default();
    traverse_cdts(&root, &mut first).unwrap();
    let mut second = Log::default();
    traverse_cdts(&root, &mut second).unwrap();
    assert_eq!(first.events, second.events);
}

// ============================================================================
// Lexicographic ordering property
// ============================================================================

#[test]
fn test_paths_strictly_increase() {
    let mut root = Cdts::empty_root();
    construct_cdts(&mut root, &mut Ragged2D::new()).unwrap();

    let mut log = Log::default();
    traverse_cdts(&root, &mut log).unwrap();

    let paths: Vec<Vec<u64>> = log
        .events
        .iter()
        .map(|e| match e {
            Event::Array(p, ..) => p.clone(),
            Event::I32(p, _) => p.clone(),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    for pair in paths.windows(2) {
        assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
    }
}
