//! Type-tag taxonomy
//!
//! A type tag is a bit-field integer. One bit is dedicated to "array", one to
//! "any" (type decided at traversal time), one to "null" and one to
//! "callable"; the remaining bits form a mutually exclusive group of
//! primitive tags. The array bit composes with any primitive tag to mean
//! "array of that element type"; the bare array bit means "array of
//! heterogeneous elements".
//!
//! Bit values are part of the cross-plugin wire contract and must not change.

use bitflags::bitflags;

/// Raw bit values of the tag space. These are the numbers that cross the
/// process-internal ABI; [`TypeTag`] is the typed view over them.
pub mod bits {
    /// 64-bit float
    pub const FLOAT64: u64 = 1;
    /// 32-bit float
    pub const FLOAT32: u64 = 2;
    /// Signed 8-bit integer
    pub const INT8: u64 = 4;
    /// Signed 16-bit integer
    pub const INT16: u64 = 8;
    /// Signed 32-bit integer
    pub const INT32: u64 = 16;
    /// Signed 64-bit integer
    pub const INT64: u64 = 32;
    /// Unsigned 8-bit integer
    pub const UINT8: u64 = 64;
    /// Unsigned 16-bit integer
    pub const UINT16: u64 = 128;
    /// Unsigned 32-bit integer
    pub const UINT32: u64 = 256;
    /// Unsigned 64-bit integer
    pub const UINT64: u64 = 512;
    /// Boolean
    pub const BOOL: u64 = 1 << 10;
    /// NUL-terminated UTF-8 string
    pub const STRING8: u64 = 1 << 12;
    /// NUL-terminated UTF-16 string
    pub const STRING16: u64 = 1 << 13;
    /// NUL-terminated UTF-32 string
    pub const STRING32: u64 = 1 << 14;
    /// Opaque foreign handle
    pub const HANDLE: u64 = 1 << 15;
    /// Array bit; composes with primitive tags
    pub const ARRAY: u64 = 1 << 16;
    /// Array/string size type (reserved; not constructible by the engines)
    pub const SIZE: u64 = 1 << 18;
    /// Single character, UTF-8 code units
    pub const CHAR8: u64 = 1 << 19;
    /// Single character, UTF-16 code units
    pub const CHAR16: u64 = 1 << 20;
    /// Single character, UTF-32 code unit
    pub const CHAR32: u64 = 1 << 21;
    /// Dynamic type; resolved no later than construction time
    pub const ANY: u64 = 1 << 22;
    /// Null value
    pub const NULL: u64 = 1 << 23;
    /// Cross-runtime callable
    pub const CALLABLE: u64 = 1 << 24;
}

bitflags! {
    /// Bit-field type tag of a CDT value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeTag: u64 {
        /// 64-bit float
        const FLOAT64 = bits::FLOAT64;
        /// 32-bit float
        const FLOAT32 = bits::FLOAT32;
        /// Signed 8-bit integer
        const INT8 = bits::INT8;
        /// Signed 16-bit integer
        const INT16 = bits::INT16;
        /// Signed 32-bit integer
        const INT32 = bits::INT32;
        /// Signed 64-bit integer
        const INT64 = bits::INT64;
        /// Unsigned 8-bit integer
        const UINT8 = bits::UINT8;
        /// Unsigned 16-bit integer
        const UINT16 = bits::UINT16;
        /// Unsigned 32-bit integer
        const UINT32 = bits::UINT32;
        /// Unsigned 64-bit integer
        const UINT64 = bits::UINT64;
        /// Boolean
        const BOOL = bits::BOOL;
        /// NUL-terminated UTF-8 string
        const STRING8 = bits::STRING8;
        /// NUL-terminated UTF-16 string
        const STRING16 = bits::STRING16;
        /// NUL-terminated UTF-32 string
        const STRING32 = bits::STRING32;
        /// Opaque foreign handle
        const HANDLE = bits::HANDLE;
        /// Array bit
        const ARRAY = bits::ARRAY;
        /// Size type (reserved)
        const SIZE = bits::SIZE;
        /// Single character, UTF-8
        const CHAR8 = bits::CHAR8;
        /// Single character, UTF-16
        const CHAR16 = bits::CHAR16;
        /// Single character, UTF-32
        const CHAR32 = bits::CHAR32;
        /// Dynamic type
        const ANY = bits::ANY;
        /// Null
        const NULL = bits::NULL;
        /// Cross-runtime callable
        const CALLABLE = bits::CALLABLE;
    }
}

impl TypeTag {
    /// Reinterpret raw bits as a tag, keeping bits outside the enumeration.
    ///
    /// Unknown bits are preserved so the engines can report them as
    /// [`CdtError::UnknownTag`](crate::CdtError::UnknownTag) instead of
    /// silently dropping them.
    pub fn from_raw(raw: u64) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Whether the array bit is set.
    pub fn is_array(self) -> bool {
        self.contains(TypeTag::ARRAY)
    }

    /// The tag with the array bit stripped.
    ///
    /// For the bare array tag this yields [`TypeTag::ANY`]: a heterogeneous
    /// array has no common element type.
    pub fn element_type(self) -> TypeTag {
        let elem = self.difference(TypeTag::ARRAY);
        if elem.is_empty() {
            TypeTag::ANY
        } else {
            elem
        }
    }

    /// Human-readable name of the tag, `"unknown"` for anything outside the
    /// enumeration.
    pub fn name(self) -> &'static str {
        const NAMES: &[(TypeTag, &str)] = &[
            (TypeTag::FLOAT64, "float64"),
            (TypeTag::FLOAT32, "float32"),
            (TypeTag::INT8, "int8"),
            (TypeTag::INT16, "int16"),
            (TypeTag::INT32, "int32"),
            (TypeTag::INT64, "int64"),
            (TypeTag::UINT8, "uint8"),
            (TypeTag::UINT16, "uint16"),
            (TypeTag::UINT32, "uint32"),
            (TypeTag::UINT64, "uint64"),
            (TypeTag::BOOL, "bool"),
            (TypeTag::CHAR8, "char8"),
            (TypeTag::CHAR16, "char16"),
            (TypeTag::CHAR32, "char32"),
            (TypeTag::STRING8, "string8"),
            (TypeTag::STRING16, "string16"),
            (TypeTag::STRING32, "string32"),
            (TypeTag::HANDLE, "handle"),
            (TypeTag::ARRAY, "array"),
            (TypeTag::SIZE, "size"),
            (TypeTag::ANY, "any"),
            (TypeTag::NULL, "null"),
            (TypeTag::CALLABLE, "callable"),
        ];
        const ARRAY_NAMES: &[(TypeTag, &str)] = &[
            (TypeTag::FLOAT64, "float64_array"),
            (TypeTag::FLOAT32, "float32_array"),
            (TypeTag::INT8, "int8_array"),
            (TypeTag::INT16, "int16_array"),
            (TypeTag::INT32, "int32_array"),
            (TypeTag::INT64, "int64_array"),
            (TypeTag::UINT8, "uint8_array"),
            (TypeTag::UINT16, "uint16_array"),
            (TypeTag::UINT32, "uint32_array"),
            (TypeTag::UINT64, "uint64_array"),
            (TypeTag::BOOL, "bool_array"),
            (TypeTag::CHAR8, "char8_array"),
            (TypeTag::STRING8, "string8_array"),
            (TypeTag::STRING16, "string16_array"),
            (TypeTag::STRING32, "string32_array"),
            (TypeTag::HANDLE, "handle_array"),
            (TypeTag::ANY, "any_array"),
            (TypeTag::SIZE, "size_array"),
        ];

        if self.is_array() && self != TypeTag::ARRAY {
            let elem = self.element_type();
            for (tag, name) in ARRAY_NAMES {
                if *tag == elem {
                    return name;
                }
            }
            return "unknown";
        }
        for (tag, name) in NAMES {
            if *tag == self {
                return name;
            }
        }
        "unknown"
    }
}

/// Depth of an array's regular nesting.
///
/// The depth counts dimensions, not lengths: ragged arrays still have a fixed
/// dimension count as long as every root-to-leaf path crosses the same number
/// of array wrappings. `{ {1}, {2,3,4}, {5,6,7,8} }` is `Fixed(2)`.
///
/// At the C boundary this is an `i64` with `-1` meaning mixed/unknown; inside
/// the domain layer the sentinel is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensions {
    /// Every path from root to leaf crosses exactly this many array levels.
    /// Never zero: a scalar is not a 0-dimensional array.
    Fixed(u64),
    /// Paths have differing depths, or array and non-array leaves are mixed.
    MixedOrUnknown,
}

impl Dimensions {
    /// Raw ABI encoding of [`Dimensions::MixedOrUnknown`].
    pub const MIXED_RAW: i64 = -1;

    /// Encode for the C boundary.
    pub fn to_raw(self) -> i64 {
        match self {
            Dimensions::Fixed(n) => n as i64,
            Dimensions::MixedOrUnknown => Self::MIXED_RAW,
        }
    }

    /// Decode from the C boundary. Anything below 1 is mixed/unknown.
    pub fn from_raw(raw: i64) -> Self {
        if raw >= 1 {
            Dimensions::Fixed(raw as u64)
        } else {
            Dimensions::MixedOrUnknown
        }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Dimensions::Fixed(1)
    }
}

/// Type description returned by a construct source for one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Concrete tag of the position. `ANY` here is an error.
    pub tag: TypeTag,
    /// Optional source-language alias of the type (e.g. a class name).
    pub alias: Option<String>,
    /// Array nesting depth declared for this position.
    pub dimensions: Dimensions,
}

impl TypeInfo {
    /// Type info with no alias and the default 1-D depth.
    pub fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            alias: None,
            dimensions: Dimensions::default(),
        }
    }

    /// Type info for an array position with a known nesting depth.
    pub fn with_dimensions(tag: TypeTag, dimensions: Dimensions) -> Self {
        Self {
            tag,
            alias: None,
            dimensions,
        }
    }
}
