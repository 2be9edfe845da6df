//! Lingo core runtime
//!
//! This crate provides the Common Data Types System (CDTS) that carries
//! arguments and return values between host language runtimes, including:
//! - Type-tag taxonomy and character encoding conversions
//! - The tagged value tree ([`Cdt`]/[`Cdts`]) with explicit ownership
//! - The traverse engine (project a tree into a host representation)
//! - The construct engine (populate a tree from a host representation)
//! - Representation switching (boxed object <-> primitive)
//! - The foreign-handle protocol and xcall descriptors
//! - Process-wide allocator hooks
//!
//! A CDTS tree lives in-process and is passed by pointer between shared
//! libraries cooperating in a single address space. This crate is the
//! domain layer; the stable C surface lives in `lingo-ffi`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod alloc;
pub mod callable;
pub mod cdt;
pub mod chars;
pub mod construct;
pub mod handle;
pub mod switch;
pub mod tags;
pub mod traverse;
pub mod xcall;

pub use callable::Callable;
pub use cdt::{Cdt, CdtValue, Cdts};
pub use chars::{Char16, Char32, Char8};
pub use construct::{construct_cdt, construct_cdts, ArrayMetadata, ConstructSource};
pub use handle::{Handle, Releaser};
pub use switch::{switch_to_object, switch_to_primitive, BoxingHost, Unboxed};
pub use tags::{Dimensions, TypeInfo, TypeTag};
pub use traverse::{traverse_cdt, traverse_cdts, ArrayVisit, TraverseVisitor};
pub use xcall::XCall;

/// Errors surfaced by the CDTS engines and the handle protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CdtError {
    /// A concrete type tag was required but `any` was found.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// Declared types disagree with the types expected at a boundary.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// A tag value outside the known enumeration.
    #[error("unknown type tag: {0:#x}")]
    UnknownTag(u64),

    /// Ill-formed UTF-8/16/32 during a character conversion.
    #[error("ill-formed {0} sequence")]
    InvalidEncoding(&'static str),

    /// Allocation failure; the partial tree has been torn down.
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(u64),

    /// A fast-path callback produced a length differing from the declared one.
    #[error("array shape mismatch: declared {declared} elements, produced {produced}")]
    ArrayShapeMismatch {
        /// Length reported by `array_metadata`
        declared: u64,
        /// Length observed after the fast-path callback returned
        produced: u64,
    },

    /// A host callback signaled failure through its error side channel.
    #[error("{0}")]
    ForeignError(String),

    /// A handle's releaser contract was violated.
    #[error("handle protocol violation: {0}")]
    HandleProtocolViolation(String),
}

/// Result type used throughout the CDTS engines.
pub type CdtResult<T> = Result<T, CdtError>;
