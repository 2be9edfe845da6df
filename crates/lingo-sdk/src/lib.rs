//! Lingo SDK - host-adapter interfaces over the CDTS engines
//!
//! This crate provides what a host runtime binding builds on top of
//! `lingo-core`:
//! - [`HostObjects`]: the registration surface for wrapping foreign handles
//!   into host-managed objects and unwrapping them back
//! - [`CdtsView`]: typed, checked read access into a CDTS
//! - [`record`]: a traversal recorder and a construct source replaying a
//!   recording, the round-trip harness used across the workspace tests

#![warn(missing_docs)]

pub mod host;
pub mod record;
pub mod view;

pub use host::{HostObjects, Imported};
pub use record::{RecordedCall, RecordedValue, Recording, ReplaySource};
pub use view::CdtsView;
