//! Cross-runtime callable descriptors.

use crate::tags::TypeTag;
use crate::xcall::XCall;

/// A callable crossing a runtime boundary: the xcall pointer pair plus the
/// declared parameter and return types.
///
/// Not `Clone`: the descriptor travels like a handle, by move, and transport
/// copies are minted explicitly where a boundary needs one.
#[derive(Debug, PartialEq, Eq)]
pub struct Callable {
    xcall: XCall,
    param_types: Vec<TypeTag>,
    ret_types: Vec<TypeTag>,
}

impl Callable {
    /// Build a descriptor.
    pub fn new(xcall: XCall, param_types: Vec<TypeTag>, ret_types: Vec<TypeTag>) -> Self {
        Callable {
            xcall,
            param_types,
            ret_types,
        }
    }

    /// The dispatchable entry pair.
    pub fn xcall(&self) -> XCall {
        self.xcall
    }

    /// Declared parameter types, in call order.
    pub fn param_types(&self) -> &[TypeTag] {
        &self.param_types
    }

    /// Declared return types, in call order.
    pub fn ret_types(&self) -> &[TypeTag] {
        &self.ret_types
    }

    /// A copy for passing the descriptor through a call boundary.
    pub fn transport_copy(&self) -> Callable {
        Callable {
            xcall: self.xcall,
            param_types: self.param_types.clone(),
            ret_types: self.ret_types.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;

    #[test]
    fn test_callable_descriptor_accessors() {
        let c = Callable::new(
            XCall::new(0x2 as *const c_void, std::ptr::null_mut()),
            vec![TypeTag::INT8, TypeTag::INT16],
            vec![TypeTag::FLOAT32],
        );
        assert!(c.xcall().is_valid());
        assert_eq!(c.param_types(), &[TypeTag::INT8, TypeTag::INT16]);
        assert_eq!(c.ret_types(), &[TypeTag::FLOAT32]);
        assert_eq!(c.transport_copy(), c);
    }
}
