use crate::debugger::address::Address;
use std::fmt::{Display, Formatter};

pub mod accessor;
pub mod provider;
pub mod render;
pub mod value;

/// Compile-time type of a handle as known to the host debugger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StaticType {
    /// Generic reference to a runtime object (object header pointer).
    ObjectRef,
    /// Anything else, value is a raw scalar.
    Primitive,
}

/// Pointer-valued token referring to a location in debugee memory.
/// Valid only for the duration of a single render request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    pub address: Address,
    pub static_type: StaticType,
}

impl ObjectHandle {
    pub fn object(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            static_type: StaticType::ObjectRef,
        }
    }

    pub fn primitive(value: u64) -> Self {
        Self {
            address: Address::from(value),
            static_type: StaticType::Primitive,
        }
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    pub fn is_object(&self) -> bool {
        self.static_type == StaticType::ObjectRef
    }

    /// Native representation of a handle value, used when nothing better is known.
    pub fn raw_repr(&self) -> String {
        match self.static_type {
            StaticType::ObjectRef => self.address.to_string(),
            StaticType::Primitive => self.address.as_u64().to_string(),
        }
    }
}

impl Display for ObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw_repr())
    }
}
