use crate::debugger::address::Address;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumIter, FromRepr};

/// Kind of a field value as reported by the runtime (one small integer tag per field).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, FromRepr, EnumIter, StrumDisplay, Deserialize,
)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Unrepresentable = 0,
    Reference = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Float32 = 6,
    Float64 = 7,
    ReferenceOrVoidPointer = 8,
    Bool = 9,
}

impl ScalarKind {
    /// Map a runtime tag into a kind, unknown tags are unrepresentable.
    pub fn from_tag(tag: u64) -> Self {
        u8::try_from(tag)
            .ok()
            .and_then(ScalarKind::from_repr)
            .unwrap_or(ScalarKind::Unrepresentable)
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// C type used to read a value of this kind from debugee memory.
    pub fn c_type(self) -> Option<&'static str> {
        let c_type = match self {
            ScalarKind::Reference | ScalarKind::ReferenceOrVoidPointer => "void *",
            ScalarKind::Int8 => "int8_t",
            ScalarKind::Int16 => "int16_t",
            ScalarKind::Int32 => "int32_t",
            ScalarKind::Int64 => "int64_t",
            ScalarKind::Float32 => "float",
            ScalarKind::Float64 => "double",
            ScalarKind::Bool => "bool",
            ScalarKind::Unrepresentable => return None,
        };
        Some(c_type)
    }

    /// Pointer type used to dereference a value of this kind, e.g. `int32_t *`.
    pub fn pointer_type(self) -> Option<String> {
        let c_type = self.c_type()?;
        if c_type.ends_with('*') {
            Some(format!("{c_type}*"))
        } else {
            Some(format!("{c_type} *"))
        }
    }

    /// Size in bytes of a value of this kind.
    pub fn size_in_bytes(self) -> usize {
        match self {
            ScalarKind::Int8 | ScalarKind::Bool => 1,
            ScalarKind::Int16 => 2,
            ScalarKind::Int32 | ScalarKind::Float32 => 4,
            ScalarKind::Int64
            | ScalarKind::Float64
            | ScalarKind::Reference
            | ScalarKind::ReferenceOrVoidPointer => 8,
            ScalarKind::Unrepresentable => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SupportedScalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Pointer(Address),
}

impl Display for SupportedScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SupportedScalar::I8(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::I16(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::I32(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::I64(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::F32(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::F64(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::Bool(scalar) => f.write_str(&format!("{scalar}")),
            SupportedScalar::Pointer(addr) => f.write_str(&format!("{addr}")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(ScalarKind::from_tag(1), ScalarKind::Reference);
        assert_eq!(ScalarKind::from_tag(4), ScalarKind::Int32);
        assert_eq!(ScalarKind::from_tag(9), ScalarKind::Bool);
        assert_eq!(ScalarKind::from_tag(0), ScalarKind::Unrepresentable);
        assert_eq!(ScalarKind::from_tag(10), ScalarKind::Unrepresentable);
        assert_eq!(ScalarKind::from_tag(u64::MAX), ScalarKind::Unrepresentable);
    }

    #[test]
    fn test_kind_tag_roundtrip() {
        for tag in 0..=9_u8 {
            assert_eq!(ScalarKind::from_tag(tag as u64).tag(), tag);
        }
        assert_eq!(ScalarKind::Float64.to_string(), "float64");
        assert_eq!(ScalarKind::Unrepresentable.c_type(), None);
    }

    #[test]
    fn test_pointer_types() {
        use strum::IntoEnumIterator;

        assert_eq!(ScalarKind::Int32.pointer_type().as_deref(), Some("int32_t *"));
        assert_eq!(ScalarKind::Reference.pointer_type().as_deref(), Some("void **"));
        assert_eq!(ScalarKind::Unrepresentable.pointer_type(), None);

        let readable = ScalarKind::iter()
            .filter(|kind| kind.pointer_type().is_some())
            .count();
        assert_eq!(readable, 9);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(SupportedScalar::I32(7).to_string(), "7");
        assert_eq!(SupportedScalar::I8(-1).to_string(), "-1");
        assert_eq!(SupportedScalar::F64(1.5).to_string(), "1.5");
        assert_eq!(SupportedScalar::Bool(true).to_string(), "true");
        assert_eq!(
            SupportedScalar::Pointer(Address::from(0x10_u64)).to_string(),
            "0x0000000000000010"
        );
    }
}
