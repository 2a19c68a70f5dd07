//! Remote query facade.
//!
//! All knowledge about the debugee runtime goes through expressions evaluated by a host debugger.
//! [`Target`] is the host boundary, [`RuntimeApi`] formats one expression per logical runtime
//! operation and decodes its result.

use crate::config::RuntimeConfig;
use crate::debugger::address::Address;
use crate::debugger::variable::value::{ScalarKind, SupportedScalar};
use bytes::Bytes;
use log::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid result of expression `{0}`")]
    Invalid(String),
    #[error("expression `{0}` evaluation error: {1}")]
    Evaluation(String, String),
    #[error("memory at {0} is unreadable")]
    UnreadableMemory(Address),
    #[error("debugee process is not stopped")]
    ProcessNotStopped,
    #[error("host setting `{0}` unavailable")]
    Setting(&'static str),
}

/// Result of a remote expression evaluation: raw bytes of a typed scalar or pointer value.
/// Bytes are in little-endian order, width is a width of the expression type.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TypedResult {
    raw: Bytes,
}

impl TypedResult {
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self { raw: raw.into() }
    }

    /// Result of an expression that the host debugger was unable to evaluate.
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn from_pointer(addr: Address) -> Self {
        Self::new(addr.as_u64().to_le_bytes().to_vec())
    }

    pub fn from_int(val: i32) -> Self {
        Self::new(val.to_le_bytes().to_vec())
    }

    pub fn is_valid(&self) -> bool {
        !self.raw.is_empty()
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn unsigned(&self) -> u64 {
        let mut bytes = [0u8; 8];
        let len = self.raw.len().min(8);
        bytes[..len].copy_from_slice(&self.raw[..len]);
        u64::from_le_bytes(bytes)
    }

    /// Value sign-extended from its own width.
    pub fn signed(&self) -> i64 {
        let width = self.raw.len().min(8);
        if width == 0 {
            return 0;
        }
        let shift = 64 - width as u32 * 8;
        ((self.unsigned() << shift) as i64) >> shift
    }

    pub fn floating(&self) -> f64 {
        match self.raw.len() {
            4 => f32::from_bits(self.unsigned() as u32) as f64,
            _ => f64::from_bits(self.unsigned()),
        }
    }

    pub fn as_address(&self) -> Address {
        Address::from(self.unsigned())
    }
}

/// Host debugger boundary. Every call is a blocking round trip to the debugee.
pub trait Target {
    /// Evaluate an expression against the stopped debugee.
    fn evaluate(&self, expr: &str) -> Result<TypedResult, QueryError>;

    /// Read a C-style string (at most `max_len` bytes, without the terminating zero).
    fn read_c_string(&self, addr: Address, max_len: usize) -> Result<Vec<u8>, QueryError>;

    /// Return load address of a symbol from a debugee module.
    fn symbol_address(&self, name: &str) -> Result<Option<Address>, QueryError>;

    /// Currently configured maximum number of children to render.
    fn max_children_count(&self) -> Result<usize, QueryError>;
}

/// Logical operations of the debugee runtime, one remote round trip per call.
pub struct RuntimeApi<'a> {
    target: &'a dyn Target,
    config: &'a RuntimeConfig,
}

impl<'a> RuntimeApi<'a> {
    pub fn new(target: &'a dyn Target, config: &'a RuntimeConfig) -> Self {
        Self { target, config }
    }

    fn evaluate(&self, expr: String) -> Result<TypedResult, QueryError> {
        let result = self.target.evaluate(&expr);
        debug!(target: "query", "evaluate: {expr} => {result:?}");
        match result? {
            result if result.is_valid() => Ok(result),
            _ => Err(QueryError::Invalid(expr)),
        }
    }

    fn read_string(&self, expr: String) -> Result<String, QueryError> {
        let addr = self.evaluate(expr)?.as_address();
        let bytes = self.target.read_c_string(addr, self.config.c_string_max_len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Type descriptor candidate for an object: the header word (without tag bits) is followed
    /// to its first word, the candidate is accepted only if its own first word points back to it.
    /// Return [`Address::NULL`] if the check fails.
    pub fn type_identity(&self, obj: Address) -> Result<Address, QueryError> {
        let header = format!("((uintptr_t)(*(void**){:#x}) & ~0x3)", obj.as_u64());
        let expr = format!(
            "*(void **){header} == **(void***){header} ? *(void **){header} : (void *)0"
        );
        Ok(self.evaluate(expr)?.as_address())
    }

    /// Combined predicate: 1 for textual object, 2 for indexed collection, 0 otherwise.
    pub fn textual_or_indexed(&self, obj: Address, textual_type: Address) -> Result<u64, QueryError> {
        let functions = &self.config.functions;
        let expr = format!(
            "(int)({is_instance}({obj:#x}, {textual:#x}) ? 1 : ({is_array}({obj:#x}) ? 2 : 0))",
            is_instance = functions.is_instance,
            is_array = functions.is_array,
            obj = obj.as_u64(),
            textual = textual_type.as_u64(),
        );
        Ok(self.evaluate(expr)?.unsigned())
    }

    pub fn field_count(&self, obj: Address) -> Result<usize, QueryError> {
        let expr = format!(
            "(int){}({:#x})",
            self.config.functions.field_count,
            obj.as_u64()
        );
        Ok(self.evaluate(expr)?.signed().max(0) as usize)
    }

    pub fn field_name(&self, obj: Address, index: usize) -> Result<String, QueryError> {
        self.read_string(format!(
            "(char *){}({:#x}, (int){index})",
            self.config.functions.field_name,
            obj.as_u64()
        ))
    }

    pub fn field_kind(&self, obj: Address, index: usize) -> Result<ScalarKind, QueryError> {
        let expr = format!(
            "(int){}({:#x}, {index})",
            self.config.functions.field_type,
            obj.as_u64()
        );
        Ok(ScalarKind::from_tag(self.evaluate(expr)?.unsigned()))
    }

    pub fn field_address(&self, obj: Address, index: usize) -> Result<Address, QueryError> {
        let expr = format!(
            "(void *){}({:#x}, {index})",
            self.config.functions.field_address,
            obj.as_u64()
        );
        Ok(self.evaluate(expr)?.as_address())
    }

    pub fn scratch_buffer(&self) -> Result<Address, QueryError> {
        let expr = format!("(void *){}()", self.config.functions.buffer);
        Ok(self.evaluate(expr)?.as_address())
    }

    pub fn scratch_buffer_capacity(&self) -> Result<usize, QueryError> {
        let expr = format!("(int){}()", self.config.functions.buffer_size);
        Ok(self.evaluate(expr)?.signed().max(0) as usize)
    }

    /// Ask the runtime to encode textual content of an object into a buffer.
    /// Return written byte length, 0 if object has no textual content.
    pub fn encode_utf8(
        &self,
        obj: Address,
        buffer: Address,
        capacity: usize,
    ) -> Result<usize, QueryError> {
        let expr = format!(
            "(int){}({:#x}, (void *){:#x}, (int){capacity})",
            self.config.functions.object_to_utf8,
            obj.as_u64(),
            buffer.as_u64()
        );
        Ok(self.evaluate(expr)?.signed().max(0) as usize)
    }

    /// Copy `len` bytes out of a scratch buffer.
    pub fn read_buffer(&self, buffer: Address, len: usize) -> Result<Vec<u8>, QueryError> {
        self.target.read_c_string(buffer, len)
    }

    pub fn type_name(&self, obj: Address) -> Result<String, QueryError> {
        self.read_string(format!(
            "(char *){}({:#x})",
            self.config.functions.type_name,
            obj.as_u64()
        ))
    }

    /// Read a value of `kind` at `addr`. Return [`None`] for unrepresentable values.
    pub fn read_scalar(
        &self,
        kind: ScalarKind,
        addr: Address,
    ) -> Result<Option<SupportedScalar>, QueryError> {
        let Some(ptr_type) = kind.pointer_type() else {
            return Ok(None);
        };
        let result = self.evaluate(format!("*({ptr_type}){:#x}", addr.as_u64()))?;

        let scalar = match kind {
            ScalarKind::Reference | ScalarKind::ReferenceOrVoidPointer => {
                SupportedScalar::Pointer(result.as_address())
            }
            ScalarKind::Int8 => SupportedScalar::I8(result.signed() as i8),
            ScalarKind::Int16 => SupportedScalar::I16(result.signed() as i16),
            ScalarKind::Int32 => SupportedScalar::I32(result.signed() as i32),
            ScalarKind::Int64 => SupportedScalar::I64(result.signed()),
            ScalarKind::Float32 => SupportedScalar::F32(result.floating() as f32),
            ScalarKind::Float64 => SupportedScalar::F64(result.floating()),
            ScalarKind::Bool => SupportedScalar::Bool(result.unsigned() != 0),
            ScalarKind::Unrepresentable => return Ok(None),
        };
        Ok(Some(scalar))
    }

    pub fn textual_type_descriptor(&self) -> Result<Option<Address>, QueryError> {
        let addr = self.target.symbol_address(&self.config.textual_type_symbol)?;
        debug!(target: "query", "symbol `{}` => {addr:?}", self.config.textual_type_symbol);
        Ok(addr)
    }

    pub fn max_children_count(&self) -> Result<usize, QueryError> {
        self.target.max_children_count()
    }
}
