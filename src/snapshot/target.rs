use crate::config::RuntimeConfig;
use crate::debugger::address::Address;
use crate::debugger::query::{QueryError, Target, TypedResult};
use crate::debugger::variable::value::ScalarKind;
use crate::snapshot::expr::{Expr, ExprParser};
use crate::snapshot::{Snapshot, TypeKind};
use std::cell::{Cell, RefCell};

/// [`Target`] implementation over a [`Snapshot`].
///
/// Keeps the runtime scratch buffer and counts remote round trips
/// (expression evaluations and memory reads).
pub struct SnapshotTarget {
    snapshot: Snapshot,
    parser: ExprParser,
    buffer: RefCell<Vec<u8>>,
    max_children: Cell<Option<usize>>,
    round_trips: Cell<usize>,
    expressions: RefCell<Vec<String>>,
}

impl SnapshotTarget {
    pub fn new(snapshot: Snapshot, config: &RuntimeConfig) -> Self {
        let max_children = snapshot.max_children;
        Self {
            parser: ExprParser::new(&config.functions),
            buffer: RefCell::default(),
            max_children: Cell::new(Some(max_children)),
            round_trips: Cell::new(0),
            expressions: RefCell::default(),
            snapshot,
        }
    }

    /// Change display cap, [`None`] makes the setting unavailable.
    pub fn set_max_children(&self, max_children: Option<usize>) {
        self.max_children.set(max_children);
    }

    /// Number of remote round trips made so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.get()
    }

    /// Evaluated expressions in evaluation order.
    pub fn expressions(&self) -> Vec<String> {
        self.expressions.borrow().clone()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn word(&self, addr: u64) -> Result<u64, QueryError> {
        self.snapshot
            .word(addr)
            .ok_or(QueryError::UnreadableMemory(Address::from(addr)))
    }

    fn eval(&self, expr: &str) -> Result<TypedResult, QueryError> {
        let unknown = |what: &str| QueryError::Evaluation(expr.to_string(), what.to_string());
        let parsed = self.parser.parse(expr).ok_or_else(|| unknown("unsupported expression"))?;

        let snapshot = &self.snapshot;
        let object = |addr: u64| snapshot.object(addr).ok_or_else(|| unknown("not an object"));
        let int = |value: usize| {
            i32::try_from(value)
                .map(TypedResult::from_int)
                .map_err(|_| unknown("result overflows int"))
        };
        let field = |addr: u64, index: usize| {
            object(addr)?
                .field(index)
                .ok_or_else(|| unknown("field index out of bounds"))
        };

        let result = match parsed {
            Expr::TypeIdentity(obj) => {
                let header = Address::from(self.word(obj)?).untagged().as_u64();
                let candidate = self.word(header)?;
                let check = self.word(candidate)?;
                let identity = if candidate == check { candidate } else { 0 };
                TypedResult::from_pointer(Address::from(identity))
            }
            Expr::TextualOrIndexed { obj, textual_type } => {
                let obj = object(obj)?;
                let soa = if textual_type != 0 && obj.type_address == textual_type {
                    1
                } else if snapshot.type_of(obj).map(|ty| ty.kind) == Some(TypeKind::Indexed) {
                    2
                } else {
                    0
                };
                TypedResult::from_int(soa)
            }
            Expr::FieldCount(obj) => int(object(obj)?.fields.len())?,
            Expr::FieldName(obj, index) => {
                TypedResult::from_pointer(Address::from(field(obj, index)?.name_address))
            }
            Expr::FieldType(obj, index) => {
                TypedResult::from_int(field(obj, index)?.kind.tag() as i32)
            }
            Expr::FieldAddress(obj, index) => {
                field(obj, index)?;
                TypedResult::from_pointer(Address::from(Snapshot::field_address(obj, index)))
            }
            Expr::Buffer => TypedResult::from_pointer(Address::from(snapshot.buffer_address)),
            Expr::BufferSize => int(snapshot.buffer_capacity)?,
            Expr::ToUtf8 {
                obj,
                buffer,
                capacity,
            } => {
                if buffer != snapshot.buffer_address {
                    return Err(unknown("not a scratch buffer"));
                }
                let obj = object(obj)?;
                let is_textual = snapshot.type_of(obj).map(|ty| ty.kind) == Some(TypeKind::Textual);
                let written = match obj.text {
                    Some(ref text) if is_textual => {
                        let len = text.len().min(capacity).min(snapshot.buffer_capacity);
                        let mut buf = self.buffer.borrow_mut();
                        buf.clear();
                        buf.extend_from_slice(&text.as_bytes()[..len]);
                        len
                    }
                    _ => 0,
                };
                int(written)?
            }
            Expr::TypeName(obj) => {
                let ty = snapshot
                    .type_of(object(obj)?)
                    .ok_or_else(|| unknown("unknown type"))?;
                TypedResult::from_pointer(Address::from(ty.name_address))
            }
            Expr::Deref(kind, addr) => {
                let bytes = self.word(addr)?.to_le_bytes();
                let width = match kind {
                    ScalarKind::Unrepresentable => return Err(unknown("unsized read")),
                    kind => kind.size_in_bytes(),
                };
                TypedResult::new(bytes[..width].to_vec())
            }
        };
        Ok(result)
    }
}

impl Target for SnapshotTarget {
    fn evaluate(&self, expr: &str) -> Result<TypedResult, QueryError> {
        self.round_trips.set(self.round_trips.get() + 1);
        self.expressions.borrow_mut().push(expr.to_string());
        self.eval(expr)
    }

    fn read_c_string(&self, addr: Address, max_len: usize) -> Result<Vec<u8>, QueryError> {
        self.round_trips.set(self.round_trips.get() + 1);

        let addr = addr.as_u64();
        let bytes = if addr == self.snapshot.buffer_address {
            self.buffer.borrow().clone()
        } else {
            self.snapshot
                .strings
                .get(&addr)
                .cloned()
                .ok_or(QueryError::UnreadableMemory(Address::from(addr)))?
        };

        Ok(bytes
            .into_iter()
            .take_while(|&b| b != 0)
            .take(max_len)
            .collect())
    }

    fn symbol_address(&self, name: &str) -> Result<Option<Address>, QueryError> {
        Ok(self.snapshot.symbols.get(name).copied().map(Address::from))
    }

    fn max_children_count(&self) -> Result<usize, QueryError> {
        self.max_children
            .get()
            .ok_or(QueryError::Setting("target.max-children-count"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const HEAP: &str = r#"
[runtime]
buffer_capacity = 4

[[types]]
address = 0x1000
name = "kotlin.String"
symbol = "kclass:kotlin.String"
kind = "textual"

[[objects]]
address = 0x2000
type = 0x1000
text = "truncated"
"#;

    #[test]
    fn test_scratch_buffer_is_bounded() {
        let cfg = RuntimeConfig::default();
        let target = Snapshot::from_toml(HEAP).unwrap().into_target(&cfg);

        let written = target
            .evaluate("(int)Konan_DebugObjectToUtf8Array(0x2000, (void *)0x7f000000, (int)4)")
            .unwrap();
        assert_eq!(written.signed(), 4);
        assert_eq!(
            target
                .read_c_string(Address::from(0x7f00_0000_u64), 16)
                .unwrap(),
            b"trun"
        );
        assert_eq!(target.round_trips(), 2);
    }

    #[test]
    fn test_unsupported_expression() {
        let cfg = RuntimeConfig::default();
        let target = Snapshot::from_toml(HEAP).unwrap().into_target(&cfg);

        assert!(matches!(
            target.evaluate("1 + 1"),
            Err(QueryError::Evaluation(_, _))
        ));
        assert!(matches!(
            target.evaluate("*(int32_t *)0x9000"),
            Err(QueryError::UnreadableMemory(_))
        ));

        target.set_max_children(None);
        assert!(target.max_children_count().is_err());
    }

    #[test]
    fn test_buffer_capacity_overflow() {
        let cfg = RuntimeConfig::default();
        let data = HEAP.replace("buffer_capacity = 4", "buffer_capacity = 0x100000000");
        let target = Snapshot::from_toml(&data).unwrap().into_target(&cfg);

        assert!(matches!(
            target.evaluate("(int)Konan_DebugBufferSize()"),
            Err(QueryError::Evaluation(_, _))
        ));
        assert_eq!(
            crate::debugger::summary(
                &target,
                &cfg,
                crate::debugger::ObjectHandle::object(0x2000_u64)
            )
            .unwrap(),
            "0x0000000000002000"
        );
    }
}
