use crate::config::RuntimeFunctions;
use crate::debugger::variable::value::ScalarKind;
use itertools::Itertools;
use regex::{Captures, Regex};
use strum::IntoEnumIterator;

/// Runtime expression recognized by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Expr {
    TypeIdentity(u64),
    TextualOrIndexed { obj: u64, textual_type: u64 },
    FieldCount(u64),
    FieldName(u64, usize),
    FieldType(u64, usize),
    FieldAddress(u64, usize),
    Buffer,
    BufferSize,
    ToUtf8 { obj: u64, buffer: u64, capacity: usize },
    TypeName(u64),
    Deref(ScalarKind, u64),
}

const ADDR: &str = "(0x[0-9a-f]+)";
const NUM: &str = "([0-9]+)";

/// Matches expressions in a shape produced by [`crate::debugger::query::RuntimeApi`].
pub(super) struct ExprParser {
    type_identity: Regex,
    textual_or_indexed: Regex,
    field_count: Regex,
    field_name: Regex,
    field_type: Regex,
    field_address: Regex,
    buffer: Regex,
    buffer_size: Regex,
    to_utf8: Regex,
    type_name: Regex,
    deref: Regex,
}

fn regex(pattern: String) -> Regex {
    Regex::new(&pattern).expect("infallible: pattern built from escaped parts")
}

fn addr(captures: &Captures, group: usize) -> Option<u64> {
    u64::from_str_radix(captures.get(group)?.as_str().trim_start_matches("0x"), 16).ok()
}

fn num(captures: &Captures, group: usize) -> Option<usize> {
    captures.get(group)?.as_str().parse().ok()
}

impl ExprParser {
    pub(super) fn new(functions: &RuntimeFunctions) -> Self {
        let f = |name: &str| regex::escape(name);
        let pointer_types = ScalarKind::iter()
            .filter_map(ScalarKind::pointer_type)
            .unique()
            .map(|ptr_type| regex::escape(&ptr_type))
            .join("|");

        Self {
            type_identity: regex(format!(
                r"^\*\(void \*\*\)\(\(uintptr_t\)\(\*\(void\*\*\){ADDR}\) & ~0x3\) == "
            )),
            textual_or_indexed: regex(format!(
                r"^\(int\)\({}\({ADDR}, {ADDR}\) \? 1 : \({}\({ADDR}\) \? 2 : 0\)\)$",
                f(&functions.is_instance),
                f(&functions.is_array),
            )),
            field_count: regex(format!(r"^\(int\){}\({ADDR}\)$", f(&functions.field_count))),
            field_name: regex(format!(
                r"^\(char \*\){}\({ADDR}, \(int\){NUM}\)$",
                f(&functions.field_name)
            )),
            field_type: regex(format!(
                r"^\(int\){}\({ADDR}, {NUM}\)$",
                f(&functions.field_type)
            )),
            field_address: regex(format!(
                r"^\(void \*\){}\({ADDR}, {NUM}\)$",
                f(&functions.field_address)
            )),
            buffer: regex(format!(r"^\(void \*\){}\(\)$", f(&functions.buffer))),
            buffer_size: regex(format!(r"^\(int\){}\(\)$", f(&functions.buffer_size))),
            to_utf8: regex(format!(
                r"^\(int\){}\({ADDR}, \(void \*\){ADDR}, \(int\){NUM}\)$",
                f(&functions.object_to_utf8)
            )),
            type_name: regex(format!(r"^\(char \*\){}\({ADDR}\)$", f(&functions.type_name))),
            deref: regex(format!(
                r"^\*\(({pointer_types})\){ADDR}$"
            )),
        }
    }

    pub(super) fn parse(&self, expr: &str) -> Option<Expr> {
        if let Some(c) = self.type_identity.captures(expr) {
            return Some(Expr::TypeIdentity(addr(&c, 1)?));
        }
        if let Some(c) = self.textual_or_indexed.captures(expr) {
            return Some(Expr::TextualOrIndexed {
                obj: addr(&c, 1)?,
                textual_type: addr(&c, 2)?,
            });
        }
        if let Some(c) = self.field_count.captures(expr) {
            return Some(Expr::FieldCount(addr(&c, 1)?));
        }
        if let Some(c) = self.field_name.captures(expr) {
            return Some(Expr::FieldName(addr(&c, 1)?, num(&c, 2)?));
        }
        if let Some(c) = self.field_type.captures(expr) {
            return Some(Expr::FieldType(addr(&c, 1)?, num(&c, 2)?));
        }
        if let Some(c) = self.field_address.captures(expr) {
            return Some(Expr::FieldAddress(addr(&c, 1)?, num(&c, 2)?));
        }
        if self.buffer.is_match(expr) {
            return Some(Expr::Buffer);
        }
        if self.buffer_size.is_match(expr) {
            return Some(Expr::BufferSize);
        }
        if let Some(c) = self.to_utf8.captures(expr) {
            return Some(Expr::ToUtf8 {
                obj: addr(&c, 1)?,
                buffer: addr(&c, 2)?,
                capacity: num(&c, 3)?,
            });
        }
        if let Some(c) = self.type_name.captures(expr) {
            return Some(Expr::TypeName(addr(&c, 1)?));
        }
        if let Some(c) = self.deref.captures(expr) {
            let ptr_type = c.get(1)?.as_str();
            let kind = ScalarKind::iter()
                .find(|kind| kind.pointer_type().as_deref() == Some(ptr_type))?;
            return Some(Expr::Deref(kind, addr(&c, 2)?));
        }
        None
    }
}
