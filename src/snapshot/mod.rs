//! Offline debugee: a heap snapshot described in toml.
//!
//! A snapshot lays out type descriptors, object headers, fields and strings into a word-addressed
//! memory image and answers runtime introspection expressions against this image.
//! It is used as a render backend for stored heaps and as a test inferior.

mod expr;
mod target;

pub use target::SnapshotTarget;

use crate::config::RuntimeConfig;
use crate::debugger::error::Error;
use crate::debugger::variable::value::ScalarKind;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::read_to_string;

const DEFAULT_BUFFER_ADDRESS: u64 = 0x7f00_0000;
const DEFAULT_BUFFER_CAPACITY: usize = 0x1000;
const DEFAULT_MAX_CHILDREN: usize = 256;
const STRING_AREA: u64 = 0x6000_0000;
const UNMAPPED_AREA: u64 = 0xdead_0000;
const WORD_SIZE: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Textual,
    Indexed,
    #[default]
    Composite,
}

#[derive(Debug, Deserialize)]
struct RuntimeSection {
    #[serde(default = "default_buffer_address")]
    buffer_address: u64,
    #[serde(default = "default_buffer_capacity")]
    buffer_capacity: usize,
    #[serde(default = "default_max_children")]
    max_children: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            buffer_address: DEFAULT_BUFFER_ADDRESS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_children: DEFAULT_MAX_CHILDREN,
        }
    }
}

fn default_buffer_address() -> u64 {
    DEFAULT_BUFFER_ADDRESS
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_max_children() -> usize {
    DEFAULT_MAX_CHILDREN
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TypeDecl {
    address: u64,
    name: String,
    symbol: Option<String>,
    #[serde(default)]
    kind: TypeKind,
    /// Broken descriptors are not self-referential.
    #[serde(default = "default_true")]
    self_referential: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Int(0)
    }
}

impl FieldValue {
    fn encode(self, kind: ScalarKind) -> u64 {
        let as_int = match self {
            FieldValue::Bool(b) => b as i64,
            FieldValue::Int(i) => i,
            FieldValue::Float(f) => f as i64,
        };
        let as_float = match self {
            FieldValue::Bool(b) => b as i64 as f64,
            FieldValue::Int(i) => i as f64,
            FieldValue::Float(f) => f,
        };

        match kind {
            ScalarKind::Float32 => (as_float as f32).to_bits() as u64,
            ScalarKind::Float64 => as_float.to_bits(),
            ScalarKind::Bool => (as_int != 0) as u64,
            ScalarKind::Unrepresentable => 0,
            _ => as_int as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    name: Option<String>,
    kind: ScalarKind,
    #[serde(default)]
    value: FieldValue,
}

#[derive(Debug, Deserialize)]
struct ObjectDecl {
    address: u64,
    #[serde(rename = "type")]
    type_address: u64,
    #[serde(default)]
    header_tag: u64,
    /// Header points to a meta-object whose first word is a type descriptor.
    meta: Option<u64>,
    text: Option<String>,
    #[serde(default, alias = "elements")]
    fields: Vec<FieldDecl>,
    #[serde(default)]
    unreadable_names: bool,
}

#[derive(Debug, Deserialize)]
struct SnapshotDecl {
    #[serde(default)]
    runtime: RuntimeSection,
    #[serde(default)]
    types: Vec<TypeDecl>,
    #[serde(default)]
    objects: Vec<ObjectDecl>,
}

#[derive(Debug, Clone)]
struct TypeLayout {
    kind: TypeKind,
    name_address: u64,
}

#[derive(Debug, Clone)]
struct FieldLayout {
    name_address: u64,
    kind: ScalarKind,
}

#[derive(Debug, Clone)]
struct ObjectLayout {
    type_address: u64,
    text: Option<String>,
    fields: Vec<FieldLayout>,
}

impl ObjectLayout {
    fn field(&self, index: usize) -> Option<&FieldLayout> {
        self.fields.get(index)
    }
}

/// Memory image of a debugee heap.
#[derive(Debug, Clone)]
pub struct Snapshot {
    words: HashMap<u64, u64>,
    strings: HashMap<u64, Vec<u8>>,
    types: IndexMap<u64, TypeLayout>,
    objects: IndexMap<u64, ObjectLayout>,
    symbols: HashMap<String, u64>,
    buffer_address: u64,
    buffer_capacity: usize,
    max_children: usize,
}

impl Snapshot {
    pub fn from_file(path: &str) -> Result<Self, Error> {
        Self::from_toml(&read_to_string(path)?)
    }

    pub fn from_toml(data: &str) -> Result<Self, Error> {
        let decl: SnapshotDecl = toml::de::from_str(data)?;
        Ok(Self::layout(decl))
    }

    fn layout(decl: SnapshotDecl) -> Self {
        let mut snapshot = Snapshot {
            words: HashMap::new(),
            strings: HashMap::new(),
            types: IndexMap::new(),
            objects: IndexMap::new(),
            symbols: HashMap::new(),
            buffer_address: decl.runtime.buffer_address,
            buffer_capacity: decl.runtime.buffer_capacity,
            max_children: decl.runtime.max_children,
        };
        let mut next_string = STRING_AREA;

        let mut alloc_string = |strings: &mut HashMap<u64, Vec<u8>>, s: &str| {
            let addr = next_string;
            strings.insert(addr, s.as_bytes().to_vec());
            next_string += (s.len() as u64 + 1).div_ceil(WORD_SIZE) * WORD_SIZE;
            addr
        };

        for ty in decl.types {
            if ty.self_referential {
                snapshot.words.insert(ty.address, ty.address);
            } else {
                // first word points to a word that doesn't point back
                snapshot.words.insert(ty.address, ty.address + WORD_SIZE);
                snapshot.words.insert(ty.address + WORD_SIZE, 0);
            }
            if let Some(symbol) = ty.symbol {
                snapshot.symbols.insert(symbol, ty.address);
            }
            let name_address = alloc_string(&mut snapshot.strings, &ty.name);
            snapshot.types.insert(
                ty.address,
                TypeLayout {
                    kind: ty.kind,
                    name_address,
                },
            );
        }

        for obj in decl.objects {
            let header = match obj.meta {
                Some(meta) => {
                    snapshot.words.insert(meta, obj.type_address);
                    meta
                }
                None => obj.type_address,
            };
            snapshot.words.insert(obj.address, header | obj.header_tag);

            let mut fields = Vec::with_capacity(obj.fields.len());
            for (index, field) in obj.fields.into_iter().enumerate() {
                let field_address = Self::field_address(obj.address, index);
                snapshot
                    .words
                    .insert(field_address, field.value.encode(field.kind));

                let name = field.name.unwrap_or_else(|| index.to_string());
                let name_address = if obj.unreadable_names {
                    UNMAPPED_AREA + index as u64 * WORD_SIZE
                } else {
                    alloc_string(&mut snapshot.strings, &name)
                };
                fields.push(FieldLayout {
                    name_address,
                    kind: field.kind,
                });
            }

            snapshot.objects.insert(
                obj.address,
                ObjectLayout {
                    type_address: obj.type_address,
                    text: obj.text,
                    fields,
                },
            );
        }

        snapshot
    }

    fn field_address(obj: u64, index: usize) -> u64 {
        obj + WORD_SIZE * (index as u64 + 1)
    }

    fn word(&self, addr: u64) -> Option<u64> {
        self.words.get(&addr).copied()
    }

    fn object(&self, addr: u64) -> Option<&ObjectLayout> {
        self.objects.get(&addr)
    }

    fn type_of(&self, obj: &ObjectLayout) -> Option<&TypeLayout> {
        self.types.get(&obj.type_address)
    }

    /// Addresses of all objects in declaration order.
    pub fn object_addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.objects.keys().copied()
    }

    pub fn into_target(self, config: &RuntimeConfig) -> SnapshotTarget {
        SnapshotTarget::new(self, config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout() {
        let snapshot = Snapshot::from_toml(
            r#"
[runtime]
max_children = 3

[[types]]
address = 0x1000
name = "demo.Point"

[[objects]]
address = 0x2000
type = 0x1000
header_tag = 1
fields = [
    { name = "x", kind = "int32", value = -7 },
    { name = "ratio", kind = "float64", value = 0.5 },
    { name = "flag", kind = "bool", value = true },
]
"#,
        )
        .unwrap();

        assert_eq!(snapshot.max_children, 3);
        assert_eq!(snapshot.word(0x1000), Some(0x1000));
        assert_eq!(snapshot.word(0x2000), Some(0x1001));
        assert_eq!(snapshot.word(0x2008), Some(-7_i64 as u64));
        assert_eq!(snapshot.word(0x2010), Some(0.5_f64.to_bits()));
        assert_eq!(snapshot.word(0x2018), Some(1));

        let obj = snapshot.object(0x2000).unwrap();
        assert_eq!(obj.fields.len(), 3);
        assert_eq!(
            snapshot.strings.get(&obj.fields[0].name_address).unwrap(),
            b"x"
        );
        assert_eq!(
            snapshot.object_addresses().collect::<Vec<_>>(),
            vec![0x2000]
        );
    }

    #[test]
    fn test_invalid_snapshot() {
        assert!(matches!(
            Snapshot::from_toml("[[objects]]\naddress = \"x\""),
            Err(Error::SnapshotParsing(_))
        ));
        assert!(Snapshot::from_file("/definitely/not/exists/heap.toml").is_err());
    }
}
