//! Type identity resolution.
//!
//! There is no symbol-level type record for runtime objects, so the descriptor is validated
//! heuristically: a descriptor's first word must point back to the descriptor itself.
//! Pathological memory may fool the check, it rejects garbage pointers and objects
//! in the middle of construction in practice. Result is a best-effort hint, not a proof.

use crate::debugger::address::Address;
use crate::debugger::query::RuntimeApi;
use crate::debugger::variable::ObjectHandle;
use crate::muted_error;
use std::fmt::{Display, Formatter};

/// Address of a runtime type descriptor of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeIdentity(Address);

impl TypeIdentity {
    pub fn address(self) -> Address {
        self.0
    }
}

impl Display for TypeIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Resolve a type descriptor of an object.
/// Return [`None`] if the object is not classifiable (yet), this is not an error.
pub fn resolve(runtime: &RuntimeApi, handle: ObjectHandle) -> Option<TypeIdentity> {
    if !handle.is_object() || handle.is_null() {
        return None;
    }

    let candidate = muted_error!(
        runtime.type_identity(handle.address),
        "type identity resolution:"
    )?;
    log::trace!(target: "debugger", "type identity of {handle}: {candidate}");

    (!candidate.is_null()).then_some(TypeIdentity(candidate))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::snapshot::Snapshot;

    const HEAP: &str = r#"
[[types]]
address = 0x1000
name = "demo.Point"

[[types]]
address = 0x1100
name = "demo.Broken"
self_referential = false

[[objects]]
address = 0x2000
type = 0x1000

[[objects]]
address = 0x2100
type = 0x1000
header_tag = 3

[[objects]]
address = 0x2200
type = 0x1100

[[objects]]
address = 0x2300
type = 0x1000
meta = 0x3000
"#;

    #[test]
    fn test_resolve() {
        struct TestCase {
            handle: ObjectHandle,
            expected: Option<u64>,
        }
        let cases = vec![
            TestCase {
                handle: ObjectHandle::object(0x2000_u64),
                expected: Some(0x1000),
            },
            // tag bits are ignored
            TestCase {
                handle: ObjectHandle::object(0x2100_u64),
                expected: Some(0x1000),
            },
            // descriptor is not self-referential
            TestCase {
                handle: ObjectHandle::object(0x2200_u64),
                expected: None,
            },
            // header points to a meta-object
            TestCase {
                handle: ObjectHandle::object(0x2300_u64),
                expected: Some(0x1000),
            },
            // unmapped memory
            TestCase {
                handle: ObjectHandle::object(0x9000_u64),
                expected: None,
            },
            TestCase {
                handle: ObjectHandle::primitive(0x2000),
                expected: None,
            },
        ];

        let snapshot = Snapshot::from_toml(HEAP).unwrap();
        let cfg = RuntimeConfig::default();
        let target = snapshot.into_target(&cfg);
        let runtime = RuntimeApi::new(&target, &cfg);

        for tc in cases {
            let identity = resolve(&runtime, tc.handle).map(|ti| ti.address().as_u64());
            assert_eq!(identity, tc.expected, "handle {}", tc.handle);
        }
    }
}
