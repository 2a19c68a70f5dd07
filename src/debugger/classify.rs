use crate::debugger::address::Address;
use crate::debugger::identity::TypeIdentity;
use crate::debugger::query::{QueryError, RuntimeApi};
use crate::debugger::variable::ObjectHandle;
use strum_macros::Display;

/// Representation of a runtime object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectKind {
    /// String-like object, rendered from its encoded content.
    Textual,
    /// Array-like object, children are elements.
    Indexed,
    /// Object with named fields.
    Composite,
}

/// Classify an object with a single remote predicate evaluation.
/// Textual type check goes first, so a textual object is never classified as indexed.
pub fn classify(
    runtime: &RuntimeApi,
    handle: ObjectHandle,
    identity: TypeIdentity,
    textual_type: Option<Address>,
) -> Result<ObjectKind, QueryError> {
    let soa = runtime.textual_or_indexed(handle.address, textual_type.unwrap_or(Address::NULL))?;
    let kind = match soa {
        1 => ObjectKind::Textual,
        2 => ObjectKind::Indexed,
        _ => ObjectKind::Composite,
    };
    log::trace!(target: "debugger", "classify {handle} (type {identity}): {kind}");
    Ok(kind)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::debugger::identity;
    use crate::snapshot::Snapshot;

    const HEAP: &str = r#"
[[types]]
address = 0x1000
name = "kotlin.String"
symbol = "kclass:kotlin.String"
kind = "textual"

[[types]]
address = 0x1100
name = "kotlin.IntArray"
kind = "indexed"

[[types]]
address = 0x1200
name = "demo.Point"

[[objects]]
address = 0x2000
type = 0x1000
text = "hi"

[[objects]]
address = 0x2100
type = 0x1100

[[objects]]
address = 0x2200
type = 0x1200
"#;

    #[test]
    fn test_classify() {
        let snapshot = Snapshot::from_toml(HEAP).unwrap();
        let cfg = RuntimeConfig::default();
        let target = snapshot.into_target(&cfg);
        let runtime = RuntimeApi::new(&target, &cfg);
        let textual = runtime.textual_type_descriptor().unwrap();
        assert_eq!(textual, Some(Address::from(0x1000_u64)));

        for (addr, expected) in [
            (0x2000_u64, ObjectKind::Textual),
            (0x2100, ObjectKind::Indexed),
            (0x2200, ObjectKind::Composite),
        ] {
            let handle = ObjectHandle::object(addr);
            let ti = identity::resolve(&runtime, handle).unwrap();

            let before = target.round_trips();
            assert_eq!(classify(&runtime, handle, ti, textual).unwrap(), expected);
            assert_eq!(target.round_trips() - before, 1);
        }
    }

    #[test]
    fn test_classify_without_textual_symbol() {
        let snapshot = Snapshot::from_toml(HEAP).unwrap();
        let mut cfg = RuntimeConfig::default();
        cfg.textual_type_symbol = "kclass:unknown".to_string();
        let target = snapshot.into_target(&cfg);
        let runtime = RuntimeApi::new(&target, &cfg);
        assert_eq!(runtime.textual_type_descriptor().unwrap(), None);

        let handle = ObjectHandle::object(0x2000_u64);
        let ti = identity::resolve(&runtime, handle).unwrap();
        assert_eq!(
            classify(&runtime, handle, ti, None).unwrap(),
            ObjectKind::Composite
        );
    }
}
