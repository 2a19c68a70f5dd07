//! Provider dispatch and request-scoped layout cache.

use crate::config::RuntimeConfig;
use crate::debugger::address::Address;
use crate::debugger::classify::{self, ObjectKind};
use crate::debugger::error::Error;
use crate::debugger::identity::{self, TypeIdentity};
use crate::debugger::query::{QueryError, RuntimeApi, Target};
use crate::debugger::variable::provider::{
    CompositeProvider, IndexedProvider, NullProvider, TextualProvider, UnresolvedProvider,
    ValueProvider,
};
use crate::debugger::variable::ObjectHandle;
use crate::weak_error;
use log::debug;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Layout metadata resolved for an object address.
#[derive(Clone, Copy, Default)]
struct Layout {
    identity: Option<TypeIdentity>,
    kind: Option<ObjectKind>,
}

/// State of a single top-level render request.
///
/// Identity and classification of every address seen during the request are cached,
/// so shared sub-objects are resolved once. A session must not outlive the request:
/// debugee memory may change between requests.
pub struct Session<'a> {
    runtime: RuntimeApi<'a>,
    layouts: RefCell<HashMap<Address, Layout>>,
    textual_type: OnceCell<Option<Address>>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<'a> Session<'a> {
    pub fn new(target: &'a dyn Target, config: &'a RuntimeConfig) -> Self {
        Self {
            runtime: RuntimeApi::new(target, config),
            layouts: RefCell::default(),
            textual_type: OnceCell::new(),
            interrupt: None,
        }
    }

    /// Abort rendering with [`Error::Interrupted`] when `flag` is raised.
    /// Flag is checked before every child render.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn runtime(&self) -> &RuntimeApi<'a> {
        &self.runtime
    }

    pub fn check_interrupt(&self) -> Result<(), Error> {
        match self.interrupt {
            Some(ref flag) if flag.load(Ordering::Relaxed) => Err(Error::Interrupted),
            _ => Ok(()),
        }
    }

    /// Display cap, read from a host debugger on every call since it may change between renders.
    pub fn max_children(&self) -> Result<usize, Error> {
        self.runtime
            .max_children_count()
            .map_err(Error::MaxChildrenSetting)
    }

    /// Resolve type identity of an object, consulting the session cache first.
    pub fn type_identity(&self, handle: ObjectHandle) -> Option<TypeIdentity> {
        if !handle.is_object() || handle.is_null() {
            return None;
        }

        if let Some(layout) = self.layouts.borrow().get(&handle.address) {
            return layout.identity;
        }

        let identity = identity::resolve(&self.runtime, handle);
        self.layouts.borrow_mut().insert(
            handle.address,
            Layout {
                identity,
                kind: None,
            },
        );
        identity
    }

    fn textual_type(&self) -> Option<Address> {
        *self.textual_type.get_or_init(|| {
            weak_error!(
                self.runtime.textual_type_descriptor(),
                "textual type descriptor:"
            )
            .flatten()
        })
    }

    fn object_kind(
        &self,
        handle: ObjectHandle,
        identity: TypeIdentity,
    ) -> Result<ObjectKind, QueryError> {
        if let Some(kind) = self
            .layouts
            .borrow()
            .get(&handle.address)
            .and_then(|layout| layout.kind)
        {
            return Ok(kind);
        }

        let kind = classify::classify(&self.runtime, handle, identity, self.textual_type())?;
        match self.layouts.borrow_mut().entry(handle.address) {
            Entry::Occupied(mut e) => e.get_mut().kind = Some(kind),
            Entry::Vacant(e) => {
                e.insert(Layout {
                    identity: Some(identity),
                    kind: Some(kind),
                });
            }
        }
        Ok(kind)
    }

    /// Select and construct a provider for an object. Selection is never revisited.
    pub fn build_provider(&self, handle: ObjectHandle) -> ValueProvider<'_> {
        let start = Instant::now();

        if handle.is_null() {
            return ValueProvider::Null(NullProvider);
        }

        let Some(identity) = self.type_identity(handle) else {
            debug!(target: "debugger", "provider for {handle}: unresolved type identity");
            return ValueProvider::Unresolved(UnresolvedProvider::new(handle));
        };

        let Some(kind) = weak_error!(self.object_kind(handle, identity), "classification:") else {
            return ValueProvider::Unresolved(UnresolvedProvider::new(handle));
        };

        let provider = match kind {
            ObjectKind::Textual => Some(ValueProvider::Textual(TextualProvider::new(self, handle))),
            ObjectKind::Indexed => weak_error!(
                IndexedProvider::new(self, handle),
                "indexed provider construction:"
            )
            .map(ValueProvider::Indexed),
            ObjectKind::Composite => weak_error!(
                CompositeProvider::new(self, handle),
                "composite provider construction:"
            )
            .map(ValueProvider::Composite),
        }
        .unwrap_or_else(|| ValueProvider::Unresolved(UnresolvedProvider::new(handle)));

        debug!(
            target: "debugger",
            "provider for {handle}: {kind}, selected in {:?}",
            start.elapsed()
        );
        provider
    }

    /// One-line summary of an object: text for textual objects, short form otherwise.
    pub fn summary(&self, handle: ObjectHandle) -> Result<String, Error> {
        let start = Instant::now();
        let summary = self.build_provider(handle).summary();
        debug!(target: "debugger", "summary of {handle} in {:?}", start.elapsed());
        summary
    }

    /// Deep summary of an object, used on explicit expansion.
    pub fn full_summary(&self, handle: ObjectHandle) -> Result<String, Error> {
        self.build_provider(handle).full_summary()
    }

    /// Declared runtime type name of an object.
    /// Return [`None`] if type identity of an object is not resolved.
    pub fn type_name(&self, handle: ObjectHandle) -> Result<Option<String>, Error> {
        if self.type_identity(handle).is_none() {
            return Ok(None);
        }
        Ok(Some(self.runtime.type_name(handle.address)?))
    }
}

/// Render one-line summary of an object within a fresh session.
pub fn summary(
    target: &dyn Target,
    config: &RuntimeConfig,
    handle: ObjectHandle,
) -> Result<String, Error> {
    Session::new(target, config).summary(handle)
}

/// Render deep summary of an object within a fresh session.
pub fn full_summary(
    target: &dyn Target,
    config: &RuntimeConfig,
    handle: ObjectHandle,
) -> Result<String, Error> {
    Session::new(target, config).full_summary(handle)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::snapshot::Snapshot;

    const HEAP: &str = r#"
[[types]]
address = 0x1000
name = "kotlin.String"
symbol = "kclass:kotlin.String"
kind = "textual"

[[types]]
address = 0x1100
name = "demo.Node"

[[objects]]
address = 0x2000
type = 0x1000
text = "shared"

[[objects]]
address = 0x2100
type = 0x1100
fields = [
    { name = "left", kind = "reference", value = 0x2000 },
    { name = "right", kind = "reference", value = 0x2000 },
]
"#;

    #[test]
    fn test_shared_objects_resolved_once() {
        let snapshot = Snapshot::from_toml(HEAP).unwrap();
        let cfg = RuntimeConfig::default();
        let target = snapshot.into_target(&cfg);
        let session = Session::new(&target, &cfg);

        assert_eq!(
            session
                .full_summary(ObjectHandle::object(0x2100_u64))
                .unwrap(),
            "[left: shared, right: shared]"
        );
        let identity_queries = target
            .expressions()
            .iter()
            .filter(|expr| expr.starts_with("*(void **)((uintptr_t)(*(void**)0x2000)"))
            .count();
        assert_eq!(identity_queries, 1);
        let classify_queries = target
            .expressions()
            .iter()
            .filter(|expr| expr.starts_with("(int)(Konan_DebugIsInstance(0x2000"))
            .count();
        assert_eq!(classify_queries, 1);
    }

    #[test]
    fn test_interrupt() {
        let snapshot = Snapshot::from_toml(HEAP).unwrap();
        let cfg = RuntimeConfig::default();
        let target = snapshot.into_target(&cfg);
        let flag = Arc::new(AtomicBool::new(true));
        let session = Session::new(&target, &cfg).with_interrupt(flag.clone());

        let err = session
            .full_summary(ObjectHandle::object(0x2100_u64))
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted));

        flag.store(false, Ordering::Relaxed);
        assert!(session
            .full_summary(ObjectHandle::object(0x2100_u64))
            .is_ok());
    }

    #[test]
    fn test_type_name() {
        let snapshot = Snapshot::from_toml(HEAP).unwrap();
        let cfg = RuntimeConfig::default();
        let target = snapshot.into_target(&cfg);
        let session = Session::new(&target, &cfg);

        assert_eq!(
            session.type_name(ObjectHandle::object(0x2100_u64)).unwrap(),
            Some("demo.Node".to_string())
        );
        assert_eq!(session.type_name(ObjectHandle::object(0_u64)).unwrap(), None);
        assert_eq!(
            session.type_name(ObjectHandle::object(0x7777_u64)).unwrap(),
            None
        );
    }
}
