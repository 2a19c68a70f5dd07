//! Synthetic value providers.
//!
//! Every object handle is presented by exactly one provider variant, selected once by
//! [`crate::debugger::session::Session::build_provider`].

use crate::debugger::error::Error;
use crate::debugger::session::Session;
use crate::debugger::variable::accessor::FieldAccessor;
use crate::debugger::variable::render::{bounded_list, ELLIPSIS};
use crate::debugger::variable::value::SupportedScalar;
use crate::debugger::variable::ObjectHandle;
use crate::weak_error;
use log::{trace, warn};

/// Summary of a null reference.
pub const NULL: &str = "null";
/// Summary of a value that can't be read or represented.
pub const UNKNOWN: &str = "unknown";

/// Value of a field or an element.
pub enum ChildValue<'s> {
    Scalar(SupportedScalar),
    /// Referenced object (reference is already followed).
    Object(Box<ValueProvider<'s>>),
    Unrepresentable,
}

impl ChildValue<'_> {
    /// Summary of a child: scalars as is, objects by their default summary.
    pub fn summary(&self) -> Result<String, Error> {
        match self {
            ChildValue::Scalar(scalar) => Ok(scalar.to_string()),
            ChildValue::Object(provider) => provider.summary(),
            ChildValue::Unrepresentable => Ok(UNKNOWN.to_string()),
        }
    }
}

pub struct Child<'s> {
    pub name: String,
    pub value: ChildValue<'s>,
}

/// Provider for a null reference.
pub struct NullProvider;

/// Provider for an object which type descriptor can't be resolved.
pub struct UnresolvedProvider {
    handle: ObjectHandle,
}

impl UnresolvedProvider {
    pub fn new(handle: ObjectHandle) -> Self {
        Self { handle }
    }
}

/// Provider for a string-like object.
pub struct TextualProvider {
    representation: String,
}

impl TextualProvider {
    /// Content is copied out of the runtime scratch buffer right away,
    /// any later query may overwrite it.
    pub fn new(session: &Session, handle: ObjectHandle) -> Self {
        let representation = weak_error!(
            Self::read_content(session, handle),
            "textual content:"
        )
        .flatten()
        .unwrap_or_else(|| handle.raw_repr());
        Self { representation }
    }

    fn read_content(session: &Session, handle: ObjectHandle) -> Result<Option<String>, Error> {
        let runtime = session.runtime();
        let buffer = runtime.scratch_buffer()?;
        let capacity = runtime.scratch_buffer_capacity()?;
        let len = runtime.encode_utf8(handle.address, buffer, capacity)?;
        if len == 0 {
            return Ok(None);
        }

        let bytes = runtime.read_buffer(buffer, len.min(capacity))?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Provider for an array-like object, children are named by their index.
pub struct IndexedProvider<'s> {
    accessor: FieldAccessor<'s>,
}

impl<'s> IndexedProvider<'s> {
    pub fn new(session: &'s Session<'s>, handle: ObjectHandle) -> Result<Self, Error> {
        Ok(Self {
            accessor: FieldAccessor::new(session, handle)?,
        })
    }
}

/// Provider for an object with named fields.
pub struct CompositeProvider<'s> {
    accessor: FieldAccessor<'s>,
    names: Vec<String>,
}

impl<'s> CompositeProvider<'s> {
    /// Field names are read eagerly, they are required for lookup by name.
    /// Construction fails if any of them is unreadable.
    pub fn new(session: &'s Session<'s>, handle: ObjectHandle) -> Result<Self, Error> {
        let accessor = FieldAccessor::new(session, handle)?;
        let names = (0..accessor.field_count())
            .map(|index| accessor.field_name(index))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(target: "debugger", "fields of {handle}: {names:?}");
        Ok(Self { accessor, names })
    }
}

/// Render a field value for a deep summary. Non-fatal errors degrade to [`UNKNOWN`].
fn render_field(accessor: &FieldAccessor, index: usize) -> Result<String, Error> {
    accessor.session().check_interrupt()?;

    let rendered = accessor
        .read_field_value(index)
        .and_then(|value| value.summary());
    match rendered {
        Ok(rendered) => Ok(rendered),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(target: "debugger", "render field {index} of {}: {e:#}", accessor.object());
            Ok(UNKNOWN.to_string())
        }
    }
}

pub enum ValueProvider<'s> {
    Null(NullProvider),
    Unresolved(UnresolvedProvider),
    Textual(TextualProvider),
    Indexed(IndexedProvider<'s>),
    Composite(CompositeProvider<'s>),
}

impl<'s> ValueProvider<'s> {
    /// Short name of a provider variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ValueProvider::Null(_) => "null",
            ValueProvider::Unresolved(_) => "unresolved",
            ValueProvider::Textual(_) => "textual",
            ValueProvider::Indexed(_) => "indexed",
            ValueProvider::Composite(_) => "composite",
        }
    }

    pub fn child_count(&self) -> usize {
        match self {
            ValueProvider::Null(_) | ValueProvider::Unresolved(_) | ValueProvider::Textual(_) => 0,
            ValueProvider::Indexed(indexed) => indexed.accessor.field_count(),
            ValueProvider::Composite(composite) => composite.accessor.field_count(),
        }
    }

    pub fn has_children(&self) -> bool {
        self.child_count() > 0
    }

    /// Index of a child with given name, [`None`] if not found.
    pub fn child_index(&self, name: &str) -> Option<usize> {
        match self {
            ValueProvider::Null(_) | ValueProvider::Unresolved(_) | ValueProvider::Textual(_) => {
                None
            }
            ValueProvider::Indexed(indexed) => name
                .parse::<usize>()
                .ok()
                .filter(|&index| index < indexed.accessor.field_count()),
            ValueProvider::Composite(composite) => {
                composite.names.iter().position(|field| field == name)
            }
        }
    }

    /// Child at `index`, [`None`] if there is no such child.
    pub fn child_at(&self, index: usize) -> Result<Option<Child<'s>>, Error> {
        if index >= self.child_count() {
            return Ok(None);
        }

        let child = match self {
            ValueProvider::Null(_) | ValueProvider::Unresolved(_) | ValueProvider::Textual(_) => {
                return Ok(None)
            }
            ValueProvider::Indexed(indexed) => Child {
                name: index.to_string(),
                value: indexed.accessor.read_field_value(index)?,
            },
            ValueProvider::Composite(composite) => Child {
                name: composite.names[index].clone(),
                value: composite.accessor.read_field_value(index)?,
            },
        };
        Ok(Some(child))
    }

    /// Default summary: text of a textual object, short form for others.
    pub fn summary(&self) -> Result<String, Error> {
        self.short_summary()
    }

    /// One-line preview, children are not expanded.
    pub fn short_summary(&self) -> Result<String, Error> {
        match self {
            ValueProvider::Null(_) => Ok(NULL.to_string()),
            ValueProvider::Unresolved(unresolved) => Ok(unresolved.handle.raw_repr()),
            ValueProvider::Textual(textual) => Ok(textual.representation.clone()),
            ValueProvider::Indexed(indexed) => {
                let cap = indexed.accessor.session().max_children()?;
                bounded_list(indexed.accessor.field_count(), cap, |_| {
                    Ok(ELLIPSIS.to_string())
                })
            }
            ValueProvider::Composite(composite) => {
                let cap = composite.accessor.session().max_children()?;
                bounded_list(composite.names.len(), cap, |index| {
                    Ok(format!("{}: {ELLIPSIS}", composite.names[index]))
                })
            }
        }
    }

    /// Deep summary, every rendered child is presented by its own summary.
    pub fn full_summary(&self) -> Result<String, Error> {
        match self {
            ValueProvider::Null(_) | ValueProvider::Unresolved(_) | ValueProvider::Textual(_) => {
                self.short_summary()
            }
            ValueProvider::Indexed(indexed) => {
                let accessor = &indexed.accessor;
                let cap = accessor.session().max_children()?;
                bounded_list(accessor.field_count(), cap, |index| {
                    render_field(accessor, index)
                })
            }
            ValueProvider::Composite(composite) => {
                let accessor = &composite.accessor;
                let cap = accessor.session().max_children()?;
                bounded_list(composite.names.len(), cap, |index| {
                    Ok(format!(
                        "{}: {}",
                        composite.names[index],
                        render_field(accessor, index)?
                    ))
                })
            }
        }
    }
}
