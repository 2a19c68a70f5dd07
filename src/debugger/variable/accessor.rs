use crate::debugger::address::Address;
use crate::debugger::error::Error;
use crate::debugger::session::Session;
use crate::debugger::variable::provider::ChildValue;
use crate::debugger::variable::value::{ScalarKind, SupportedScalar};
use crate::debugger::variable::ObjectHandle;

/// Access to fields (or elements) of a classified object.
/// Every operation except [`FieldAccessor::field_count`] is an independent remote round trip.
pub struct FieldAccessor<'s> {
    session: &'s Session<'s>,
    object: ObjectHandle,
    count: usize,
}

impl<'s> FieldAccessor<'s> {
    pub fn new(session: &'s Session<'s>, object: ObjectHandle) -> Result<Self, Error> {
        let count = session.runtime().field_count(object.address)?;
        log::trace!(target: "debugger", "field count of {object}: {count}");
        Ok(Self {
            session,
            object,
            count,
        })
    }

    pub fn session(&self) -> &'s Session<'s> {
        self.session
    }

    pub fn object(&self) -> ObjectHandle {
        self.object
    }

    pub fn field_count(&self) -> usize {
        self.count
    }

    fn check_bounds(&self, index: usize) -> Result<(), Error> {
        if index >= self.count {
            return Err(Error::FieldOutOfBounds(self.object.address, index));
        }
        Ok(())
    }

    pub fn field_name(&self, index: usize) -> Result<String, Error> {
        self.check_bounds(index)?;
        self.session
            .runtime()
            .field_name(self.object.address, index)
            .map_err(|e| Error::FieldName(self.object.address, index, e))
    }

    pub fn field_kind(&self, index: usize) -> Result<ScalarKind, Error> {
        self.check_bounds(index)?;
        Ok(self.session.runtime().field_kind(self.object.address, index)?)
    }

    pub fn field_address(&self, index: usize) -> Result<Address, Error> {
        self.check_bounds(index)?;
        Ok(self
            .session
            .runtime()
            .field_address(self.object.address, index)?)
    }

    /// Read a field value with its native width. Reference fields are dereferenced once:
    /// the result is a provider of a referenced object.
    pub fn read_field_value(&self, index: usize) -> Result<ChildValue<'s>, Error> {
        let kind = self.field_kind(index)?;
        if kind == ScalarKind::Unrepresentable {
            return Ok(ChildValue::Unrepresentable);
        }

        let addr = self.field_address(index)?;
        log::trace!(target: "debugger", "read field {index} of {}: {kind} at {addr}", self.object);

        let value = match self.session.runtime().read_scalar(kind, addr)? {
            Some(SupportedScalar::Pointer(ptr)) if kind == ScalarKind::Reference => {
                ChildValue::Object(Box::new(
                    self.session.build_provider(ObjectHandle::object(ptr)),
                ))
            }
            Some(scalar) => ChildValue::Scalar(scalar),
            None => ChildValue::Unrepresentable,
        };
        Ok(value)
    }
}
