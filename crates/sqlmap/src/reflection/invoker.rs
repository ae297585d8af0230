use super::class_def::{GetFn, SetFn};
use super::type_desc::TypeDesc;
use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use std::any::Any;
use std::fmt;

#[derive(Clone)]
enum Target {
    Get(GetFn),
    Set(SetFn),
    Abstract,
    Ambiguous(String),
}

/// Where an accessor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokerSource {
    Method,
    Field,
}

/// A resolved read or write accessor for one property.
///
/// Ambiguous accessors are kept in the table and only fail when invoked, so
/// the remaining properties of the type stay usable.
#[derive(Clone)]
pub struct Invoker {
    target: Target,
    source: InvokerSource,
    member: String,
    declaring: String,
    value_type: TypeDesc,
}

impl Invoker {
    pub(crate) fn method_get(f: GetFn, member: &str, declaring: &str, ty: TypeDesc) -> Self {
        Self::new(Target::Get(f), InvokerSource::Method, member, declaring, ty)
    }

    pub(crate) fn method_set(f: SetFn, member: &str, declaring: &str, ty: TypeDesc) -> Self {
        Self::new(Target::Set(f), InvokerSource::Method, member, declaring, ty)
    }

    pub(crate) fn field_get(f: GetFn, member: &str, declaring: &str, ty: TypeDesc) -> Self {
        Self::new(Target::Get(f), InvokerSource::Field, member, declaring, ty)
    }

    pub(crate) fn field_set(f: SetFn, member: &str, declaring: &str, ty: TypeDesc) -> Self {
        Self::new(Target::Set(f), InvokerSource::Field, member, declaring, ty)
    }

    pub(crate) fn abstract_method(member: &str, declaring: &str, ty: TypeDesc) -> Self {
        Self::new(Target::Abstract, InvokerSource::Method, member, declaring, ty)
    }

    pub(crate) fn ambiguous(message: String, member: &str, declaring: &str, ty: TypeDesc) -> Self {
        Self::new(
            Target::Ambiguous(message),
            InvokerSource::Method,
            member,
            declaring,
            ty,
        )
    }

    fn new(
        target: Target,
        source: InvokerSource,
        member: &str,
        declaring: &str,
        value_type: TypeDesc,
    ) -> Self {
        Self {
            target,
            source,
            member: member.to_string(),
            declaring: declaring.to_string(),
            value_type,
        }
    }

    /// Read the property from `target`.
    pub fn get(&self, target: &dyn Any) -> MapperResult<Value> {
        match &self.target {
            Target::Get(f) => f(target),
            Target::Set(_) => Err(MapperError::Other(format!(
                "'{}' in '{}' is a writer",
                self.member, self.declaring
            ))),
            Target::Abstract => Err(self.abstract_error()),
            Target::Ambiguous(msg) => Err(MapperError::AmbiguousAccessor(msg.clone())),
        }
    }

    /// Write `value` into the property of `target`.
    pub fn set(&self, target: &mut dyn Any, value: Value) -> MapperResult<()> {
        match &self.target {
            Target::Set(f) => f(target, value),
            Target::Get(_) => Err(MapperError::Other(format!(
                "'{}' in '{}' is a reader",
                self.member, self.declaring
            ))),
            Target::Abstract => Err(self.abstract_error()),
            Target::Ambiguous(msg) => Err(MapperError::AmbiguousAccessor(msg.clone())),
        }
    }

    fn abstract_error(&self) -> MapperError {
        MapperError::binding(format!(
            "'{}' in '{}' has no implementation",
            self.member, self.declaring
        ))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.target, Target::Ambiguous(_))
    }

    pub fn source(&self) -> InvokerSource {
        self.source
    }

    /// Method or field name this accessor calls.
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Name of the class that declared the member.
    pub fn declaring_class(&self) -> &str {
        &self.declaring
    }

    pub fn value_type(&self) -> &TypeDesc {
        &self.value_type
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.target {
            Target::Get(_) => "get",
            Target::Set(_) => "set",
            Target::Abstract => "abstract",
            Target::Ambiguous(_) => "ambiguous",
        };
        write!(
            f,
            "Invoker({kind} {:?} {}.{}: {})",
            self.source, self.declaring, self.member, self.value_type
        )
    }
}
