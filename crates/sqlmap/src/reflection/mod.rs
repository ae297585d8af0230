//! Per-type property accessor tables.
//!
//! Types describe their accessors once through a [`ClassDef`] (written by hand
//! or generated by `#[derive(Bean)]`). A [`Reflector`] resolves that
//! description into readable and writable property tables, and the
//! [`ReflectorFactory`] caches one reflector per type.

mod class_def;
mod factory;
mod invoker;
mod meta;
pub mod property;
mod reflector;
mod type_desc;

pub use class_def::{
    ClassDef, ClassDefBuilder, ClassKind, ConstructorFn, FieldDef, GetFn, MethodBody, MethodDef,
    SetFn,
};
pub use factory::ReflectorFactory;
pub use invoker::{Invoker, InvokerSource};
pub use meta::{MetaObject, PropertyTokenizer};
pub use reflector::Reflector;
pub use type_desc::{TypeDesc, TypeKind};

use std::any::Any;
use std::sync::Arc;

/// A value whose properties are reachable through a registered [`ClassDef`].
///
/// Implemented by `#[derive(Bean)]`, or by hand for types that need
/// inheritance, interfaces or computed accessors.
pub trait Bean: Any + Send + Sync {
    /// Accessor metadata for this type.
    fn class() -> Arc<ClassDef>
    where
        Self: Sized;

    /// Accessor metadata for the runtime type behind a trait object.
    fn class_def(&self) -> Arc<ClassDef>;
}

/// View a bean as `&dyn Any` for invoking accessors.
pub fn as_any(bean: &dyn Bean) -> &dyn Any {
    bean
}

/// Mutable counterpart of [`as_any`].
pub fn as_any_mut(bean: &mut dyn Bean) -> &mut dyn Any {
    bean
}

#[cfg(test)]
mod tests;
