use crate::reflection::{Bean, ClassDef, TypeDesc};
use crate::value::Value;
use std::sync::Arc;

/// Declared or runtime type of a statement's parameter object, used to
/// resolve the value type of each `#{}` placeholder.
#[derive(Debug, Clone)]
pub enum ParameterType {
    /// Unknown; every placeholder resolves to `Object`.
    Object,
    /// A single value bound as-is to every placeholder.
    Scalar(TypeDesc),
    /// A map; placeholders resolve to `Object`.
    Map,
    /// A bean; placeholders must name one of its readable properties.
    Bean(Arc<ClassDef>),
}

impl ParameterType {
    /// Runtime type of `value`.
    pub fn of(value: &Value) -> Self {
        if let Some(expanded) = value.expand_json() {
            return Self::of(&expanded);
        }
        match value {
            Value::Null | Value::List(_) => ParameterType::Object,
            Value::Map(_) => ParameterType::Map,
            Value::Bean(bean) => ParameterType::Bean(bean.class_def()),
            scalar => ParameterType::Scalar(scalar.type_desc()),
        }
    }

    /// The declared bean type `B`.
    pub fn bean<B: Bean>() -> Self {
        ParameterType::Bean(B::class())
    }

    pub fn type_name(&self) -> &str {
        match self {
            ParameterType::Object => "Object",
            ParameterType::Scalar(ty) => ty.name(),
            ParameterType::Map => "Map",
            ParameterType::Bean(class) => class.name(),
        }
    }
}

impl From<TypeDesc> for ParameterType {
    fn from(ty: TypeDesc) -> Self {
        match ty.kind() {
            crate::reflection::TypeKind::Map => ParameterType::Map,
            _ if ty.is_scalar() => ParameterType::Scalar(ty),
            _ => ParameterType::Object,
        }
    }
}
