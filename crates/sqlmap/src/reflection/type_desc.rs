use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Broad category of a [`TypeDesc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Boolean,
    Integer,
    Float,
    Text,
    Bytes,
    Timestamp,
    Uuid,
    Json,
    List,
    Map,
    /// Root type and every registered class.
    Object,
}

/// A named value type with its supertypes.
///
/// Type descriptors stand in for runtime class objects: accessor resolution
/// compares return and parameter types by name and walks `supertypes` for
/// assignability. Two descriptors are equal when their names are equal.
#[derive(Clone)]
pub struct TypeDesc(Arc<TypeInner>);

struct TypeInner {
    name: Cow<'static, str>,
    kind: TypeKind,
    supertypes: Vec<TypeDesc>,
}

const OBJECT: &str = "Object";

impl TypeDesc {
    fn builtin(name: &'static str, kind: TypeKind) -> Self {
        Self(Arc::new(TypeInner {
            name: Cow::Borrowed(name),
            kind,
            supertypes: Vec::new(),
        }))
    }

    /// The root type every other type is assignable to.
    pub fn object() -> Self {
        Self::builtin(OBJECT, TypeKind::Object)
    }

    pub fn boolean() -> Self {
        Self::builtin("Boolean", TypeKind::Boolean)
    }

    pub fn integer() -> Self {
        Self::builtin("Integer", TypeKind::Integer)
    }

    pub fn float() -> Self {
        Self::builtin("Float", TypeKind::Float)
    }

    pub fn text() -> Self {
        Self::builtin("Text", TypeKind::Text)
    }

    pub fn bytes() -> Self {
        Self::builtin("Bytes", TypeKind::Bytes)
    }

    pub fn timestamp() -> Self {
        Self::builtin("Timestamp", TypeKind::Timestamp)
    }

    pub fn uuid() -> Self {
        Self::builtin("Uuid", TypeKind::Uuid)
    }

    pub fn json() -> Self {
        Self::builtin("Json", TypeKind::Json)
    }

    pub fn list() -> Self {
        Self::builtin("List", TypeKind::List)
    }

    pub fn map() -> Self {
        Self::builtin("Map", TypeKind::Map)
    }

    /// A user-defined type extending the given supertypes.
    ///
    /// The kind is inherited from the first non-object supertype, so a
    /// `named("ArrayList", [TypeDesc::list()])` still iterates like a list.
    pub fn named(name: impl Into<String>, supertypes: impl IntoIterator<Item = TypeDesc>) -> Self {
        let supertypes: Vec<TypeDesc> = supertypes.into_iter().collect();
        let kind = supertypes
            .iter()
            .map(TypeDesc::kind)
            .find(|k| *k != TypeKind::Object)
            .unwrap_or(TypeKind::Object);
        Self(Arc::new(TypeInner {
            name: Cow::Owned(name.into()),
            kind,
            supertypes,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn supertypes(&self) -> &[TypeDesc] {
        &self.0.supertypes
    }

    pub fn is_boolean(&self) -> bool {
        self.0.kind == TypeKind::Boolean
    }

    pub fn is_object(&self) -> bool {
        self.name() == OBJECT
    }

    /// Scalar types bind as a single value without property navigation.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self.0.kind,
            TypeKind::List | TypeKind::Map | TypeKind::Object
        )
    }

    /// Whether a value of type `other` can be used where `self` is expected.
    pub fn is_assignable_from(&self, other: &TypeDesc) -> bool {
        if self.is_object() || self == other {
            return true;
        }
        other
            .supertypes()
            .iter()
            .any(|sup| self.is_assignable_from(sup))
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
