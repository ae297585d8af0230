use super::type_desc::TypeDesc;
use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Reads a property from a type-erased instance.
pub type GetFn = Arc<dyn Fn(&dyn Any) -> MapperResult<Value> + Send + Sync>;
/// Writes a property on a type-erased instance.
pub type SetFn = Arc<dyn Fn(&mut dyn Any, Value) -> MapperResult<()> + Send + Sync>;
type UpcastFn = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;
type UpcastMutFn = Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

/// Creates a fresh instance of the described type.
pub type ConstructorFn = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

fn upcast<F>(f: F) -> UpcastFn
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn upcast_mut<F>(f: F) -> UpcastMutFn
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Maps a subtype instance to the embedded supertype instance its inherited
/// accessors operate on.
#[derive(Clone)]
pub(crate) struct Projection {
    get: UpcastFn,
    get_mut: UpcastMutFn,
}

impl Projection {
    pub(crate) fn identity() -> Self {
        Self {
            get: upcast(|obj| Some(obj)),
            get_mut: upcast_mut(|obj| Some(obj)),
        }
    }

    /// `self` first, then `next`.
    pub(crate) fn then(&self, next: &Projection) -> Projection {
        let (a, b) = (self.get.clone(), next.get.clone());
        let (a_mut, b_mut) = (self.get_mut.clone(), next.get_mut.clone());
        Projection {
            get: upcast(move |obj| a(obj).and_then(|inner| b(inner))),
            get_mut: upcast_mut(move |obj| a_mut(obj).and_then(|inner| b_mut(inner))),
        }
    }

    pub(crate) fn wrap_get(&self, f: GetFn, what: String) -> GetFn {
        let get = self.get.clone();
        Arc::new(move |obj: &dyn Any| match get(obj) {
            Some(inner) => f(inner),
            None => Err(MapperError::binding(format!(
                "cannot reach the declaring type of {what}"
            ))),
        })
    }

    pub(crate) fn wrap_set(&self, f: SetFn, what: String) -> SetFn {
        let get_mut = self.get_mut.clone();
        Arc::new(move |obj: &mut dyn Any, value: Value| match get_mut(obj) {
            Some(inner) => f(inner, value),
            None => Err(MapperError::binding(format!(
                "cannot reach the declaring type of {what}"
            ))),
        })
    }
}

/// Whether a [`ClassDef`] describes a concrete type or an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

/// Body of a declared method.
#[derive(Clone)]
pub enum MethodBody {
    Getter(GetFn),
    Setter(SetFn),
    /// Declared without an implementation (interface methods).
    Abstract,
}

/// A declared accessor-shaped method.
#[derive(Clone)]
pub struct MethodDef {
    pub(crate) name: String,
    pub(crate) return_type: Option<TypeDesc>,
    pub(crate) params: Vec<TypeDesc>,
    pub(crate) bridge: bool,
    pub(crate) body: MethodBody,
}

impl MethodDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` for methods without a return value.
    pub fn return_type(&self) -> Option<&TypeDesc> {
        self.return_type.as_ref()
    }

    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    pub fn is_bridge(&self) -> bool {
        self.bridge
    }

    /// `ReturnType#name:Param1,Param2`, used to deduplicate overridden methods.
    pub fn signature(&self) -> String {
        let mut sig = String::new();
        match &self.return_type {
            Some(ret) => sig.push_str(ret.name()),
            None => sig.push_str("void"),
        }
        sig.push('#');
        sig.push_str(&self.name);
        for (i, p) in self.params.iter().enumerate() {
            sig.push(if i == 0 { ':' } else { ',' });
            sig.push_str(p.name());
        }
        sig
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// A declared field with direct read/write access.
#[derive(Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) ty: TypeDesc,
    pub(crate) is_static: bool,
    pub(crate) is_final: bool,
    pub(crate) get: GetFn,
    pub(crate) set: Option<SetFn>,
}

impl FieldDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }

    /// Static final fields are constants and never receive a writer.
    pub fn is_constant(&self) -> bool {
        self.is_static && self.is_final
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

#[derive(Clone)]
pub(crate) struct SuperRef {
    pub(crate) class: Arc<ClassDef>,
    pub(crate) projection: Projection,
}

/// Registered accessor metadata for one type.
///
/// `ClassDef` is the explicit registration API that replaces runtime
/// introspection: it lists accessor-shaped methods, fields, the supertype
/// chain and interfaces. A [`Reflector`](super::Reflector) is built from it.
pub struct ClassDef {
    pub(crate) name: String,
    pub(crate) type_id: TypeId,
    pub(crate) type_desc: TypeDesc,
    pub(crate) kind: ClassKind,
    pub(crate) superclass: Option<SuperRef>,
    pub(crate) interfaces: Vec<SuperRef>,
    pub(crate) methods: Vec<MethodDef>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) constructor: Option<ConstructorFn>,
}

impl ClassDef {
    /// Start describing the concrete type `T`.
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> ClassDefBuilder<T> {
        ClassDefBuilder::new(name.into(), ClassKind::Class)
    }

    /// Start describing an interface whose accessors operate on `T`.
    pub fn interface<T: Any + Send + Sync>(name: impl Into<String>) -> ClassDefBuilder<T> {
        ClassDefBuilder::new(name.into(), ClassKind::Interface)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn type_desc(&self) -> &TypeDesc {
        &self.type_desc
    }

    pub fn superclass(&self) -> Option<&Arc<ClassDef>> {
        self.superclass.as_ref().map(|s| &s.class)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &Arc<ClassDef>> {
        self.interfaces.iter().map(|s| &s.class)
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass().map(|c| c.name()))
            .field(
                "interfaces",
                &self.interfaces().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("methods", &self.methods)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for [`ClassDef`]; accessor closures receive the concrete `T`.
#[must_use]
pub struct ClassDefBuilder<T> {
    name: String,
    kind: ClassKind,
    superclass: Option<SuperRef>,
    interfaces: Vec<SuperRef>,
    methods: Vec<MethodDef>,
    fields: Vec<FieldDef>,
    constructor: Option<ConstructorFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassDefBuilder<T> {
    fn new(name: String, kind: ClassKind) -> Self {
        Self {
            name,
            kind,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            constructor: None,
            _marker: PhantomData,
        }
    }

    fn typed_get<F>(&self, member: &str, f: F) -> GetFn
    where
        F: Fn(&T) -> MapperResult<Value> + Send + Sync + 'static,
    {
        let what = format!("'{member}' of '{}'", self.name);
        Arc::new(move |obj: &dyn Any| match obj.downcast_ref::<T>() {
            Some(target) => f(target),
            None => Err(MapperError::binding(format!(
                "{what} invoked on a value of another type"
            ))),
        })
    }

    fn typed_set<F>(&self, member: &str, f: F) -> SetFn
    where
        F: Fn(&mut T, Value) -> MapperResult<()> + Send + Sync + 'static,
    {
        let what = format!("'{member}' of '{}'", self.name);
        Arc::new(move |obj: &mut dyn Any, value| match obj.downcast_mut::<T>() {
            Some(target) => f(target, value),
            None => Err(MapperError::binding(format!(
                "{what} invoked on a value of another type"
            ))),
        })
    }

    /// Declare a no-argument reader method such as `getName` or `isActive`.
    pub fn getter<F>(mut self, name: &str, return_type: TypeDesc, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let body = MethodBody::Getter(self.typed_get(name, move |t| Ok(f(t))));
        self.methods.push(MethodDef {
            name: name.to_string(),
            return_type: Some(return_type),
            params: Vec::new(),
            bridge: false,
            body,
        });
        self
    }

    /// Declare a compiler-generated bridge reader; bridges never become accessors.
    pub fn bridge_getter<F>(mut self, name: &str, return_type: TypeDesc, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let body = MethodBody::Getter(self.typed_get(name, move |t| Ok(f(t))));
        self.methods.push(MethodDef {
            name: name.to_string(),
            return_type: Some(return_type),
            params: Vec::new(),
            bridge: true,
            body,
        });
        self
    }

    /// Declare a single-argument writer method such as `setName`.
    pub fn setter<F>(mut self, name: &str, param_type: TypeDesc, f: F) -> Self
    where
        F: Fn(&mut T, Value) -> MapperResult<()> + Send + Sync + 'static,
    {
        let body = MethodBody::Setter(self.typed_set(name, f));
        self.methods.push(MethodDef {
            name: name.to_string(),
            return_type: None,
            params: vec![param_type],
            bridge: false,
            body,
        });
        self
    }

    /// Declare a reader without an implementation.
    pub fn abstract_getter(mut self, name: &str, return_type: TypeDesc) -> Self {
        self.methods.push(MethodDef {
            name: name.to_string(),
            return_type: Some(return_type),
            params: Vec::new(),
            bridge: false,
            body: MethodBody::Abstract,
        });
        self
    }

    /// Declare a writer without an implementation.
    pub fn abstract_setter(mut self, name: &str, param_type: TypeDesc) -> Self {
        self.methods.push(MethodDef {
            name: name.to_string(),
            return_type: None,
            params: vec![param_type],
            bridge: false,
            body: MethodBody::Abstract,
        });
        self
    }

    /// Declare a readable and writable instance field.
    pub fn field<G, S>(mut self, name: &str, ty: TypeDesc, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> MapperResult<()> + Send + Sync + 'static,
    {
        let get = self.typed_get(name, move |t| Ok(get(t)));
        let set = self.typed_set(name, set);
        self.fields.push(FieldDef {
            name: name.to_string(),
            ty,
            is_static: false,
            is_final: false,
            get,
            set: Some(set),
        });
        self
    }

    /// Declare a field that can only be read.
    pub fn read_only_field<G>(mut self, name: &str, ty: TypeDesc, get: G) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let get = self.typed_get(name, move |t| Ok(get(t)));
        self.fields.push(FieldDef {
            name: name.to_string(),
            ty,
            is_static: false,
            is_final: true,
            get,
            set: None,
        });
        self
    }

    /// Declare a static final constant.
    pub fn constant(mut self, name: &str, ty: TypeDesc, value: impl Into<Value>) -> Self {
        let value = value.into();
        let get: GetFn = Arc::new(move |_: &dyn Any| Ok(value.clone()));
        self.fields.push(FieldDef {
            name: name.to_string(),
            ty,
            is_static: true,
            is_final: true,
            get,
            set: None,
        });
        self
    }

    /// Inherit from a class whose accessors operate on the same `T`.
    pub fn extends(mut self, parent: Arc<ClassDef>) -> Self {
        self.superclass = Some(SuperRef {
            class: parent,
            projection: Projection::identity(),
        });
        self
    }

    /// Inherit from a class describing a `P` embedded in `T`.
    pub fn extends_via<P: Any>(
        mut self,
        parent: Arc<ClassDef>,
        get: fn(&T) -> &P,
        get_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        let projection = Projection {
            get: upcast(move |obj| obj.downcast_ref::<T>().map(|t| get(t) as &dyn Any)),
            get_mut: upcast_mut(move |obj| {
                obj.downcast_mut::<T>().map(|t| get_mut(t) as &mut dyn Any)
            }),
        };
        self.superclass = Some(SuperRef {
            class: parent,
            projection,
        });
        self
    }

    /// Implement an interface whose accessors operate on the same `T`.
    pub fn implements(mut self, iface: Arc<ClassDef>) -> Self {
        self.interfaces.push(SuperRef {
            class: iface,
            projection: Projection::identity(),
        });
        self
    }

    /// Register a no-argument constructor.
    pub fn default_constructor<F>(mut self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move || Box::new(f()) as Box<dyn Any + Send + Sync>));
        self
    }

    pub fn build(self) -> Arc<ClassDef> {
        let supertypes: Vec<TypeDesc> = self
            .superclass
            .iter()
            .chain(self.interfaces.iter())
            .map(|s| s.class.type_desc.clone())
            .collect();
        let type_desc = if supertypes.is_empty() {
            TypeDesc::named(self.name.clone(), [TypeDesc::object()])
        } else {
            TypeDesc::named(self.name.clone(), supertypes)
        };
        Arc::new(ClassDef {
            name: self.name,
            type_id: TypeId::of::<T>(),
            type_desc,
            kind: self.kind,
            superclass: self.superclass,
            interfaces: self.interfaces,
            methods: self.methods,
            fields: self.fields,
            constructor: self.constructor,
        })
    }
}
