use super::class_def::{ClassDef, ConstructorFn, MethodBody, MethodDef, Projection};
use super::invoker::Invoker;
use super::property::{is_getter, is_setter, is_valid_property_name, method_to_property};
use super::type_desc::TypeDesc;
use crate::error::{MapperError, MapperResult};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One accessor-shaped method reachable from the reflected type, together
/// with the projection that turns a root instance into the declaring one.
struct Candidate<'a> {
    method: &'a MethodDef,
    projection: Projection,
    declaring: &'a str,
}

impl Candidate<'_> {
    fn return_type(&self) -> TypeDesc {
        self.method.return_type().cloned().unwrap_or_else(TypeDesc::object)
    }

    fn param_type(&self) -> TypeDesc {
        self.method
            .params()
            .first()
            .cloned()
            .unwrap_or_else(TypeDesc::object)
    }

    fn describe(&self) -> String {
        format!("{}.{}", self.declaring, self.method.signature())
    }

    fn getter(&self) -> Invoker {
        let ty = self.return_type();
        match &self.method.body {
            MethodBody::Getter(f) => Invoker::method_get(
                self.projection.wrap_get(f.clone(), self.describe()),
                self.method.name(),
                self.declaring,
                ty,
            ),
            _ => Invoker::abstract_method(self.method.name(), self.declaring, ty),
        }
    }

    fn setter(&self) -> Invoker {
        let ty = self.param_type();
        match &self.method.body {
            MethodBody::Setter(f) => Invoker::method_set(
                self.projection.wrap_set(f.clone(), self.describe()),
                self.method.name(),
                self.declaring,
                ty,
            ),
            _ => Invoker::abstract_method(self.method.name(), self.declaring, ty),
        }
    }
}

/// Resolved accessor table for one type.
///
/// Readers and writers are tracked independently: a property may be
/// readable, writable, both or neither. Ambiguous accessors stay in the
/// table and fail only when invoked.
pub struct Reflector {
    class_name: String,
    type_desc: TypeDesc,
    constructor: Option<ConstructorFn>,
    readable: Vec<String>,
    writable: Vec<String>,
    get_methods: HashMap<String, Invoker>,
    set_methods: HashMap<String, Invoker>,
    case_insensitive: HashMap<String, String>,
}

impl Reflector {
    pub fn new(class: &ClassDef) -> Self {
        let mut reflector = Reflector {
            class_name: class.name().to_string(),
            type_desc: class.type_desc().clone(),
            constructor: class.constructor.clone(),
            readable: Vec::new(),
            writable: Vec::new(),
            get_methods: HashMap::new(),
            set_methods: HashMap::new(),
            case_insensitive: HashMap::new(),
        };

        let methods = collect_methods(class);
        reflector.add_get_methods(&methods);
        reflector.add_set_methods(&methods);
        reflector.add_fields(class, Projection::identity());

        reflector.readable = sorted_keys(&reflector.get_methods);
        reflector.writable = sorted_keys(&reflector.set_methods);
        for name in reflector.readable.iter().chain(reflector.writable.iter()) {
            reflector
                .case_insensitive
                .insert(name.to_uppercase(), name.clone());
        }
        reflector
    }

    fn add_get_methods(&mut self, methods: &[Candidate<'_>]) {
        let mut conflicting: HashMap<String, Vec<&Candidate<'_>>> = HashMap::new();
        let mut order = Vec::new();
        for candidate in methods {
            let m = candidate.method;
            if !m.params().is_empty() || m.return_type().is_none() || !is_getter(m.name()) {
                continue;
            }
            // `isX` reads only boolean properties.
            if !m.name().starts_with("get") && !candidate.return_type().is_boolean() {
                continue;
            }
            let Ok(property) = method_to_property(m.name()) else {
                continue;
            };
            if !conflicting.contains_key(&property) {
                order.push(property.clone());
            }
            conflicting.entry(property).or_default().push(candidate);
        }

        for property in order {
            let candidates = &conflicting[&property];
            let mut winner = candidates[0];
            let mut ambiguous_with = None;
            for &candidate in &candidates[1..] {
                let winner_type = winner.return_type();
                let candidate_type = candidate.return_type();
                if candidate_type == winner_type {
                    if !candidate_type.is_boolean() {
                        ambiguous_with = Some(candidate);
                        break;
                    } else if candidate.method.name().starts_with("is") {
                        winner = candidate;
                    }
                } else if candidate_type.is_assignable_from(&winner_type) {
                    // winner already has the more specific return type
                } else if winner_type.is_assignable_from(&candidate_type) {
                    winner = candidate;
                } else {
                    ambiguous_with = Some(candidate);
                    break;
                }
            }

            if !is_valid_property_name(&property) {
                continue;
            }
            let invoker = match ambiguous_with {
                Some(other) => Invoker::ambiguous(
                    format!(
                        "Illegal overloaded getter method with ambiguous type for property '{}' in class '{}': '{}' and '{}'",
                        property,
                        self.class_name,
                        winner.describe(),
                        other.describe()
                    ),
                    winner.method.name(),
                    winner.declaring,
                    winner.return_type(),
                ),
                None => winner.getter(),
            };
            self.get_methods.insert(property, invoker);
        }
    }

    fn add_set_methods(&mut self, methods: &[Candidate<'_>]) {
        let mut conflicting: HashMap<String, Vec<&Candidate<'_>>> = HashMap::new();
        let mut order = Vec::new();
        for candidate in methods {
            let m = candidate.method;
            if m.params().len() != 1 || !is_setter(m.name()) {
                continue;
            }
            let Ok(property) = method_to_property(m.name()) else {
                continue;
            };
            if !conflicting.contains_key(&property) {
                order.push(property.clone());
            }
            conflicting.entry(property).or_default().push(candidate);
        }

        for property in order {
            let getter = self.get_methods.get(&property);
            let getter_ambiguous = getter.is_some_and(Invoker::is_ambiguous);
            let getter_type = getter.map(|g| g.value_type().clone());

            let mut matched: Option<&Candidate<'_>> = None;
            let mut setter_ambiguous = false;
            for &setter in &conflicting[&property] {
                if !getter_ambiguous && getter_type.as_ref() == Some(&setter.param_type()) {
                    matched = Some(setter);
                    break;
                }
                if !setter_ambiguous {
                    matched = self.pick_better_setter(matched, setter, &property);
                    setter_ambiguous = matched.is_none();
                }
            }
            if let Some(setter) = matched {
                if is_valid_property_name(&property) {
                    self.set_methods.insert(property, setter.setter());
                }
            }
        }
    }

    fn pick_better_setter<'c, 'a>(
        &mut self,
        current: Option<&'c Candidate<'a>>,
        next: &'c Candidate<'a>,
        property: &str,
    ) -> Option<&'c Candidate<'a>> {
        let Some(current) = current else {
            return Some(next);
        };
        let (current_type, next_type) = (current.param_type(), next.param_type());
        if current_type.is_assignable_from(&next_type) {
            return Some(next);
        }
        if next_type.is_assignable_from(&current_type) {
            return Some(current);
        }
        if is_valid_property_name(property) {
            let invoker = Invoker::ambiguous(
                format!(
                    "Ambiguous setters defined for property '{}' in class '{}' with types '{}' and '{}'",
                    property, self.class_name, current_type, next_type
                ),
                current.method.name(),
                current.declaring,
                current_type,
            );
            self.set_methods.insert(property.to_string(), invoker);
        }
        None
    }

    fn add_fields(&mut self, class: &ClassDef, projection: Projection) {
        for field in class.fields() {
            let name = field.name();
            if !is_valid_property_name(name) {
                continue;
            }
            if !self.set_methods.contains_key(name) && !field.is_constant() {
                if let Some(set) = &field.set {
                    let what = format!("{}.{}", class.name(), name);
                    self.set_methods.insert(
                        name.to_string(),
                        Invoker::field_set(
                            projection.wrap_set(set.clone(), what),
                            name,
                            class.name(),
                            field.ty().clone(),
                        ),
                    );
                }
            }
            if !self.get_methods.contains_key(name) {
                let what = format!("{}.{}", class.name(), name);
                self.get_methods.insert(
                    name.to_string(),
                    Invoker::field_get(
                        projection.wrap_get(field.get.clone(), what),
                        name,
                        class.name(),
                        field.ty().clone(),
                    ),
                );
            }
        }
        if let Some(parent) = &class.superclass {
            self.add_fields(&parent.class, projection.then(&parent.projection));
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn type_desc(&self) -> &TypeDesc {
        &self.type_desc
    }

    pub fn has_default_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn default_constructor(&self) -> MapperResult<&ConstructorFn> {
        self.constructor.as_ref().ok_or_else(|| {
            MapperError::configuration(format!(
                "There is no default constructor for {}",
                self.class_name
            ))
        })
    }

    /// Create an instance through the default constructor.
    pub fn new_instance(&self) -> MapperResult<Box<dyn Any + Send + Sync>> {
        Ok((self.default_constructor()?)())
    }

    pub fn get_getter(&self, property: &str) -> MapperResult<&Invoker> {
        self.get_methods.get(property).ok_or_else(|| {
            MapperError::not_found(format!(
                "There is no getter for property named '{}' in '{}'",
                property, self.class_name
            ))
        })
    }

    pub fn get_setter(&self, property: &str) -> MapperResult<&Invoker> {
        self.set_methods.get(property).ok_or_else(|| {
            MapperError::not_found(format!(
                "There is no setter for property named '{}' in '{}'",
                property, self.class_name
            ))
        })
    }

    pub fn getter_type(&self, property: &str) -> MapperResult<&TypeDesc> {
        self.get_getter(property).map(Invoker::value_type)
    }

    pub fn setter_type(&self, property: &str) -> MapperResult<&TypeDesc> {
        self.get_setter(property).map(Invoker::value_type)
    }

    pub fn has_getter(&self, property: &str) -> bool {
        self.get_methods.contains_key(property)
    }

    pub fn has_setter(&self, property: &str) -> bool {
        self.set_methods.contains_key(property)
    }

    /// Sorted names of every readable property.
    pub fn readable_property_names(&self) -> &[String] {
        &self.readable
    }

    /// Sorted names of every writable property.
    pub fn writable_property_names(&self) -> &[String] {
        &self.writable
    }

    /// Case-insensitive lookup of the declared property name.
    pub fn find_property_name(&self, name: &str) -> Option<&str> {
        self.case_insensitive
            .get(&name.to_uppercase())
            .map(String::as_str)
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("class", &self.class_name)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("has_default_constructor", &self.has_default_constructor())
            .finish()
    }
}

fn sorted_keys(map: &HashMap<String, Invoker>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Every non-bridge method of `class`, its superclasses and interfaces,
/// subtype declarations first, deduplicated by signature.
///
/// Interfaces of one class are visited in name order.
fn collect_methods(class: &ClassDef) -> Vec<Candidate<'_>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut current = Some((class, Projection::identity()));
    while let Some((cls, projection)) = current {
        add_unique_methods(cls, &projection, &mut seen, &mut out);
        collect_interfaces(cls, &projection, &mut seen, &mut out);
        current = cls
            .superclass
            .as_ref()
            .map(|parent| (&*parent.class, projection.then(&parent.projection)));
    }
    out
}

fn collect_interfaces<'a>(
    class: &'a ClassDef,
    projection: &Projection,
    seen: &mut HashSet<String>,
    out: &mut Vec<Candidate<'a>>,
) {
    let mut interfaces: Vec<_> = class.interfaces.iter().collect();
    interfaces.sort_by(|a, b| a.class.name().cmp(b.class.name()));
    for iface in interfaces {
        let projection = projection.then(&iface.projection);
        add_unique_methods(&iface.class, &projection, seen, out);
        collect_interfaces(&iface.class, &projection, seen, out);
    }
}

fn add_unique_methods<'a>(
    class: &'a ClassDef,
    projection: &Projection,
    seen: &mut HashSet<String>,
    out: &mut Vec<Candidate<'a>>,
) {
    for method in class.methods() {
        if method.is_bridge() {
            continue;
        }
        if seen.insert(method.signature()) {
            out.push(Candidate {
                method,
                projection: projection.clone(),
                declaring: class.name(),
            });
        }
    }
}
