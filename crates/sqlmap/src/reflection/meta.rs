use super::factory::ReflectorFactory;
use super::type_desc::TypeDesc;
use super::{as_any, as_any_mut};
use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Splits a property path such as `orders[0].lines` into its first segment
/// and the remaining children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTokenizer<'a> {
    name: &'a str,
    indexed_name: &'a str,
    index: Option<&'a str>,
    children: Option<&'a str>,
}

impl<'a> PropertyTokenizer<'a> {
    pub fn new(full_name: &'a str) -> Self {
        let (head, children) = match full_name.find('.') {
            Some(pos) => (&full_name[..pos], Some(&full_name[pos + 1..])),
            None => (full_name, None),
        };
        let (name, index) = match head.find('[') {
            Some(pos) => {
                let end = if head.ends_with(']') {
                    head.len() - 1
                } else {
                    head.len()
                };
                (&head[..pos], Some(&head[pos + 1..end.max(pos + 1)]))
            }
            None => (head, None),
        };
        Self {
            name,
            indexed_name: head,
            index,
            children,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// First segment including its `[index]` part.
    pub fn indexed_name(&self) -> &'a str {
        self.indexed_name
    }

    pub fn index(&self) -> Option<&'a str> {
        self.index
    }

    pub fn children(&self) -> Option<&'a str> {
        self.children
    }

    pub fn has_next(&self) -> bool {
        self.children.is_some()
    }

    /// Tokenizer over the remaining path.
    pub fn child(&self) -> Option<PropertyTokenizer<'a>> {
        self.children.map(PropertyTokenizer::new)
    }
}

/// Path navigation over a [`Value`] tree of maps, lists and beans.
///
/// A null intermediate reads as null. Missing map keys read as null, while a
/// bean without the property is a NotFound error. JSON objects and arrays are
/// read like maps and lists.
pub struct MetaObject<'a> {
    value: &'a Value,
    factory: &'a ReflectorFactory,
}

impl<'a> MetaObject<'a> {
    pub fn new(value: &'a Value, factory: &'a ReflectorFactory) -> Self {
        Self { value, factory }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn get_value(&self, path: &str) -> MapperResult<Value> {
        let mut prop = PropertyTokenizer::new(path);
        let mut current = self.read_segment(self.value, &prop)?;
        while let Some(child) = prop.child() {
            if current.is_null() {
                return Ok(Value::Null);
            }
            current = self.read_segment(&current, &child)?;
            prop = child;
        }
        Ok(current)
    }

    pub fn has_getter(&self, path: &str) -> bool {
        if let Some(expanded) = self.value.expand_json() {
            return MetaObject::new(&expanded, self.factory).has_getter(path);
        }
        let prop = PropertyTokenizer::new(path);
        let readable = match self.value {
            Value::Map(map) => map.contains_key(prop.name()),
            Value::Bean(bean) => self.factory.find_for_bean(bean.as_ref()).has_getter(prop.name()),
            Value::List(_) => prop.name().is_empty() && prop.index().is_some(),
            _ => false,
        };
        if !readable || !prop.has_next() {
            return readable;
        }
        match self.read_segment(self.value, &prop) {
            Ok(Value::Null) => true,
            Ok(child) => MetaObject::new(&child, self.factory)
                .has_getter(prop.children().unwrap_or_default()),
            Err(_) => false,
        }
    }

    /// Declared type of a bean property, or the runtime type of any other value.
    pub fn getter_type(&self, path: &str) -> MapperResult<TypeDesc> {
        let prop = PropertyTokenizer::new(path);
        if prop.has_next() {
            let child = self.read_segment(self.value, &prop)?;
            if child.is_null() {
                return Ok(TypeDesc::object());
            }
            return MetaObject::new(&child, self.factory)
                .getter_type(prop.children().unwrap_or_default());
        }
        if let (Value::Bean(bean), None) = (self.value, prop.index()) {
            let reflector = self.factory.find_for_bean(bean.as_ref());
            return reflector.getter_type(prop.name()).cloned();
        }
        let value = self.read_segment(self.value, &prop)?;
        Ok(if value.is_null() {
            TypeDesc::object()
        } else {
            value.type_desc()
        })
    }

    /// Readable property names at the top level.
    pub fn getter_names(&self) -> Vec<String> {
        if let Some(expanded) = self.value.expand_json() {
            return MetaObject::new(&expanded, self.factory).getter_names();
        }
        match self.value {
            Value::Map(map) => map.keys().cloned().collect(),
            Value::Bean(bean) => self
                .factory
                .find_for_bean(bean.as_ref())
                .readable_property_names()
                .to_vec(),
            _ => Vec::new(),
        }
    }

    fn read_segment(&self, value: &Value, prop: &PropertyTokenizer<'_>) -> MapperResult<Value> {
        let base = if prop.name().is_empty() {
            value.clone()
        } else {
            self.read_property(value, prop.name())?
        };
        match prop.index() {
            Some(index) => read_index(&base, index, prop.indexed_name()),
            None => Ok(base),
        }
    }

    fn read_property(&self, value: &Value, name: &str) -> MapperResult<Value> {
        if let Some(expanded) = value.expand_json() {
            return self.read_property(&expanded, name);
        }
        match value {
            Value::Null => Ok(Value::Null),
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            Value::Bean(bean) => {
                let reflector = self.factory.find_for_bean(bean.as_ref());
                reflector.get_getter(name)?.get(as_any(bean.as_ref()))
            }
            other => Err(MapperError::binding(format!(
                "There is no property '{}' on a value of type '{}'",
                name,
                other.type_label()
            ))),
        }
    }

    /// Write `value` at `path` inside `target`.
    ///
    /// Missing map entries along the path are created as maps. Beans must be
    /// uniquely owned to be written.
    pub fn set_value(
        target: &mut Value,
        path: &str,
        value: Value,
        factory: &ReflectorFactory,
    ) -> MapperResult<()> {
        let prop = PropertyTokenizer::new(path);
        let Some(children) = prop.children() else {
            return write_segment(target, &prop, value, factory);
        };

        if target.is_null() {
            *target = Value::Map(BTreeMap::new());
        }
        if let (Value::Map(map), None) = (&mut *target, prop.index()) {
            let child = map
                .entry(prop.name().to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            return MetaObject::set_value(child, children, value, factory);
        }

        // Read the child, update it, write it back.
        let mut child = MetaObject::new(target, factory).read_segment(target, &prop)?;
        if child.is_null() {
            child = Value::Map(BTreeMap::new());
        }
        MetaObject::set_value(&mut child, children, value, factory)?;
        write_segment(target, &prop, child, factory)
    }
}

fn read_index(collection: &Value, index: &str, segment: &str) -> MapperResult<Value> {
    if let Some(expanded) = collection.expand_json() {
        return read_index(&expanded, index, segment);
    }
    match collection {
        Value::Null => Ok(Value::Null),
        Value::List(items) => {
            let i: usize = index.trim().parse().map_err(|_| {
                MapperError::binding(format!("Invalid list index in '{segment}'"))
            })?;
            items.get(i).cloned().ok_or_else(|| {
                MapperError::binding(format!(
                    "Index {} out of range in '{}' (size {})",
                    i,
                    segment,
                    items.len()
                ))
            })
        }
        Value::Map(map) => Ok(map.get(index).cloned().unwrap_or_default()),
        other => Err(MapperError::binding(format!(
            "'{}' is not a collection but a {}",
            segment,
            other.type_label()
        ))),
    }
}

fn write_segment(
    target: &mut Value,
    prop: &PropertyTokenizer<'_>,
    value: Value,
    factory: &ReflectorFactory,
) -> MapperResult<()> {
    if let Some(index) = prop.index() {
        if prop.name().is_empty() {
            return write_index(target, index, prop.indexed_name(), value);
        }
        let mut collection = MetaObject::new(target, factory).read_property(target, prop.name())?;
        write_index(&mut collection, index, prop.indexed_name(), value)?;
        return write_property(target, prop.name(), collection, factory);
    }
    write_property(target, prop.name(), value, factory)
}

fn write_index(collection: &mut Value, index: &str, segment: &str, value: Value) -> MapperResult<()> {
    match collection {
        Value::List(items) => {
            let i: usize = index.trim().parse().map_err(|_| {
                MapperError::binding(format!("Invalid list index in '{segment}'"))
            })?;
            let len = items.len();
            let slot = items.get_mut(i).ok_or_else(|| {
                MapperError::binding(format!(
                    "Index {i} out of range in '{segment}' (size {len})"
                ))
            })?;
            *slot = value;
            Ok(())
        }
        Value::Map(map) => {
            map.insert(index.to_string(), value);
            Ok(())
        }
        other => Err(MapperError::binding(format!(
            "'{}' is not a collection but a {}",
            segment,
            other.type_label()
        ))),
    }
}

fn write_property(
    target: &mut Value,
    name: &str,
    value: Value,
    factory: &ReflectorFactory,
) -> MapperResult<()> {
    match target {
        Value::Null => {
            *target = Value::Map(BTreeMap::from([(name.to_string(), value)]));
            Ok(())
        }
        Value::Map(map) => {
            map.insert(name.to_string(), value);
            Ok(())
        }
        Value::Bean(bean) => {
            let reflector = factory.find_for_bean(&**bean);
            let setter = reflector.get_setter(name)?;
            let class = reflector.class_name().to_string();
            match Arc::get_mut(bean) {
                Some(owned) => setter.set(as_any_mut(owned), value),
                None => Err(MapperError::binding(format!(
                    "Cannot write '{name}' on a shared instance of '{class}'"
                ))),
            }
        }
        other => Err(MapperError::binding(format!(
            "There is no property '{}' on a value of type '{}'",
            name,
            other.type_label()
        ))),
    }
}
