use super::parameter::ParameterMapping;
use crate::error::MapperResult;
use crate::reflection::{MetaObject, PropertyTokenizer, ReflectorFactory};
use crate::value::Value;
use std::collections::BTreeMap;

/// Final SQL text plus everything needed to bind its markers.
///
/// `parameter_mappings` is in marker order. `additional_parameters` holds
/// names produced while rendering (loop variables, `<bind>` values and
/// `_parameter`), which take precedence over the parameter object.
#[derive(Debug, Clone)]
pub struct BoundSql {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
    parameter_object: Value,
    additional_parameters: Value,
}

impl BoundSql {
    pub fn new(sql: String, parameter_mappings: Vec<ParameterMapping>, parameter_object: Value) -> Self {
        Self {
            sql,
            parameter_mappings,
            parameter_object,
            additional_parameters: Value::Map(BTreeMap::new()),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn parameter_object(&self) -> &Value {
        &self.parameter_object
    }

    pub fn additional_parameters(&self) -> &BTreeMap<String, Value> {
        static EMPTY: BTreeMap<String, Value> = BTreeMap::new();
        match &self.additional_parameters {
            Value::Map(map) => map,
            _ => &EMPTY,
        }
    }

    /// `name` is checked by its first path segment, so `item.id` matches a
    /// binding named `item`.
    pub fn has_additional_parameter(&self, name: &str) -> bool {
        let first = PropertyTokenizer::new(name).name();
        self.additional_parameters().contains_key(first)
    }

    pub fn set_additional_parameter(&mut self, name: impl Into<String>, value: Value) {
        if let Value::Map(map) = &mut self.additional_parameters {
            map.insert(name.into(), value);
        }
    }

    pub(crate) fn set_additional_parameters(&mut self, parameters: BTreeMap<String, Value>) {
        self.additional_parameters = Value::Map(parameters);
    }

    pub fn additional_parameter(&self, name: &str, factory: &ReflectorFactory) -> MapperResult<Value> {
        MetaObject::new(&self.additional_parameters, factory).get_value(name)
    }

    /// The value for every mapping, in marker order.
    ///
    /// Resolution per mapping: an additional parameter wins; a null parameter
    /// object gives null; a scalar parameter object binds itself; otherwise the
    /// property path is read from the parameter object.
    pub fn parameter_values(&self, factory: &ReflectorFactory) -> MapperResult<Vec<Value>> {
        self.parameter_mappings
            .iter()
            .map(|mapping| self.resolve(mapping.property(), factory))
            .collect()
    }

    fn resolve(&self, property: &str, factory: &ReflectorFactory) -> MapperResult<Value> {
        if self.has_additional_parameter(property) {
            return self.additional_parameter(property, factory);
        }
        if self.parameter_object.is_null() {
            return Ok(Value::Null);
        }
        if self.parameter_object.is_scalar() {
            return Ok(self.parameter_object.clone());
        }
        MetaObject::new(&self.parameter_object, factory).get_value(property)
    }
}
