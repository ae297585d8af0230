use super::parameter_expression::ParameterExpression;
use super::parameter_type::ParameterType;
use super::token::GenericTokenParser;
use crate::config::Configuration;
use crate::error::{MapperError, MapperResult};
use crate::mapping::{BoundSql, ParameterMapping, ParameterMode};
use crate::reflection::{MetaObject, PropertyTokenizer, TypeDesc};
use crate::value::Value;
use std::collections::BTreeMap;

const PARAMETER_PROPERTIES: &str =
    "javaType,jdbcType,mode,numericScale,resultMap,typeHandler,jdbcTypeName";

/// Final SQL plus its parameter mappings; binding only attaches the
/// parameter object.
#[derive(Debug, Clone)]
pub struct StaticSqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl StaticSqlSource {
    pub fn new(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self {
            sql: sql.into(),
            parameter_mappings,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn bound_sql(&self, parameter: &Value) -> BoundSql {
        BoundSql::new(
            self.sql.clone(),
            self.parameter_mappings.clone(),
            parameter.clone(),
        )
    }
}

/// Replaces `#{...}` placeholders with positional markers and records one
/// [`ParameterMapping`] per placeholder, in order of appearance.
pub struct SqlSourceBuilder<'a> {
    configuration: &'a Configuration,
}

impl<'a> SqlSourceBuilder<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        Self { configuration }
    }

    pub fn parse(
        &self,
        original_sql: &str,
        parameter_type: &ParameterType,
        additional_parameters: &BTreeMap<String, Value>,
    ) -> MapperResult<StaticSqlSource> {
        let settings = self.configuration.settings();
        let shrunk;
        let text = if settings.shrink_whitespaces_in_sql {
            shrunk = remove_extra_whitespaces(original_sql);
            shrunk.as_str()
        } else {
            original_sql
        };

        let mut mappings = Vec::new();
        let sql = GenericTokenParser::new("#{", "}").parse(text, |content| {
            let mapping = self.build_parameter_mapping(content, parameter_type, additional_parameters)?;
            mappings.push(mapping);
            Ok(settings.placeholder_style.marker(mappings.len()))
        })?;
        Ok(StaticSqlSource::new(sql, mappings))
    }

    fn build_parameter_mapping(
        &self,
        content: &str,
        parameter_type: &ParameterType,
        additional_parameters: &BTreeMap<String, Value>,
    ) -> MapperResult<ParameterMapping> {
        let expression = ParameterExpression::parse(content)?;
        if expression.get("expression").is_some() {
            return Err(MapperError::configuration(
                "Expression based parameters are not supported yet",
            ));
        }
        let property = match expression.property_name() {
            Some(p) if !p.is_empty() => p,
            _ => {
                return Err(MapperError::configuration(format!(
                    "Missing property name in mapping #{{{content}}}"
                )));
            }
        };

        let property_type = self.property_type(property, parameter_type, additional_parameters)?;
        let mut builder = ParameterMapping::builder(property, property_type);
        for (name, value) in expression.entries() {
            builder = match name {
                "property" => builder,
                "javaType" => builder.java_type(self.configuration.resolve_type_alias(value)?),
                "jdbcType" => builder.jdbc_type(value.parse()?),
                "mode" => match value.parse::<ParameterMode>()? {
                    ParameterMode::In => builder,
                    _ => {
                        return Err(MapperError::configuration(format!(
                            "Parameter mode {value} in mapping #{{{content}}} requires a callable statement, which is not supported"
                        )));
                    }
                },
                "numericScale" => builder.numeric_scale(value.parse().map_err(|_| {
                    MapperError::configuration(format!(
                        "Invalid numericScale '{value}' in mapping #{{{content}}}"
                    ))
                })?),
                "resultMap" => builder.result_map_id(value),
                "typeHandler" => builder.type_handler(value),
                "jdbcTypeName" => builder.jdbc_type_name(value),
                other => {
                    return Err(MapperError::configuration(format!(
                        "An invalid property '{other}' was found in mapping #{{{content}}}.  Valid properties are {PARAMETER_PROPERTIES}"
                    )));
                }
            };
        }
        Ok(builder.build())
    }

    fn property_type(
        &self,
        property: &str,
        parameter_type: &ParameterType,
        additional_parameters: &BTreeMap<String, Value>,
    ) -> MapperResult<TypeDesc> {
        let factory = self.configuration.reflector_factory();
        let first = PropertyTokenizer::new(property).name();
        if let Some(binding) = additional_parameters.get(first) {
            let scope = Value::Map(BTreeMap::from([(first.to_string(), binding.clone())]));
            let meta = MetaObject::new(&scope, factory);
            return Ok(meta.getter_type(property).unwrap_or_else(|_| TypeDesc::object()));
        }

        match parameter_type {
            ParameterType::Scalar(ty) => Ok(ty.clone()),
            ParameterType::Object | ParameterType::Map => Ok(TypeDesc::object()),
            ParameterType::Bean(class) => {
                let reflector = factory.find_for_class(class);
                let prop = PropertyTokenizer::new(property);
                if !reflector.has_getter(prop.name()) {
                    return Err(MapperError::binding(format!(
                        "There is no getter for property named '{}' in '{}' (placeholder #{{{}}})",
                        prop.name(),
                        reflector.class_name(),
                        property
                    )));
                }
                if prop.has_next() || prop.index().is_some() {
                    return Ok(TypeDesc::object());
                }
                reflector.getter_type(prop.name()).cloned()
            }
        }
    }
}

/// Collapse every whitespace run to a single space.
pub fn remove_extra_whitespaces(original: &str) -> String {
    original.split_whitespace().collect::<Vec<_>>().join(" ")
}
