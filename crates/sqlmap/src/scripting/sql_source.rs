use super::context::DynamicContext;
use super::node::SqlNode;
use crate::builder::{ParameterType, SqlSourceBuilder, StaticSqlSource};
use crate::config::Configuration;
use crate::error::MapperResult;
use crate::mapping::BoundSql;
use crate::value::Value;

/// Where a statement's SQL comes from.
#[derive(Debug, Clone)]
pub enum SqlSource {
    /// Final SQL and mappings supplied directly.
    Static(StaticSqlSource),
    /// A template without dynamic content, rendered and parsed once.
    Raw(StaticSqlSource),
    /// A template rendered against each parameter object.
    Dynamic(SqlNode),
}

impl SqlSource {
    /// Render `root` once without a parameter object and parse its
    /// placeholders against the declared `parameter_type`.
    pub fn raw(
        configuration: &Configuration,
        root: &SqlNode,
        parameter_type: &ParameterType,
    ) -> MapperResult<Self> {
        let mut context = DynamicContext::new(configuration, &Value::Null);
        root.apply(&mut context)?;
        let source = SqlSourceBuilder::new(configuration).parse(
            context.sql(),
            parameter_type,
            &Default::default(),
        )?;
        Ok(SqlSource::Raw(source))
    }

    pub fn dynamic(root: SqlNode) -> Self {
        SqlSource::Dynamic(root)
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, SqlSource::Dynamic(_))
    }

    /// SQL and parameter mappings for one execution.
    ///
    /// Dynamic sources render against `parameter` and parse with its runtime
    /// type; every binding made while rendering is attached to the result as
    /// an additional parameter.
    pub fn bound_sql(&self, parameter: &Value, configuration: &Configuration) -> MapperResult<BoundSql> {
        match self {
            SqlSource::Static(source) | SqlSource::Raw(source) => Ok(source.bound_sql(parameter)),
            SqlSource::Dynamic(root) => {
                let mut context = DynamicContext::new(configuration, parameter);
                root.apply(&mut context)?;
                let (sql, bindings) = context.into_parts();
                let source = SqlSourceBuilder::new(configuration).parse(
                    &sql,
                    &ParameterType::of(parameter),
                    &bindings,
                )?;
                let mut bound = source.bound_sql(parameter);
                bound.set_additional_parameters(bindings);
                Ok(bound)
            }
        }
    }
}
