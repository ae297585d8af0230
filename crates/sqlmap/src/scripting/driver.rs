use super::node::SqlNode;
use super::parser::ScriptParser;
use super::sql_source::SqlSource;
use crate::builder::ParameterType;
use crate::config::Configuration;
use crate::error::MapperResult;

/// Turns statement scripts into [`SqlSource`]s.
pub trait LanguageDriver: Send + Sync {
    fn create_sql_source(
        &self,
        configuration: &Configuration,
        script: &str,
        parameter_type: &ParameterType,
    ) -> MapperResult<SqlSource>;
}

/// The default driver.
///
/// A script starting with `<` is parsed as a tag template (with or without a
/// `<script>` root); anything else is plain SQL text, dynamic only if it
/// contains `${}`. Scripts without dynamic content become raw sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlLanguageDriver;

impl XmlLanguageDriver {
    pub fn parse_script(&self, configuration: &Configuration, script: &str) -> MapperResult<SqlNode> {
        if script.trim_start().starts_with('<') {
            ScriptParser::new(configuration.evaluator()).parse(script)
        } else {
            let node = SqlNode::text(script);
            if let SqlNode::Text(text) = &node {
                ScriptParser::new(configuration.evaluator()).validate_substitutions(text)?;
            }
            Ok(node)
        }
    }
}

impl LanguageDriver for XmlLanguageDriver {
    fn create_sql_source(
        &self,
        configuration: &Configuration,
        script: &str,
        parameter_type: &ParameterType,
    ) -> MapperResult<SqlSource> {
        let root = self.parse_script(configuration, script)?;
        if root.is_dynamic() {
            Ok(SqlSource::dynamic(root))
        } else {
            SqlSource::raw(configuration, &root, parameter_type)
        }
    }
}
