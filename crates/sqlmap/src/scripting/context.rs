use super::expr::{ExpressionEvaluator, ExpressionScope};
use crate::builder::GenericTokenParser;
use crate::config::Configuration;
use crate::error::{MapperError, MapperResult};
use crate::reflection::{MetaObject, ReflectorFactory};
use crate::value::Value;
use std::collections::BTreeMap;

/// Binding name of the parameter object.
pub const PARAMETER_OBJECT_KEY: &str = "_parameter";
/// Binding name of the configured database id.
pub const DATABASE_ID_KEY: &str = "_databaseId";

// Escapes survive so the final binding pass still sees `\#{` as literal text.
const PLACEHOLDER: GenericTokenParser<'static> = GenericTokenParser::new("#{", "}").keeping_escapes();

/// A redirection of appended text, innermost last.
#[derive(Debug)]
enum Layer {
    /// Collects text for a trim node.
    Buffer(String),
    /// Inserts `prefix` before the first non-blank text of a loop iteration.
    Prefix {
        prefix: Option<String>,
        applied: bool,
    },
    /// Rewrites `#{item}` and `#{index}` to their per-iteration names.
    Filter {
        item: Option<String>,
        index: Option<String>,
        unique: usize,
    },
}

/// Accumulator for one render: SQL text, bindings and the parameter object.
///
/// Name lookup checks the bindings first, then the parameter object: a key of
/// a map parameter (or JSON object), a property of a bean parameter, or a
/// scalar parameter itself for any name it cannot otherwise resolve.
pub struct DynamicContext<'a> {
    configuration: &'a Configuration,
    parameter: Value,
    bindings: BTreeMap<String, Value>,
    sql: String,
    layers: Vec<Layer>,
    unique_number: usize,
}

impl<'a> DynamicContext<'a> {
    pub fn new(configuration: &'a Configuration, parameter: &Value) -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(PARAMETER_OBJECT_KEY.to_string(), parameter.clone());
        bindings.insert(
            DATABASE_ID_KEY.to_string(),
            configuration
                .settings()
                .database_id
                .clone()
                .map_or(Value::Null, Value::Text),
        );
        Self {
            configuration,
            parameter: parameter.clone(),
            bindings,
            sql: String::new(),
            layers: Vec::new(),
            unique_number: 0,
        }
    }

    pub fn configuration(&self) -> &'a Configuration {
        self.configuration
    }

    pub fn evaluator(&self) -> &'a dyn ExpressionEvaluator {
        self.configuration.evaluator()
    }

    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub(crate) fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    /// Next value of the per-render counter used for loop variable names.
    pub fn next_unique_number(&mut self) -> usize {
        let n = self.unique_number;
        self.unique_number += 1;
        n
    }

    /// Rendered SQL with surrounding whitespace removed.
    pub fn sql(&self) -> &str {
        self.sql.trim()
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, Value>) {
        (self.sql.trim().to_string(), self.bindings)
    }

    /// Append text through the active layers.
    pub fn append_sql(&mut self, sql: &str) -> MapperResult<()> {
        self.append_at(self.layers.len(), sql, false)
    }

    /// Append text that must not run into the preceding word.
    pub(crate) fn append_separated(&mut self, sql: &str) -> MapperResult<()> {
        self.append_at(self.layers.len(), sql, true)
    }

    fn append_at(&mut self, depth: usize, sql: &str, separated: bool) -> MapperResult<()> {
        let Some(i) = depth.checked_sub(1) else {
            push(&mut self.sql, sql, separated);
            return Ok(());
        };
        match &mut self.layers[i] {
            Layer::Buffer(buffer) => {
                push(buffer, sql, separated);
                Ok(())
            }
            Layer::Prefix { prefix, applied } => {
                let mut pending = None;
                if !*applied && !sql.trim().is_empty() {
                    *applied = true;
                    pending = prefix.clone();
                }
                if let Some(prefix) = pending {
                    self.append_at(i, &prefix, false)?;
                }
                self.append_at(i, sql, separated)
            }
            Layer::Filter {
                item,
                index,
                unique,
            } => {
                let rewritten = itemize_placeholders(sql, item.as_deref(), index.as_deref(), *unique)?;
                self.append_at(i, &rewritten, separated)
            }
        }
    }

    pub(crate) fn push_buffer(&mut self) {
        self.layers.push(Layer::Buffer(String::new()));
    }

    pub(crate) fn pop_buffer(&mut self) -> MapperResult<String> {
        match self.layers.pop() {
            Some(Layer::Buffer(buffer)) => Ok(buffer),
            _ => Err(MapperError::Other("unbalanced render layers".into())),
        }
    }

    pub(crate) fn push_prefix(&mut self, prefix: Option<String>) {
        self.layers.push(Layer::Prefix {
            prefix,
            applied: false,
        });
    }

    /// Remove the top prefix layer, reporting whether its prefix was applied.
    pub(crate) fn pop_prefix(&mut self) -> MapperResult<bool> {
        match self.layers.pop() {
            Some(Layer::Prefix { applied, .. }) => Ok(applied),
            _ => Err(MapperError::Other("unbalanced render layers".into())),
        }
    }

    pub(crate) fn push_filter(&mut self, item: Option<String>, index: Option<String>, unique: usize) {
        self.layers.push(Layer::Filter {
            item,
            index,
            unique,
        });
    }

    pub(crate) fn pop_filter(&mut self) -> MapperResult<()> {
        match self.layers.pop() {
            Some(Layer::Filter { .. }) => Ok(()),
            _ => Err(MapperError::Other("unbalanced render layers".into())),
        }
    }
}

fn push(target: &mut String, sql: &str, separated: bool) {
    if separated
        && !sql.is_empty()
        && target.chars().next_back().is_some_and(|c| !c.is_whitespace())
    {
        target.push(' ');
    }
    target.push_str(sql);
}

/// Synthetic binding name of a loop variable in iteration `unique`.
pub fn itemize_item(name: &str, unique: usize) -> String {
    format!("__frch_{name}_{unique}")
}

/// Rewrite `#{item...}` (or else `#{index...}`) placeholders to the
/// per-iteration names. The name must start the placeholder and be followed
/// by its end or one of `.`, `,`, `:` or whitespace.
fn itemize_placeholders(
    sql: &str,
    item: Option<&str>,
    index: Option<&str>,
    unique: usize,
) -> MapperResult<String> {
    PLACEHOLDER.parse(sql, |content| {
        let rewritten = item
            .and_then(|name| itemize_token(content, name, unique))
            .or_else(|| index.and_then(|name| itemize_token(content, name, unique)));
        Ok(format!("#{{{}}}", rewritten.as_deref().unwrap_or(content)))
    })
}

fn itemize_token(content: &str, name: &str, unique: usize) -> Option<String> {
    let rest = content.trim_start().strip_prefix(name)?;
    match rest.chars().next() {
        None => {}
        Some(c) if matches!(c, '.' | ',' | ':') || c.is_whitespace() => {}
        Some(_) => return None,
    }
    Some(format!("{}{}", itemize_item(name, unique), rest))
}

impl ExpressionScope for DynamicContext<'_> {
    fn lookup(&self, name: &str) -> MapperResult<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        let expanded = self.parameter.expand_json();
        match expanded.as_ref().unwrap_or(&self.parameter) {
            Value::Null => Ok(Value::Null),
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            bean @ Value::Bean(_) => {
                let meta = MetaObject::new(bean, self.reflector_factory());
                meta.get_value(name)
            }
            Value::List(_) => Err(MapperError::binding(format!(
                "There is no property '{name}' on a List parameter; use '_parameter' or wrap it in a map"
            ))),
            scalar => Ok(scalar.clone()),
        }
    }

    fn reflector_factory(&self) -> &ReflectorFactory {
        self.configuration.reflector_factory()
    }
}
