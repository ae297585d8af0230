//! Expression language used by `test`, `collection` and `value` attributes.
//!
//! The grammar covers literals (`null`, `true`, `false`, numbers, quoted
//! strings), property paths with `.` and `[index]`, comparisons in symbol and
//! word form (`==`/`eq`, `!=`/`neq`, `<`/`lt`, `<=`/`lte`, `>`/`gt`,
//! `>=`/`gte`), logic (`and`/`&&`, `or`/`||`, `not`/`!`), arithmetic with
//! string concatenation on `+`, and a handful of methods such as `size()`,
//! `isEmpty()` and `trim()`.

mod cache;
mod eval;
mod lexer;
mod parser;


pub use eval::truthy;

use crate::error::{MapperError, MapperResult};
use crate::reflection::ReflectorFactory;
use crate::value::Value;
use cache::ExpressionCache;
use parser::Expr;
use std::sync::Arc;

/// Names visible to an expression.
pub trait ExpressionScope {
    /// Resolve a root identifier.
    fn lookup(&self, name: &str) -> MapperResult<Value>;

    /// Registry used to read bean properties.
    fn reflector_factory(&self) -> &ReflectorFactory;
}

/// Evaluates template expressions. Evaluation is synchronous and has no side
/// effects on the scope.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, scope: &dyn ExpressionScope) -> MapperResult<Value>;

    fn evaluate_boolean(&self, expression: &str, scope: &dyn ExpressionScope) -> MapperResult<bool> {
        self.evaluate(expression, scope).map(|v| truthy(&v))
    }

    /// Evaluate to `(index, item)` pairs: positions for lists, keys for maps.
    ///
    /// A null result is empty when `nullable`, otherwise a Binding error.
    fn evaluate_iterable(
        &self,
        expression: &str,
        scope: &dyn ExpressionScope,
        nullable: bool,
    ) -> MapperResult<Vec<(Value, Value)>> {
        let value = self.evaluate(expression, scope)?;
        iterate(expression, value, nullable)
    }

    /// Check the syntax without evaluating.
    fn validate(&self, expression: &str) -> MapperResult<()>;
}

fn iterate(expression: &str, value: Value, nullable: bool) -> MapperResult<Vec<(Value, Value)>> {
    match value {
        Value::Null if nullable => Ok(Vec::new()),
        Value::Null => Err(MapperError::binding(format!(
            "The expression '{expression}' evaluated to a null value."
        ))),
        Value::List(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (Value::Int(i as i64), item))
            .collect()),
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(key, item)| (Value::Text(key), item))
            .collect()),
        Value::Bytes(bytes) => Ok(bytes
            .into_iter()
            .enumerate()
            .map(|(i, b)| (Value::Int(i as i64), Value::Int(i64::from(b))))
            .collect()),
        Value::Json(json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => {
            iterate(expression, Value::from(json), nullable)
        }
        other => Err(MapperError::binding(format!(
            "Error evaluating expression '{}'. Return value ({}) was not iterable.",
            expression, other
        ))),
    }
}

/// The built-in evaluator, caching parsed expressions in a bounded LRU.
#[derive(Debug)]
pub struct DefaultEvaluator {
    cache: ExpressionCache,
}

impl Default for DefaultEvaluator {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}

impl DefaultEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` parsed expressions; zero disables caching.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: ExpressionCache::new(capacity),
        }
    }

    /// Number of parsed expressions currently cached.
    pub fn cached_expressions(&self) -> usize {
        self.cache.len()
    }

    fn parse(&self, expression: &str) -> MapperResult<Arc<Expr>> {
        self.cache.get_or_parse(expression, |text| {
            parser::parse(text).map_err(|e| {
                MapperError::configuration(format!(
                    "Error parsing expression '{text}'. Cause: {}",
                    cause(&e)
                ))
            })
        })
    }
}

impl ExpressionEvaluator for DefaultEvaluator {
    fn evaluate(&self, expression: &str, scope: &dyn ExpressionScope) -> MapperResult<Value> {
        let expr = self.parse(expression)?;
        eval::eval(&expr, scope).map_err(|e| match e {
            MapperError::Binding(msg) => MapperError::binding(format!(
                "Error evaluating expression '{expression}'. Cause: {msg}"
            )),
            other => other,
        })
    }

    fn validate(&self, expression: &str) -> MapperResult<()> {
        self.parse(expression).map(|_| ())
    }
}

fn cause(err: &MapperError) -> &str {
    match err {
        MapperError::Configuration(msg) | MapperError::Binding(msg) => msg,
        _ => "invalid expression",
    }
}
