//! Placeholder binding: turns rendered SQL with `#{}` placeholders into
//! positional markers plus ordered parameter mappings.

mod parameter_expression;
mod parameter_type;
mod sql_source_builder;
mod token;

pub use parameter_expression::ParameterExpression;
pub use parameter_type::ParameterType;
pub use sql_source_builder::{SqlSourceBuilder, StaticSqlSource, remove_extra_whitespaces};
pub use token::GenericTokenParser;

#[cfg(test)]
mod tests;
