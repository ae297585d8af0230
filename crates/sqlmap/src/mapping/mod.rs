//! Statement metadata: parameter mappings, bound SQL and mapped statements.

mod bound_sql;
mod parameter;
mod statement;

pub use bound_sql::BoundSql;
pub use parameter::{JdbcType, ParameterMapping, ParameterMappingBuilder, ParameterMode};
pub use statement::{MappedStatement, MappedStatementBuilder, RowBounds, SqlCommandType};

#[cfg(test)]
mod tests;
