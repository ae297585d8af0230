//! Dynamic SQL templates.
//!
//! A template is a [`SqlNode`] tree. Rendering walks the tree against a
//! [`DynamicContext`], producing SQL text that still carries `#{}`
//! placeholders plus the bindings made along the way (loop variables,
//! `<bind>` values). [`SqlSource`] ties rendering to placeholder parsing.

mod context;
mod driver;
pub mod expr;
mod node;
mod parser;
mod sql_source;

pub use context::{DATABASE_ID_KEY, DynamicContext, PARAMETER_OBJECT_KEY, itemize_item};
pub use driver::{LanguageDriver, XmlLanguageDriver};
pub use expr::{DefaultEvaluator, ExpressionEvaluator, ExpressionScope};
pub use node::{ForEachNode, SqlNode, TrimNode};
pub use parser::ScriptParser;
pub use sql_source::SqlSource;
