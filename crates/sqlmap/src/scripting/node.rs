use super::context::{DynamicContext, itemize_item};
use crate::builder::GenericTokenParser;
use crate::error::MapperResult;
use crate::value::Value;

const SUBSTITUTION: GenericTokenParser<'static> = GenericTokenParser::new("${", "}");

/// Template syntax tree. Built once and shared read-only across renders.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Text appended verbatim.
    StaticText(String),
    /// Text containing `${}` substitutions, resolved at render time.
    ///
    /// Substituted values are spliced into the SQL without escaping. Only
    /// feed trusted values through `${}`; use `#{}` for anything else.
    Text(String),
    /// Children rendered in order.
    Mixed(Vec<SqlNode>),
    If {
        test: String,
        contents: Box<SqlNode>,
    },
    /// The first `when` whose test holds, else `otherwise`.
    Choose {
        whens: Vec<SqlNode>,
        otherwise: Option<Box<SqlNode>>,
    },
    Trim(TrimNode),
    ForEach(ForEachNode),
    /// Evaluates `expression` and binds it under `name`.
    Bind {
        name: String,
        expression: String,
    },
}

impl SqlNode {
    pub fn static_text(text: impl Into<String>) -> Self {
        SqlNode::StaticText(text.into())
    }

    /// Plain text, or a substitution node if it contains `${}`.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if SUBSTITUTION.has_token(&text) {
            SqlNode::Text(text)
        } else {
            SqlNode::StaticText(text)
        }
    }

    pub fn mixed(contents: Vec<SqlNode>) -> Self {
        SqlNode::Mixed(contents)
    }

    pub fn if_node(test: impl Into<String>, contents: SqlNode) -> Self {
        SqlNode::If {
            test: test.into(),
            contents: Box::new(contents),
        }
    }

    /// `whens` are expected to be [`SqlNode::If`] nodes.
    pub fn choose(whens: Vec<SqlNode>, otherwise: Option<SqlNode>) -> Self {
        SqlNode::Choose {
            whens,
            otherwise: otherwise.map(Box::new),
        }
    }

    /// A `<where>`: prefixes `WHERE` and drops a leading `AND`/`OR`.
    pub fn where_clause(contents: SqlNode) -> Self {
        SqlNode::Trim(TrimNode::new(
            contents,
            Some("WHERE"),
            Some("AND |OR |AND\n|OR\n|AND\r|OR\r|AND\t|OR\t"),
            None,
            None,
        ))
    }

    /// A `<set>`: prefixes `SET` and drops leading and trailing commas.
    pub fn set_clause(contents: SqlNode) -> Self {
        SqlNode::Trim(TrimNode::new(contents, Some("SET"), Some(","), None, Some(",")))
    }

    pub fn bind(name: impl Into<String>, expression: impl Into<String>) -> Self {
        SqlNode::Bind {
            name: name.into(),
            expression: expression.into(),
        }
    }

    /// Whether rendering depends on the parameter object.
    pub fn is_dynamic(&self) -> bool {
        match self {
            SqlNode::StaticText(_) => false,
            SqlNode::Mixed(contents) => contents.iter().any(SqlNode::is_dynamic),
            _ => true,
        }
    }

    /// Render into `context`. Returns whether the node produced its content:
    /// `false` for an `if` whose test failed, `true` otherwise.
    pub fn apply(&self, context: &mut DynamicContext<'_>) -> MapperResult<bool> {
        match self {
            SqlNode::StaticText(text) => {
                context.append_sql(text)?;
                Ok(true)
            }
            SqlNode::Text(text) => {
                let substituted = substitute(text, context)?;
                context.append_sql(&substituted)?;
                Ok(true)
            }
            SqlNode::Mixed(contents) => {
                for node in contents {
                    node.apply(context)?;
                }
                Ok(true)
            }
            SqlNode::If { test, contents } => {
                if context.evaluator().evaluate_boolean(test, &*context)? {
                    contents.apply(context)?;
                    return Ok(true);
                }
                Ok(false)
            }
            SqlNode::Choose { whens, otherwise } => {
                for when in whens {
                    if when.apply(context)? {
                        return Ok(true);
                    }
                }
                if let Some(otherwise) = otherwise {
                    otherwise.apply(context)?;
                    return Ok(true);
                }
                Ok(false)
            }
            SqlNode::Trim(trim) => trim.apply(context),
            SqlNode::ForEach(foreach) => foreach.apply(context),
            SqlNode::Bind { name, expression } => {
                let value = context.evaluator().evaluate(expression, &*context)?;
                context.bind(name.clone(), value);
                Ok(true)
            }
        }
    }
}

fn substitute(text: &str, context: &mut DynamicContext<'_>) -> MapperResult<String> {
    // A null or scalar parameter is also reachable as `value`.
    let parameter = context.parameter().clone();
    if parameter.is_scalar() {
        context.bind("value", parameter);
    }

    let context = &*context;
    SUBSTITUTION.parse(text, |content| {
        let value = context.evaluator().evaluate(content, context)?;
        Ok(value.to_string())
    })
}

/// Prefix and suffix adjustment around rendered children.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimNode {
    contents: Box<SqlNode>,
    prefix: Option<String>,
    suffix: Option<String>,
    prefixes_to_override: Vec<String>,
    suffixes_to_override: Vec<String>,
}

impl TrimNode {
    /// Overrides are `|`-separated and matched case-insensitively.
    pub fn new(
        contents: SqlNode,
        prefix: Option<&str>,
        prefix_overrides: Option<&str>,
        suffix: Option<&str>,
        suffix_overrides: Option<&str>,
    ) -> Self {
        Self {
            contents: Box::new(contents),
            prefix: prefix.map(str::to_string),
            suffix: suffix.map(str::to_string),
            prefixes_to_override: parse_overrides(prefix_overrides),
            suffixes_to_override: parse_overrides(suffix_overrides),
        }
    }

    fn apply(&self, context: &mut DynamicContext<'_>) -> MapperResult<bool> {
        context.push_buffer();
        let rendered = self.contents.apply(context);
        let buffer = context.pop_buffer()?;
        let result = rendered?;

        let mut sql = buffer.trim().to_string();
        if !sql.is_empty() {
            let upper = sql.to_ascii_uppercase();
            self.apply_prefix(&mut sql, &upper);
            self.apply_suffix(&mut sql, &upper);
        }
        context.append_separated(&sql)?;
        Ok(result)
    }

    fn apply_prefix(&self, sql: &mut String, upper: &str) {
        if let Some(to_remove) = self
            .prefixes_to_override
            .iter()
            .find(|p| upper.starts_with(p.as_str()))
        {
            sql.replace_range(..to_remove.trim().len(), "");
        }
        if let Some(prefix) = &self.prefix {
            sql.insert(0, ' ');
            sql.insert_str(0, prefix);
        }
    }

    fn apply_suffix(&self, sql: &mut String, upper: &str) {
        if let Some(to_remove) = self
            .suffixes_to_override
            .iter()
            .find(|s| upper.ends_with(s.as_str()) || upper.ends_with(s.trim()))
        {
            let start = sql.len().saturating_sub(to_remove.trim().len());
            sql.truncate(start);
        }
        if let Some(suffix) = &self.suffix {
            sql.push(' ');
            sql.push_str(suffix);
        }
    }
}

fn parse_overrides(overrides: Option<&str>) -> Vec<String> {
    overrides
        .map(|list| {
            list.split('|')
                .filter(|token| !token.is_empty())
                .map(str::to_ascii_uppercase)
                .collect()
        })
        .unwrap_or_default()
}

/// Iteration over a collection, array or map.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachNode {
    contents: Box<SqlNode>,
    collection: String,
    nullable: bool,
    item: Option<String>,
    index: Option<String>,
    open: Option<String>,
    close: Option<String>,
    separator: Option<String>,
}

impl ForEachNode {
    pub fn new(collection: impl Into<String>, contents: SqlNode) -> Self {
        Self {
            contents: Box::new(contents),
            collection: collection.into(),
            nullable: false,
            item: None,
            index: None,
            open: None,
            close: None,
            separator: None,
        }
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = Some(open.into());
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = Some(close.into());
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// A null collection renders nothing instead of failing.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    fn apply(&self, context: &mut DynamicContext<'_>) -> MapperResult<bool> {
        let entries = context
            .evaluator()
            .evaluate_iterable(&self.collection, &*context, self.nullable)?;
        if entries.is_empty() {
            return Ok(true);
        }

        if let Some(open) = &self.open {
            context.append_sql(open)?;
        }
        let mut first = true;
        for (index, item) in entries {
            let prefix = if first { None } else { self.separator.clone() };
            let unique = context.next_unique_number();
            self.bind_var(context, self.index.as_deref(), index, unique);
            self.bind_var(context, self.item.as_deref(), item, unique);

            context.push_prefix(prefix);
            context.push_filter(self.item.clone(), self.index.clone(), unique);
            let rendered = self.contents.apply(context);
            context.pop_filter()?;
            let applied = context.pop_prefix()?;
            rendered?;

            if first {
                first = !applied;
            }
        }
        if let Some(close) = &self.close {
            context.append_sql(close)?;
        }

        for name in [&self.item, &self.index].into_iter().flatten() {
            context.unbind(name);
        }
        Ok(true)
    }

    fn bind_var(&self, context: &mut DynamicContext<'_>, name: Option<&str>, value: Value, unique: usize) {
        if let Some(name) = name {
            context.bind(name, value.clone());
            context.bind(itemize_item(name, unique), value);
        }
    }
}

impl From<ForEachNode> for SqlNode {
    fn from(node: ForEachNode) -> Self {
        SqlNode::ForEach(node)
    }
}

impl From<TrimNode> for SqlNode {
    fn from(node: TrimNode) -> Self {
        SqlNode::Trim(node)
    }
}
