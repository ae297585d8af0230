use super::expr::ExpressionEvaluator;
use super::node::{ForEachNode, SqlNode, TrimNode};
use crate::builder::GenericTokenParser;
use crate::error::{MapperError, MapperResult};
use xml::attribute::OwnedAttribute;
use xml::reader::{ParserConfig, XmlEvent};

const SCRIPT: &str = "script";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Script,
    If,
    Choose,
    When,
    Otherwise,
    Trim,
    Where,
    Set,
    ForEach,
    Bind,
}

impl Tag {
    fn from_name(name: &str) -> MapperResult<Self> {
        Ok(match name {
            SCRIPT => Tag::Script,
            "if" => Tag::If,
            "choose" => Tag::Choose,
            "when" => Tag::When,
            "otherwise" => Tag::Otherwise,
            "trim" => Tag::Trim,
            "where" => Tag::Where,
            "set" => Tag::Set,
            "foreach" => Tag::ForEach,
            "bind" => Tag::Bind,
            other => {
                return Err(MapperError::configuration(format!(
                    "Unknown element <{other}> in SQL statement."
                )));
            }
        })
    }
}

enum Child {
    Node(SqlNode),
    When(SqlNode),
    Otherwise(SqlNode),
}

struct Frame {
    tag: Tag,
    attributes: Vec<OwnedAttribute>,
    children: Vec<Child>,
}

impl Frame {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local_name == name)
            .map(|a| a.value.as_str())
    }

    fn required(&self, name: &str) -> MapperResult<&str> {
        self.attr(name).ok_or_else(|| {
            MapperError::configuration(format!(
                "Missing required attribute '{}' on <{}>",
                name,
                self.tag_name()
            ))
        })
    }

    fn tag_name(&self) -> &'static str {
        match self.tag {
            Tag::Script => SCRIPT,
            Tag::If => "if",
            Tag::Choose => "choose",
            Tag::When => "when",
            Tag::Otherwise => "otherwise",
            Tag::Trim => "trim",
            Tag::Where => "where",
            Tag::Set => "set",
            Tag::ForEach => "foreach",
            Tag::Bind => "bind",
        }
    }

    fn contents(children: Vec<Child>) -> SqlNode {
        SqlNode::Mixed(
            children
                .into_iter()
                .filter_map(|child| match child {
                    Child::Node(node) => Some(node),
                    _ => None,
                })
                .collect(),
        )
    }
}

/// Compiles template scripts using the dynamic tags into [`SqlNode`] trees.
///
/// Expressions in `test`, `collection`, `value` and `${}` are checked with
/// the evaluator at compile time, so syntax errors surface when the
/// statement is registered rather than when it first runs.
pub struct ScriptParser<'a> {
    evaluator: &'a dyn ExpressionEvaluator,
}

impl<'a> ScriptParser<'a> {
    pub fn new(evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self { evaluator }
    }

    /// Parse `script`; a missing `<script>` root is added.
    pub fn parse(&self, script: &str) -> MapperResult<SqlNode> {
        let trimmed = script.trim_start();
        let wrapped;
        let source = if trimmed.starts_with("<script") {
            trimmed
        } else {
            wrapped = format!("<{SCRIPT}>{script}</{SCRIPT}>");
            wrapped.as_str()
        };

        let reader = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(true)
            .cdata_to_characters(true)
            .coalesce_characters(true)
            .create_reader(source.as_bytes());

        let mut stack: Vec<Frame> = Vec::new();
        let mut root = None;
        for event in reader {
            let event = event.map_err(|e| {
                MapperError::configuration(format!("Error parsing SQL script. Cause: {e}"))
            })?;
            match event {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let tag = Tag::from_name(&name.local_name)?;
                    if tag == Tag::Script && !stack.is_empty() {
                        return Err(MapperError::configuration(
                            "<script> can only be the root element",
                        ));
                    }
                    stack.push(Frame {
                        tag,
                        attributes,
                        children: Vec::new(),
                    });
                }
                XmlEvent::Characters(text) => {
                    let Some(frame) = stack.last_mut() else {
                        continue;
                    };
                    self.add_text(frame, text)?;
                }
                XmlEvent::EndElement { .. } => {
                    let Some(frame) = stack.pop() else {
                        return Err(MapperError::configuration("Unbalanced closing tag"));
                    };
                    let parent_tag = stack.last().map(|p| p.tag);
                    let child = self.build(frame, parent_tag)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(child),
                        None => root = Some(child),
                    }
                }
                _ => {}
            }
        }

        match root {
            Some(Child::Node(node)) => Ok(node),
            _ => Err(MapperError::configuration("Empty SQL script")),
        }
    }

    fn add_text(&self, frame: &mut Frame, text: String) -> MapperResult<()> {
        match frame.tag {
            Tag::Choose | Tag::Bind => {
                if !text.trim().is_empty() {
                    return Err(MapperError::configuration(format!(
                        "Text is not allowed directly inside <{}>",
                        frame.tag_name()
                    )));
                }
                Ok(())
            }
            _ => {
                let node = SqlNode::text(text);
                if let SqlNode::Text(text) = &node {
                    self.validate_substitutions(text)?;
                }
                frame.children.push(Child::Node(node));
                Ok(())
            }
        }
    }

    pub(crate) fn validate_substitutions(&self, text: &str) -> MapperResult<()> {
        GenericTokenParser::new("${", "}").parse(text, |content| {
            self.evaluator.validate(content)?;
            Ok(String::new())
        })?;
        Ok(())
    }

    fn build(&self, frame: Frame, parent: Option<Tag>) -> MapperResult<Child> {
        let in_choose = parent == Some(Tag::Choose);
        if matches!(frame.tag, Tag::When | Tag::Otherwise) != in_choose {
            return Err(MapperError::configuration(match frame.tag {
                Tag::When | Tag::Otherwise => {
                    format!("<{}> must be placed inside <choose>", frame.tag_name())
                }
                _ => format!(
                    "<{}> is not allowed inside <choose>; use <when> or <otherwise>",
                    frame.tag_name()
                ),
            }));
        }

        Ok(match frame.tag {
            Tag::Script => Child::Node(Frame::contents(frame.children)),
            Tag::If | Tag::When => {
                let test = frame.required("test")?.to_string();
                self.evaluator.validate(&test)?;
                let node = SqlNode::if_node(test, Frame::contents(frame.children));
                if frame.tag == Tag::When {
                    Child::When(node)
                } else {
                    Child::Node(node)
                }
            }
            Tag::Otherwise => Child::Otherwise(Frame::contents(frame.children)),
            Tag::Choose => {
                let mut whens = Vec::new();
                let mut otherwise = None;
                for child in frame.children {
                    match child {
                        Child::When(node) => whens.push(node),
                        Child::Otherwise(node) => {
                            if otherwise.replace(node).is_some() {
                                return Err(MapperError::configuration(
                                    "Too many default (otherwise) elements in choose statement.",
                                ));
                            }
                        }
                        Child::Node(_) => {}
                    }
                }
                Child::Node(SqlNode::choose(whens, otherwise))
            }
            Tag::Trim => Child::Node(
                TrimNode::new(
                    Frame::contents(frame.children),
                    frame_attr(&frame.attributes, "prefix"),
                    frame_attr(&frame.attributes, "prefixOverrides"),
                    frame_attr(&frame.attributes, "suffix"),
                    frame_attr(&frame.attributes, "suffixOverrides"),
                )
                .into(),
            ),
            Tag::Where => Child::Node(SqlNode::where_clause(Frame::contents(frame.children))),
            Tag::Set => Child::Node(SqlNode::set_clause(Frame::contents(frame.children))),
            Tag::ForEach => {
                let collection = frame.required("collection")?.to_string();
                self.evaluator.validate(&collection)?;
                let nullable = match frame.attr("nullable") {
                    None | Some("false") => false,
                    Some("true") => true,
                    Some(other) => {
                        return Err(MapperError::configuration(format!(
                            "Invalid value '{other}' for 'nullable' on <foreach>"
                        )));
                    }
                };
                let item = frame.attr("item").map(str::to_string);
                let index = frame.attr("index").map(str::to_string);
                let open = frame.attr("open").map(str::to_string);
                let close = frame.attr("close").map(str::to_string);
                let separator = frame.attr("separator").map(str::to_string);

                let mut node =
                    ForEachNode::new(collection, Frame::contents(frame.children)).nullable(nullable);
                if let Some(item) = item {
                    node = node.item(item);
                }
                if let Some(index) = index {
                    node = node.index(index);
                }
                if let Some(open) = open {
                    node = node.open(open);
                }
                if let Some(close) = close {
                    node = node.close(close);
                }
                if let Some(separator) = separator {
                    node = node.separator(separator);
                }
                Child::Node(node.into())
            }
            Tag::Bind => {
                let name = frame.required("name")?.to_string();
                let value = frame.required("value")?.to_string();
                self.evaluator.validate(&value)?;
                if !frame.children.is_empty() {
                    return Err(MapperError::configuration("<bind> must be empty"));
                }
                Child::Node(SqlNode::bind(name, value))
            }
        })
    }
}

fn frame_attr<'f>(attributes: &'f [OwnedAttribute], name: &str) -> Option<&'f str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
}
