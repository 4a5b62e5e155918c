//! AST for the plugin interface DDL.
//!
//! A DDL file is a flat sequence of directive *forms*:
//!
//! ```text
//! (metadata :name "service" :description "..." ...)
//! (action "status" :description "..."
//!   (input "service" :prompt "Service Name" :type "string" ...))
//! ```
//!
//! The parser produces these raw forms without interpreting them; the
//! `directive` module lowers them into tagged directives and the
//! `builder` module applies the directives to a descriptor. Keeping the
//! raw shape around means error messages can always point back at the
//! source and `summarize` bodies can be resolved lazily against the
//! aggregate-function registry.

use serde::{Deserialize, Serialize};

/// Byte-offset span into the DDL source, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Terminal values appearing in directive arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl Literal {
    /// Render the literal back to DDL source.
    pub fn to_ddl_string(&self) -> String {
        match self {
            Literal::String(s) => format!("{:?}", s),
            Literal::Integer(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Null => "nil".to_string(),
        }
    }
}

/// A value node: a literal or a list of nodes.
///
/// The DDL has no maps and no nested calls in value position; entity
/// structure is expressed through child forms instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    Literal(Literal),
    List { items: Vec<AstNode>, span: Span },
}

impl AstNode {
    pub fn string(s: impl Into<String>) -> Self {
        AstNode::Literal(Literal::String(s.into()))
    }

    pub fn integer(i: i64) -> Self {
        AstNode::Literal(Literal::Integer(i))
    }

    pub fn boolean(b: bool) -> Self {
        AstNode::Literal(Literal::Boolean(b))
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            AstNode::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AstNode::Literal(Literal::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AstNode::Literal(Literal::Float(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AstNode::Literal(Literal::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AstNode]> {
        match self {
            AstNode::List { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, AstNode::Literal(_))
    }

    /// Render the node back to DDL source.
    pub fn to_ddl_string(&self) -> String {
        match self {
            AstNode::Literal(lit) => lit.to_ddl_string(),
            AstNode::List { items, .. } => {
                let inner: Vec<String> = items.iter().map(|i| i.to_ddl_string()).collect();
                format!("[{}]", inner.join(" "))
            }
        }
    }

    /// Convert the node into a plain JSON value.
    ///
    /// Request arguments and declared `list`/`default` values share the
    /// same representation so list membership is exact JSON equality.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AstNode::Literal(Literal::String(s)) => serde_json::Value::from(s.clone()),
            AstNode::Literal(Literal::Integer(i)) => serde_json::Value::from(*i),
            AstNode::Literal(Literal::Float(f)) => serde_json::Value::from(*f),
            AstNode::Literal(Literal::Boolean(b)) => serde_json::Value::from(*b),
            AstNode::Literal(Literal::Null) => serde_json::Value::Null,
            AstNode::List { items, .. } => {
                serde_json::Value::Array(items.iter().map(|i| i.to_json()).collect())
            }
        }
    }
}

/// A keyword-value argument: `:key value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument key (without colon): "description", "display-as"
    pub key: String,
    /// Argument value
    pub value: AstNode,
    /// Source span for error reporting
    pub span: Span,
}

/// A directive form: `(head "name" :key value ... (child ...))`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    /// Directive name: "metadata", "action", "input", ...
    pub head: String,
    /// Positional arguments appearing before/between keyword arguments
    pub positional: Vec<AstNode>,
    /// Keyword arguments
    pub arguments: Vec<Argument>,
    /// Nested child forms (one level deep only)
    pub children: Vec<Form>,
    /// Source span for error reporting
    pub span: Span,
}

impl Form {
    /// Find a keyword argument by key name.
    pub fn get_arg(&self, key: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.key == key)
    }

    /// Find a keyword argument value by key name.
    pub fn get_value(&self, key: &str) -> Option<&AstNode> {
        self.get_arg(key).map(|a| &a.value)
    }

    /// First positional argument, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.positional.first().and_then(|n| n.as_string())
    }

    /// Render the form back to DDL source (single line).
    pub fn to_ddl_string(&self) -> String {
        let mut parts = vec![format!("({}", self.head)];

        for pos in &self.positional {
            parts.push(pos.to_ddl_string());
        }

        for arg in &self.arguments {
            parts.push(format!(":{} {}", arg.key, arg.value.to_ddl_string()));
        }

        for child in &self.children {
            parts.push(child.to_ddl_string());
        }

        parts.push(")".to_string());
        parts.join(" ")
    }
}

/// A complete DDL script: directive forms in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub forms: Vec<Form>,
}

impl Script {
    /// Render the script back to DDL source.
    pub fn to_ddl_string(&self) -> String {
        self.forms
            .iter()
            .map(|f| f.to_ddl_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
