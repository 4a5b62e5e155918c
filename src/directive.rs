//! Lowering of raw forms into tagged directives.
//!
//! The DDL is never evaluated as code; instead every form becomes one of
//! the variants below and the builder applies them in source order. Only
//! shape is checked here (a known head, the positional name where one is
//! required, no block where none is allowed); field-level invariants live
//! in the builder, which fails at the directive that violates them.
//!
//! `summarize` keeps its children as raw [`Form`]s: whether a child is an
//! aggregate-function reference depends on the registry and the process
//! role, which only the builder knows.

use crate::ast::{Argument, AstNode, Form, Span};
use crate::descriptor::SchemaError;

/// A single DDL directive, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Metadata {
        args: Vec<Argument>,
        span: Span,
    },
    Action {
        name: String,
        args: Vec<Argument>,
        body: Vec<Directive>,
        span: Span,
    },
    Input {
        name: String,
        args: Vec<Argument>,
        span: Span,
    },
    Output {
        name: String,
        args: Vec<Argument>,
        span: Span,
    },
    Display {
        policy: String,
        span: Span,
    },
    Summarize {
        calls: Vec<Form>,
        span: Span,
    },
    Dataquery {
        args: Vec<Argument>,
        body: Vec<Directive>,
        span: Span,
    },
    Discovery {
        body: Vec<Directive>,
        span: Span,
    },
    Capabilities {
        caps: Vec<AstNode>,
        span: Span,
    },
}

impl Directive {
    /// The directive name as written in the DDL.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Metadata { .. } => "metadata",
            Directive::Action { .. } => "action",
            Directive::Input { .. } => "input",
            Directive::Output { .. } => "output",
            Directive::Display { .. } => "display",
            Directive::Summarize { .. } => "summarize",
            Directive::Dataquery { .. } => "dataquery",
            Directive::Discovery { .. } => "discovery",
            Directive::Capabilities { .. } => "capabilities",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Directive::Metadata { span, .. }
            | Directive::Action { span, .. }
            | Directive::Input { span, .. }
            | Directive::Output { span, .. }
            | Directive::Display { span, .. }
            | Directive::Summarize { span, .. }
            | Directive::Dataquery { span, .. }
            | Directive::Discovery { span, .. }
            | Directive::Capabilities { span, .. } => *span,
        }
    }
}

/// Lower a whole script into directives, preserving source order.
pub fn lower_script(script: &crate::ast::Script) -> Result<Vec<Directive>, SchemaError> {
    script.forms.iter().map(lower_form).collect()
}

/// Lower one raw form into a tagged directive.
pub fn lower_form(form: &Form) -> Result<Directive, SchemaError> {
    let span = form.span;
    match form.head.as_str() {
        "metadata" => {
            no_block(form, "metadata")?;
            Ok(Directive::Metadata {
                args: form.arguments.clone(),
                span,
            })
        }
        "action" => Ok(Directive::Action {
            name: require_name(form, "action")?,
            args: form.arguments.clone(),
            body: lower_children(form)?,
            span,
        }),
        "input" => {
            no_block(form, "input")?;
            Ok(Directive::Input {
                name: require_name(form, "input")?,
                args: form.arguments.clone(),
                span,
            })
        }
        "output" => {
            no_block(form, "output")?;
            Ok(Directive::Output {
                name: require_name(form, "output")?,
                args: form.arguments.clone(),
                span,
            })
        }
        "display" => {
            no_block(form, "display")?;
            Ok(Directive::Display {
                policy: require_name(form, "display")?,
                span,
            })
        }
        "summarize" => Ok(Directive::Summarize {
            calls: form.children.clone(),
            span,
        }),
        "dataquery" => Ok(Directive::Dataquery {
            args: form.arguments.clone(),
            body: lower_children(form)?,
            span,
        }),
        "discovery" => Ok(Directive::Discovery {
            body: lower_children(form)?,
            span,
        }),
        "capabilities" => {
            no_block(form, "capabilities")?;
            // Accept both (capabilities ["a" "b"]) and (capabilities "a" "b")
            let mut caps = Vec::new();
            for pos in &form.positional {
                match pos {
                    AstNode::List { items, .. } => caps.extend(items.iter().cloned()),
                    other => caps.push(other.clone()),
                }
            }
            Ok(Directive::Capabilities { caps, span })
        }
        other => Err(SchemaError::UnknownDirective {
            name: other.to_string(),
            position: span.start,
        }),
    }
}

fn lower_children(form: &Form) -> Result<Vec<Directive>, SchemaError> {
    form.children.iter().map(lower_form).collect()
}

fn require_name(form: &Form, directive: &'static str) -> Result<String, SchemaError> {
    form.name()
        .map(str::to_string)
        .ok_or(SchemaError::MissingName {
            directive,
            position: form.span.start,
        })
}

fn no_block(form: &Form, directive: &'static str) -> Result<(), SchemaError> {
    if form.children.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::UnexpectedBlock {
            directive,
            position: form.span.start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_script;

    fn lower_one(src: &str) -> Result<Directive, SchemaError> {
        let script = parse_script(src).unwrap();
        lower_form(&script.forms[0])
    }

    #[test]
    fn test_lower_action_with_body() {
        let d = lower_one(
            r#"(action "status" :description "d"
                 (input "service" :type "string")
                 (display "always"))"#,
        )
        .unwrap();

        match d {
            Directive::Action { name, body, .. } => {
                assert_eq!(name, "status");
                assert_eq!(body.len(), 2);
                assert!(matches!(body[0], Directive::Input { .. }));
                assert!(matches!(body[1], Directive::Display { .. }));
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_directive() {
        let err = lower_one(r#"(sumary "status")"#).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownDirective {
                name: "sumary".to_string(),
                position: 0,
            }
        );
    }

    #[test]
    fn test_action_requires_name() {
        let err = lower_one(r#"(action :description "d")"#).unwrap_err();
        assert!(matches!(err, SchemaError::MissingName { directive: "action", .. }));
    }

    #[test]
    fn test_input_rejects_block() {
        let err = lower_one(r#"(input "x" :type "string" (display "ok"))"#).unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedBlock { directive: "input", .. }));
    }

    #[test]
    fn test_summarize_keeps_raw_calls() {
        let d = lower_one(r#"(summarize (summary "status") (average "time"))"#).unwrap();
        match d {
            Directive::Summarize { calls, .. } => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].head, "summary");
                assert_eq!(calls[1].head, "average");
            }
            other => panic!("expected summarize, got {:?}", other),
        }
    }

    #[test]
    fn test_capabilities_flatten() {
        let d = lower_one(r#"(capabilities ["classes" "facts"])"#).unwrap();
        match d {
            Directive::Capabilities { caps, .. } => {
                assert_eq!(caps.len(), 2);
                assert_eq!(caps[0].as_string(), Some("classes"));
            }
            other => panic!("expected capabilities, got {:?}", other),
        }
    }
}
