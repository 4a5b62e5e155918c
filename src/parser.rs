//! Nom-based parser for the plugin interface DDL.
//!
//! Produces raw [`Form`]s only; no directive is interpreted here. Use
//! [`crate::directive::lower_form`] to turn forms into tagged directives
//! and [`crate::builder::SchemaBuilder`] to apply them.
//!
//! Grammar sketch:
//!
//! ```text
//! script   := blanks (form blanks)*
//! form     := '(' head element* ')'
//! element  := ':' key node        ; keyword argument
//!           | form                ; child form, one level deep
//!           | node                ; positional argument
//! node     := string | number | boolean | nil | list
//! comment  := ';;' .* '\n'
//! ```

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, multispace1, none_of},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    error::{context, ContextError, ParseError as NomParseError},
    multi::many0,
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::ast::{Argument, AstNode, Form, Literal, Script, Span};

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete DDL script from source text.
///
/// Returns raw forms in source order. Parse failures are rendered with
/// `nom::error::convert_error` so the offending line is shown.
pub fn parse_script(input: &str) -> Result<Script, String> {
    match all_consuming(|i| script::<nom::error::VerboseError<&str>>(i, input))(input) {
        Ok((_, s)) => Ok(s),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

/// Parse a single directive form (for tooling/interactive use).
pub fn parse_single_form(input: &str) -> Result<Form, String> {
    let input = input.trim();
    match all_consuming(delimited(
        multispace0::<_, nom::error::VerboseError<&str>>,
        |i| form(i, input),
        multispace0,
    ))(input)
    {
        Ok((_, f)) => Ok(f),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn script<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    source: &'a str,
) -> IResult<&'a str, Script, E> {
    let (input, _) = blanks(input)?;
    let (input, forms) = many0(|i| {
        let (i, f) = form(i, source)?;
        let (i, _) = blanks(i)?;
        Ok((i, f))
    })(input)?;
    Ok((input, Script { forms }))
}

/// Skip whitespace and `;;` line comments.
fn blanks<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    let mut rest = input;
    loop {
        let (r, _) = multispace0::<_, E>(rest)?;
        rest = r;
        if let Ok((r, _)) = tag::<_, _, E>(";;")(rest) {
            let (r, _) = take_while::<_, _, E>(|c| c != '\n')(r)?;
            let (r, _) = opt(char('\n'))(r)?;
            rest = r;
            continue;
        }
        return Ok((rest, ()));
    }
}

// ============================================================================
// Forms
// ============================================================================

fn form<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    source: &'a str,
) -> IResult<&'a str, Form, E> {
    let start = source.len() - input.len();

    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, head) = kebab_identifier(input)?;

    let mut positional = Vec::new();
    let mut arguments = Vec::new();
    let mut children = Vec::new();

    let mut rest = input;
    loop {
        let (r, _) = blanks(rest)?;
        rest = r;

        if rest.starts_with(')') || rest.is_empty() {
            break;
        }
        if rest.starts_with(':') {
            let (r, arg) = argument(rest, source)?;
            arguments.push(arg);
            rest = r;
        } else if rest.starts_with('(') {
            let (r, child) = form(rest, source)?;
            children.push(child);
            rest = r;
        } else {
            let (r, val) = context("value", |i| node(i, source))(rest)?;
            positional.push(val);
            rest = r;
        }
    }

    let (input, _) = cut(context("closing parenthesis", char(')')))(rest)?;
    let end = source.len() - input.len();

    Ok((
        input,
        Form {
            head,
            positional,
            arguments,
            children,
            span: Span::new(start, end),
        },
    ))
}

// ============================================================================
// Arguments
// ============================================================================

fn argument<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    source: &'a str,
) -> IResult<&'a str, Argument, E> {
    let start = source.len() - input.len();

    let (input, _) = char(':')(input)?;
    let (input, key) = kebab_identifier(input)?;
    let (input, _) = multispace1(input)?;
    let (input, val) = context("value", |i| node(i, source))(input)?;

    let end = source.len() - input.len();

    Ok((
        input,
        Argument {
            key,
            value: val,
            span: Span::new(start, end),
        },
    ))
}

fn kebab_identifier<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_"), tag("-")))),
    ))(input)
    .map(|(rest, matched)| (rest, matched.to_string()))
}

// ============================================================================
// Values
// ============================================================================

fn node<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    source: &'a str,
) -> IResult<&'a str, AstNode, E> {
    alt((
        // Order matters: try specific patterns before generic ones
        map(boolean_literal, |b| AstNode::Literal(Literal::Boolean(b))),
        map(null_literal, |_| AstNode::Literal(Literal::Null)),
        string_literal,
        number_literal,
        |i| list_literal(i, source),
    ))(input)
}

// String literals with escape sequences
fn string_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, AstNode, E> {
    // escaped_transform does not match the empty body, so "" is special-cased
    if let Ok((rest, _)) = tag::<_, _, E>("\"\"")(input) {
        return Ok((rest, AstNode::Literal(Literal::String(String::new()))));
    }

    let (input, s) = delimited(
        char('"'),
        escaped_transform(
            none_of("\"\\"),
            '\\',
            alt((
                value('\n', char('n')),
                value('\r', char('r')),
                value('\t', char('t')),
                value('\\', char('\\')),
                value('"', char('"')),
            )),
        ),
        char('"'),
    )(input)?;

    Ok((input, AstNode::Literal(Literal::String(s))))
}

// Number literals (integer or float)
fn number_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, AstNode, E> {
    let (remaining, num_str) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;

    if num_str.contains('.') {
        match num_str.parse::<f64>() {
            Ok(f) => Ok((remaining, AstNode::Literal(Literal::Float(f)))),
            Err(_) => Err(nom::Err::Error(E::from_error_kind(
                input,
                nom::error::ErrorKind::Float,
            ))),
        }
    } else {
        match num_str.parse::<i64>() {
            Ok(i) => Ok((remaining, AstNode::Literal(Literal::Integer(i)))),
            Err(_) => Err(nom::Err::Error(E::from_error_kind(
                input,
                nom::error::ErrorKind::Digit,
            ))),
        }
    }
}

// Boolean literals
fn boolean_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, bool, E> {
    alt((value(true, tag("true")), value(false, tag("false"))))(input)
}

// Null literal
fn null_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    value((), tag("nil"))(input)
}

/// List literal: ["a" "b" "c"], commas optional
fn list_literal<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    source: &'a str,
) -> IResult<&'a str, AstNode, E> {
    let start = source.len() - input.len();

    let (input, _) = char('[')(input)?;
    let (input, _) = multispace0(input)?;

    let mut items = Vec::new();
    let mut remaining = input;

    while let Ok((rest, val)) = node::<E>(remaining, source) {
        items.push(val);
        remaining = rest;

        let (rest, _) = multispace0::<_, E>(remaining)?;
        remaining = rest;

        // Optional comma separator
        if let Ok((rest, _)) = char::<_, E>(',')(remaining) {
            let (rest, _) = multispace0::<_, E>(rest)?;
            remaining = rest;
        }
    }

    let (input, _) = multispace0(remaining)?;
    let (input, _) = char(']')(input)?;

    let end = source.len() - input.len();

    Ok((
        input,
        AstNode::List {
            items,
            span: Span::new(start, end),
        },
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_form() {
        let input = r#"(metadata :name "service" :timeout 60)"#;
        let result = parse_script(input).unwrap();

        assert_eq!(result.forms.len(), 1);
        let form = &result.forms[0];
        assert_eq!(form.head, "metadata");
        assert_eq!(form.arguments.len(), 2);
        assert_eq!(form.arguments[0].key, "name");
        assert_eq!(form.arguments[0].value.as_string(), Some("service"));
        assert_eq!(form.arguments[1].value.as_integer(), Some(60));
    }

    #[test]
    fn test_positional_name() {
        let input = r#"(action "status" :description "Get status")"#;
        let result = parse_script(input).unwrap();

        let form = &result.forms[0];
        assert_eq!(form.head, "action");
        assert_eq!(form.name(), Some("status"));
        assert_eq!(form.get_value("description").unwrap().as_string(), Some("Get status"));
    }

    #[test]
    fn test_nested_child_forms() {
        let input = r#"
            (action "status" :description "d"
              (input "service" :type "string" :maxlength 30)
              (output "status" :display-as "Status"))
        "#;
        let result = parse_script(input).unwrap();

        let form = &result.forms[0];
        assert_eq!(form.children.len(), 2);
        assert_eq!(form.children[0].head, "input");
        assert_eq!(form.children[0].name(), Some("service"));
        assert_eq!(form.children[0].get_value("maxlength").unwrap().as_integer(), Some(30));
        assert_eq!(form.children[1].head, "output");
    }

    #[test]
    fn test_comments_skipped() {
        let input = ";; service agent\n(discovery)\n;; trailing\n";
        let result = parse_script(input).unwrap();

        assert_eq!(result.forms.len(), 1);
        assert_eq!(result.forms[0].head, "discovery");
        assert!(result.forms[0].children.is_empty());
    }

    #[test]
    fn test_number_literals() {
        let input = r#"(x :int 42 :neg -17 :float 3.14)"#;
        let result = parse_script(input).unwrap();

        let form = &result.forms[0];
        assert_eq!(form.arguments[0].value.as_integer(), Some(42));
        assert_eq!(form.arguments[1].value.as_integer(), Some(-17));
        assert_eq!(form.arguments[2].value.as_float(), Some(3.14));
    }

    #[test]
    fn test_boolean_and_null() {
        let input = r#"(x :flag true :off false :empty nil)"#;
        let result = parse_script(input).unwrap();

        let form = &result.forms[0];
        assert_eq!(form.arguments[0].value.as_boolean(), Some(true));
        assert_eq!(form.arguments[1].value.as_boolean(), Some(false));
        assert!(matches!(
            form.arguments[2].value,
            AstNode::Literal(Literal::Null)
        ));
    }

    #[test]
    fn test_list_literal() {
        let input = r#"(capabilities ["classes" "facts" "identity"])"#;
        let result = parse_script(input).unwrap();

        let form = &result.forms[0];
        let items = form.positional[0].as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_string(), Some("classes"));
    }

    #[test]
    fn test_string_escapes() {
        let input = r#"(x :pattern "^[a-z\\-]+$" :empty "")"#;
        let result = parse_script(input).unwrap();

        let form = &result.forms[0];
        assert_eq!(form.arguments[0].value.as_string(), Some(r"^[a-z\-]+$"));
        assert_eq!(form.arguments[1].value.as_string(), Some(""));
    }

    #[test]
    fn test_unclosed_form_fails() {
        let input = r#"(action "status" :description "d""#;
        assert!(parse_script(input).is_err());
    }

    #[test]
    fn test_trailing_garbage_fails() {
        let input = "(discovery) garbage";
        assert!(parse_script(input).is_err());
    }

    #[test]
    fn test_round_trip_through_renderer() {
        let input = r#"(input "service" :prompt "Service" :type "string" :optional false :maxlength 30)"#;
        let script = parse_script(input).unwrap();
        let rendered = script.to_ddl_string();
        let reparsed = parse_script(&rendered).unwrap();

        assert_eq!(script.forms[0].head, reparsed.forms[0].head);
        assert_eq!(script.forms[0].arguments.len(), reparsed.forms[0].arguments.len());
        assert_eq!(
            script.forms[0].get_value("maxlength"),
            reparsed.forms[0].get_value("maxlength")
        );
    }

    #[test]
    fn test_parse_single_form() {
        let form = parse_single_form(r#"  (display "always")  "#).unwrap();
        assert_eq!(form.head, "display");
        assert_eq!(form.positional[0].as_string(), Some("always"));
    }
}
