//! Expression parser using recursive descent with precedence climbing
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparisons (chainable),
//! `+ -`, `* /`, unary `-`, then postfix display labels and primaries.

use crate::combinators::{
    Input, PResult, backtrack, balanced_label, constant, identifier, is_ident_start, is_keyword, lit, number,
    padded_keyword, padded_symbol, path_segment, string_literal, word, ws,
};
use octofhir_acmg_ast::{
    AnnotatedExpr, BinaryOp, BinaryOpExpr, Expression, FunctionCall, Identifier, KeywordArg, Literal, Span, Spanned,
    UnaryOp, UnaryOpExpr, VariableRef,
};
use winnow::prelude::*;
use winnow::stream::Stream;

/// Entry point: a full condition expression
pub(crate) fn condition_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    ws(input)?;
    or_expression(input)
}

fn binary(left: Spanned<Expression>, op: BinaryOp, right: Spanned<Expression>) -> Spanned<Expression> {
    let span = left.span.merge(right.span);
    Spanned::new(
        Expression::Binary(BinaryOpExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }),
        span,
    )
}

fn or_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    let mut left = and_expression(input)?;

    while padded_keyword(input, "or") {
        let right = and_expression(input)?;
        left = binary(left, BinaryOp::Or, right);
    }

    Ok(left)
}

fn and_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    let mut left = not_expression(input)?;

    while padded_keyword(input, "and") {
        let right = not_expression(input)?;
        left = binary(left, BinaryOp::And, right);
    }

    Ok(left)
}

fn not_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    ws(input)?;
    let start = input.current_offset();
    if padded_keyword(input, "not") {
        let operand = not_expression(input)?;
        let span = Span::new(start, operand.span.end);
        return Ok(Spanned::new(
            Expression::Unary(UnaryOpExpr {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            }),
            span,
        ));
    }
    comparison_expression(input)
}

fn comparison_operator(input: &mut Input<'_>) -> Option<BinaryOp> {
    // Longest tokens first so `>=` is not read as `>`
    const SYMBOLS: &[(&str, BinaryOp)] = &[
        ("==", BinaryOp::Equal),
        ("!=", BinaryOp::NotEqual),
        (">=", BinaryOp::GreaterOrEqual),
        ("<=", BinaryOp::LessOrEqual),
        (">", BinaryOp::Greater),
        ("<", BinaryOp::Less),
    ];
    for (symbol, op) in SYMBOLS {
        if padded_symbol(input, *symbol) {
            return Some(*op);
        }
    }

    let checkpoint = input.checkpoint();
    if padded_keyword(input, "not") {
        if padded_keyword(input, "in") {
            return Some(BinaryOp::NotIn);
        }
        input.reset(&checkpoint);
        return None;
    }
    if padded_keyword(input, "in") {
        return Some(BinaryOp::In);
    }
    if padded_keyword(input, "is") {
        if padded_keyword(input, "not") {
            return Some(BinaryOp::IsNot);
        }
        return Some(BinaryOp::Is);
    }
    None
}

/// Comparisons chain like `0 < x <= 5`, meaning `0 < x and x <= 5`
fn comparison_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    let first = additive_expression(input)?;
    let mut links: Vec<(BinaryOp, Spanned<Expression>)> = Vec::new();

    while let Some(op) = comparison_operator(input) {
        let right = additive_expression(input)?;
        links.push((op, right));
    }

    let mut result: Option<Spanned<Expression>> = None;
    let mut left = first;
    for (op, right) in links {
        let comparison = binary(left, op, right.clone());
        result = Some(match result {
            Some(previous) => binary(previous, BinaryOp::And, comparison),
            None => comparison,
        });
        left = right;
    }

    Ok(result.unwrap_or(left))
}

fn additive_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    let mut left = multiplicative_expression(input)?;

    loop {
        let op = if padded_symbol(input, "+") {
            BinaryOp::Add
        } else if padded_symbol(input, "-") {
            BinaryOp::Subtract
        } else {
            break;
        };
        let right = multiplicative_expression(input)?;
        left = binary(left, op, right);
    }

    Ok(left)
}

fn multiplicative_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    let mut left = unary_expression(input)?;

    loop {
        let op = if padded_symbol(input, "*") {
            BinaryOp::Multiply
        } else if padded_symbol(input, "/") {
            BinaryOp::Divide
        } else {
            break;
        };
        let right = unary_expression(input)?;
        left = binary(left, op, right);
    }

    Ok(left)
}

fn unary_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    ws(input)?;
    let start = input.current_offset();
    if lit(input, "-").is_ok() {
        ws(input)?;
        let operand = unary_expression(input)?;
        let span = Span::new(start, operand.span.end);
        return Ok(Spanned::new(
            Expression::Unary(UnaryOpExpr {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            }),
            span,
        ));
    }
    labelled_expression(input)
}

/// A primary followed by any number of ` (display label)` suffixes.
///
/// A literal labelled with a variable name (`None (codon)`, `0.0004 (maf)`) is the
/// rendered form of a variable reference and parses back to that reference.
fn labelled_expression(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    let mut expr = primary(input)?;

    loop {
        let checkpoint = input.checkpoint();
        ws(input)?;
        if !input.starts_with('(') {
            input.reset(&checkpoint);
            break;
        }
        let Ok(label) = balanced_label(input) else {
            input.reset(&checkpoint);
            break;
        };
        let span = Span::new(expr.span.start, input.current_offset());
        let label = label.trim();

        expr = match expr.inner {
            Expression::Literal(rendered) if is_variable_path(label) => {
                let mut var = VariableRef::dotted(label.trim_start_matches('$'));
                var.rendered = Some(rendered);
                Spanned::new(Expression::Variable(var), span)
            }
            inner => Spanned::new(
                Expression::Annotated(AnnotatedExpr {
                    expr: Box::new(Spanned::new(inner, expr.span)),
                    label: label.to_string(),
                }),
                span,
            ),
        };
    }

    Ok(expr)
}

fn is_variable_path(label: &str) -> bool {
    let label = label.strip_prefix('$').unwrap_or(label);
    !is_keyword(label)
        && label.split('.').enumerate().all(|(i, segment)| {
            match segment.chars().next() {
                Some(c) if i == 0 && !is_ident_start(c) => false,
                Some(_) => segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                None => false,
            }
        })
}

fn primary(input: &mut Input<'_>) -> PResult<Spanned<Expression>> {
    ws(input)?;
    let start = input.current_offset();
    let expr = primary_inner(input)?;
    Ok(Spanned::new(expr, Span::new(start, input.current_offset())))
}

fn primary_inner(input: &mut Input<'_>) -> PResult<Expression> {
    let next = input.chars().next();
    match next {
        Some('\'' | '"') => Ok(Expression::Literal(Literal::String(string_literal(input)?))),
        Some(c) if c.is_ascii_digit() => Ok(Expression::Literal(number(input)?)),
        Some('[') => {
            lit(input, "[")?;
            let items = expression_list(input, "]")?;
            Ok(Expression::List(items))
        }
        Some('(') => parenthesized(input),
        Some('@' | '\\') => {
            let _ = lit(input, "\\");
            lit(input, "@")?;
            let name = identifier(input)?;
            ws(input)?;
            call_arguments(input, name, true)
        }
        Some('$') => {
            lit(input, "$")?;
            let mut var = variable_path(input)?;
            var.sigil = true;
            Ok(Expression::Variable(var))
        }
        Some(c) if is_ident_start(c) => {
            if let Ok(value) = constant(input) {
                return Ok(Expression::Literal(value));
            }
            let checkpoint = input.checkpoint();
            let name = identifier(input)?;
            if input.starts_with('(') {
                return call_arguments(input, name, false);
            }
            input.reset(&checkpoint);
            Ok(Expression::Variable(variable_path(input)?))
        }
        _ => backtrack(),
    }
}

fn variable_path(input: &mut Input<'_>) -> PResult<VariableRef> {
    let head = identifier(input)?;
    let mut path = vec![Identifier::new(head)];
    loop {
        let checkpoint = input.checkpoint();
        if lit(input, ".").is_err() {
            break;
        }
        match path_segment(input) {
            Ok(segment) => path.push(Identifier::new(segment)),
            Err(_) => {
                input.reset(&checkpoint);
                break;
            }
        }
    }
    Ok(VariableRef {
        path,
        sigil: false,
        rendered: None,
    })
}

/// `( expr )` groups; `(a, b)` and `()` are list literals
fn parenthesized(input: &mut Input<'_>) -> PResult<Expression> {
    lit(input, "(")?;
    ws(input)?;
    if lit(input, ")").is_ok() {
        return Ok(Expression::List(Vec::new()));
    }
    let first = or_expression(input)?;
    ws(input)?;
    if lit(input, ")").is_ok() {
        return Ok(first.inner);
    }
    lit(input, ",")?;
    let mut items = vec![first];
    items.extend(expression_list(input, ")")?);
    Ok(Expression::List(items))
}

/// Comma separated expressions up to `close`; a trailing comma is allowed
fn expression_list(input: &mut Input<'_>, close: &'static str) -> PResult<Vec<Spanned<Expression>>> {
    let mut items = Vec::new();
    loop {
        ws(input)?;
        if lit(input, close).is_ok() {
            return Ok(items);
        }
        items.push(or_expression(input)?);
        ws(input)?;
        if lit(input, ",").is_err() {
            ws(input)?;
            lit(input, close)?;
            return Ok(items);
        }
    }
}

/// Arguments of `name(...)`: positional first, then `key=value` pairs
fn call_arguments(input: &mut Input<'_>, name: &str, at_sigil: bool) -> PResult<Expression> {
    lit(input, "(")?;
    let mut args = Vec::new();
    let mut kwargs = Vec::new();

    loop {
        ws(input)?;
        if lit(input, ")").is_ok() {
            break;
        }

        if let Some(key) = keyword_name(input) {
            let value = or_expression(input)?;
            kwargs.push(KeywordArg {
                name: Identifier::new(key),
                value,
            });
        } else if kwargs.is_empty() {
            args.push(or_expression(input)?);
        } else {
            // positional argument after keyword arguments
            return backtrack();
        }

        ws(input)?;
        if lit(input, ",").is_err() {
            ws(input)?;
            lit(input, ")")?;
            break;
        }
    }

    Ok(Expression::Call(FunctionCall {
        name: Identifier::new(name),
        at_sigil,
        args,
        kwargs,
    }))
}

/// `name =` (but not `name ==`); restores input when absent
fn keyword_name<'a>(input: &mut Input<'a>) -> Option<&'a str> {
    let checkpoint = input.checkpoint();
    if let Ok(name) = word.parse_next(input) {
        let _ = ws(input);
        if input.starts_with('=') && !input.starts_with("==") {
            let _ = lit(input, "=");
            let _ = ws(input);
            return Some(name);
        }
    }
    input.reset(&checkpoint);
    None
}

/// Absolute byte offset of the next unread character
trait CurrentOffset {
    fn current_offset(&self) -> usize;
}

impl CurrentOffset for Input<'_> {
    fn current_offset(&self) -> usize {
        winnow::stream::Location::current_token_start(self)
    }
}
