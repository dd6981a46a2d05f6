//! Lexical building blocks shared by the expression parser

use octofhir_acmg_ast::Literal;
use rust_decimal::Decimal;
use std::str::FromStr;
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Stream};
use winnow::token::{any, literal, one_of, take_while};

pub(crate) type Input<'a> = LocatingSlice<&'a str>;
pub(crate) type PResult<T> = winnow::ModalResult<T>;

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "True", "False", "None", "true", "false", "null",
];

pub(crate) fn backtrack<T>() -> PResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Skip whitespace (conditions authored in YAML block scalars may span lines)
pub(crate) fn ws(input: &mut Input<'_>) -> PResult<()> {
    take_while(0.., char::is_whitespace)
        .void()
        .parse_next(input)
}

/// Match a literal token
pub(crate) fn lit<'a>(input: &mut Input<'a>, token: &'static str) -> PResult<&'a str> {
    literal(token).parse_next(input)
}

/// Match a whole word: `in` must not match the start of `index`
pub(crate) fn keyword<'a>(input: &mut Input<'a>, word: &'static str) -> PResult<&'a str> {
    let checkpoint = input.checkpoint();
    let matched = lit(input, word)?;
    if input.chars().next().is_some_and(is_ident_continue) {
        input.reset(&checkpoint);
        return backtrack();
    }
    Ok(matched)
}

/// Keyword surrounded by optional whitespace; restores input when absent
pub(crate) fn padded_keyword(input: &mut Input<'_>, word: &'static str) -> bool {
    let checkpoint = input.checkpoint();
    let _ = ws(input);
    if keyword(input, word).is_ok() {
        let _ = ws(input);
        true
    } else {
        input.reset(&checkpoint);
        false
    }
}

/// Operator token surrounded by optional whitespace; restores input when absent
pub(crate) fn padded_symbol(input: &mut Input<'_>, symbol: &'static str) -> bool {
    let checkpoint = input.checkpoint();
    let _ = ws(input);
    if lit(input, symbol).is_ok() {
        let _ = ws(input);
        true
    } else {
        input.reset(&checkpoint);
        false
    }
}

/// Raw identifier, keywords included
pub(crate) fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (one_of(is_ident_start), take_while(0.., is_ident_continue))
        .take()
        .parse_next(input)
}

/// Identifier that is not a reserved word
pub(crate) fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    let checkpoint = input.checkpoint();
    let name = word(input)?;
    if is_keyword(name) {
        input.reset(&checkpoint);
        return backtrack();
    }
    Ok(name)
}

/// Dotted path segment; digits are allowed after the first segment (`scores.0`)
pub(crate) fn path_segment<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., is_ident_continue).parse_next(input)
}

/// `True`/`False`/`None` and their lowercase forms
pub(crate) fn constant(input: &mut Input<'_>) -> PResult<Literal> {
    let checkpoint = input.checkpoint();
    let name = word(input)?;
    match name {
        "True" | "true" => Ok(Literal::Boolean(true)),
        "False" | "false" => Ok(Literal::Boolean(false)),
        "None" | "null" => Ok(Literal::None),
        _ => {
            input.reset(&checkpoint);
            backtrack()
        }
    }
}

fn digits<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

/// Unsigned integer or decimal, with optional fraction and exponent (`2e-05`)
pub(crate) fn number(input: &mut Input<'_>) -> PResult<Literal> {
    let checkpoint = input.checkpoint();
    let text = (
        digits,
        opt(('.', digits)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digits)),
    )
        .take()
        .parse_next(input)?;

    if input.chars().next().is_some_and(is_ident_start) {
        input.reset(&checkpoint);
        return backtrack();
    }

    if !text.contains(['.', 'e', 'E']) {
        if let Ok(value) = text.parse::<i64>() {
            return Ok(Literal::Integer(value));
        }
    }
    let decimal = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str(text)
    };
    match decimal {
        Ok(value) => Ok(Literal::Decimal(value)),
        Err(_) => {
            input.reset(&checkpoint);
            backtrack()
        }
    }
}

/// Single or double quoted string with backslash escapes
pub(crate) fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut out = String::new();
    loop {
        let c: char = any.parse_next(input)?;
        match c {
            c if c == quote => return Ok(out),
            '\\' => {
                let escaped: char = any.parse_next(input)?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => out.push(other),
        }
    }
}

/// Balanced parenthesised label text, without the outer parentheses
pub(crate) fn balanced_label<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    lit(input, "(")?;
    let start = input.checkpoint();
    let mut consumed = 0usize;
    let mut depth = 1usize;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        consumed += c.len_utf8();
    }
    if depth != 0 {
        input.reset(&start);
        return backtrack();
    }
    let label = input.next_slice(consumed);
    lit(input, ")")?;
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run<T>(parser: impl Fn(&mut Input<'_>) -> PResult<T>, source: &str) -> (T, String) {
        let mut input = LocatingSlice::new(source);
        let value = parser(&mut input).unwrap_or_else(|e| panic!("failed on {source:?}: {e:?}"));
        (value, (*input).to_string())
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(run(number, "42 rest").0, Literal::Integer(42));
        assert_eq!(
            run(number, "0.15").0,
            Literal::Decimal(Decimal::from_str("0.15").unwrap())
        );
        assert_eq!(
            run(number, "2e-05").0,
            Literal::Decimal(Decimal::from_str("0.00002").unwrap())
        );
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        let mut input = LocatingSlice::new("index");
        assert!(keyword(&mut input, "in").is_err());
        assert_eq!(*input, "index");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(run(string_literal, r#"'it\'s'"#).0, "it's");
        assert_eq!(run(string_literal, r#""inframe""#).0, "inframe");
    }

    #[test]
    fn test_balanced_label() {
        let mut input = LocatingSlice::new("(max (subpop)) >= 1");
        let label = balanced_label(&mut input).unwrap();
        assert_eq!(label, "max (subpop)");
        assert_eq!(*input, " >= 1");
    }
}
