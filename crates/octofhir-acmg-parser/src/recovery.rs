//! Pinpointing syntax errors after a failed parse
//!
//! The recursive descent backtracks freely, so the position where it gave up
//! says little. A lexical scan over the source finds the first concrete fault
//! (unterminated string, unbalanced bracket, stray character, dangling operator).

use octofhir_acmg_diagnostics::{ACMG0001, ACMG0002, ACMG0003, ACMG0004, ACMG0005, AcmgError, Span};

const OPERATOR_CHARS: &[char] = &['=', '!', '<', '>', '+', '-', '*', '/'];
const TRAILING_WORDS: &[&str] = &["and", "or", "not", "in", "is"];

/// The token starting at `offset`: an identifier/number run, or a single character
pub(crate) fn token_at(source: &str, offset: usize) -> &str {
    let rest = source.get(offset..).unwrap_or("");
    let run = rest
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
        .map_or(rest.len(), |(i, _)| i);
    if run > 0 {
        &rest[..run]
    } else {
        rest.chars().next().map_or("", |c| &rest[..c.len_utf8()])
    }
}

pub(crate) fn locate_error(source: &str) -> AcmgError {
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                let mut closed = false;
                while let Some((_, inner)) = chars.next() {
                    if inner == '\\' {
                        chars.next();
                    } else if inner == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return AcmgError::parse_at(
                        ACMG0003,
                        "unterminated string literal",
                        source,
                        Span::new(i, source.len()),
                    );
                }
            }
            '(' | '[' => brackets.push((c, i)),
            ')' | ']' => {
                let expected = if c == ')' { '(' } else { '[' };
                match brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return AcmgError::parse_at(
                            ACMG0001,
                            format!("unexpected `{c}`"),
                            source,
                            Span::new(i, i + 1),
                        );
                    }
                }
            }
            c if c.is_ascii_alphanumeric()
                || c.is_whitespace()
                || OPERATOR_CHARS.contains(&c)
                || matches!(c, '_' | '.' | ',' | '@' | '$' | '\\') => {}
            other => {
                return AcmgError::parse_at(
                    ACMG0001,
                    format!("unexpected character `{other}`"),
                    source,
                    Span::new(i, i + other.len_utf8()),
                );
            }
        }
    }

    if let Some(err) = malformed_number(source) {
        return err;
    }

    if let Some((open, at)) = brackets.pop() {
        let code = if open == '(' { ACMG0005 } else { ACMG0002 };
        return AcmgError::parse_at(
            code,
            format!("`{open}` is never closed"),
            source,
            Span::new(at, at + 1),
        );
    }

    let trimmed = source.trim_end();
    let dangling = trimmed.ends_with(OPERATOR_CHARS)
        || trimmed.ends_with(',')
        || TRAILING_WORDS.iter().any(|w| {
            trimmed.ends_with(w)
                && trimmed[..trimmed.len() - w.len()]
                    .chars()
                    .last()
                    .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
        });
    if dangling {
        return AcmgError::parse_at(
            ACMG0002,
            "unexpected end of condition",
            source,
            Span::point(trimmed.len()),
        );
    }

    AcmgError::parse_at(
        ACMG0001,
        "invalid condition syntax",
        source,
        Span::new(0, source.len()),
    )
}

/// First numeric literal outside string literals that the number grammar
/// rejects (`0.5x`, `1.2.3`, `2e`)
pub(crate) fn malformed_number(source: &str) -> Option<AcmgError> {
    let mut quote = None;
    let mut previous = None;
    let mut chars = source.char_indices();

    while let Some((i, c)) = chars.next() {
        if let Some(open) = quote {
            if c == '\\' {
                chars.next();
            } else if c == open {
                quote = None;
            }
        } else if c == '\'' || c == '"' {
            quote = Some(c);
        } else if c.is_ascii_digit() && !previous.is_some_and(is_word_char) {
            let end = number_end(source, i);
            let text = &source[i..end];
            if !is_number(text) {
                return Some(AcmgError::parse_at(
                    ACMG0004,
                    format!("invalid number literal `{text}`"),
                    source,
                    Span::new(i, end),
                ));
            }
            while chars.as_str().len() > source.len() - end {
                chars.next();
            }
            previous = text.chars().last();
            continue;
        }
        previous = Some(c);
    }
    None
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// End of the word-like run starting at `start`, including an exponent sign
fn number_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        let signed_exponent = matches!(b, b'+' | b'-')
            && matches!(bytes[end - 1], b'e' | b'E')
            && bytes.get(end + 1).is_some_and(u8::is_ascii_digit);
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || signed_exponent {
            end += 1;
        } else {
            break;
        }
    }
    end
}

/// `digits [. digits] [(e|E) [+|-] digits]`
fn is_number(text: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(at) => (&text[..at], Some(&text[at + 1..])),
        None => (text, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(mantissa),
    };
    mantissa_ok && exponent.is_none_or(|e| all_digits(e.strip_prefix(['+', '-']).unwrap_or(e)))
}
