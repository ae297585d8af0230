use crate::error::{MapperError, MapperResult};
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(&'static str),
}

/// Two-character symbols must be listed before their one-character prefixes.
const SYMBOLS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "+", "-", "*", "/", "%", "(", ")", "[",
    "]", ".", ",",
];

pub(super) fn tokenize(input: &str) -> MapperResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            tokens.push(number(input, &mut chars)?);
        } else if c == '\'' || c == '"' {
            chars.next();
            tokens.push(Token::Str(string(&mut chars, c, pos)?));
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = pos;
            let mut end = input.len();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    chars.next();
                } else {
                    end = i;
                    break;
                }
            }
            tokens.push(Token::Ident(input[start..end].to_string()));
        } else {
            let rest = &input[pos..];
            let Some(symbol) = SYMBOLS.iter().find(|s| rest.starts_with(**s)) else {
                return Err(MapperError::configuration(format!(
                    "unexpected character '{c}' at position {pos}"
                )));
            };
            for _ in 0..symbol.len() {
                chars.next();
            }
            tokens.push(Token::Symbol(symbol));
        }
    }
    Ok(tokens)
}

fn number(input: &str, chars: &mut Peekable<CharIndices<'_>>) -> MapperResult<Token> {
    let Some(&(start, _)) = chars.peek() else {
        return Err(MapperError::configuration("expected a number"));
    };
    let mut end = input.len();
    let mut is_float = false;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() {
            chars.next();
        } else if c == '.' && !is_float && next_is_digit(input, i) {
            is_float = true;
            chars.next();
        } else {
            end = i;
            break;
        }
    }
    let text = &input[start..end];

    // Java-style type suffixes are accepted and ignored.
    if let Some(&(_, c)) = chars.peek() {
        if matches!(c, 'L' | 'l') && !is_float {
            chars.next();
        } else if matches!(c, 'D' | 'd' | 'F' | 'f') {
            chars.next();
            is_float = true;
        }
    }

    if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|e| MapperError::configuration(format!("invalid number '{text}': {e}")))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|e| MapperError::configuration(format!("invalid number '{text}': {e}")))
    }
}

fn next_is_digit(input: &str, dot: usize) -> bool {
    input[dot + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

fn string(chars: &mut Peekable<CharIndices<'_>>, quote: char, start: usize) -> MapperResult<String> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c if c == quote => return Ok(out),
            c => out.push(c),
        }
    }
    Err(MapperError::configuration(format!(
        "unterminated string literal starting at position {start}"
    )))
}
