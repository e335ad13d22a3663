//! Tokenizer for placeholder accounting in SQL text.
//!
//! Only what binding needs is recognised: `?`, `:name`, quoted strings and
//! identifiers, and comments. Placeholder characters inside quotes or
//! comments are never counted.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till, take_till1, take_until, take_while},
    character::complete::{anychar, char, satisfy},
    combinator::{map, recognize},
    error::{Error, ErrorKind},
    sequence::{pair, preceded, tuple},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Quoted,
    Comment,
    Placeholder,
    Named,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Name of a `:name` token without the colon.
    pub fn name(&self) -> Option<&'a str> {
        (self.kind == TokenKind::Named).then(|| &self.text[1..])
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    pub fn is_bindable(&self) -> bool {
        matches!(self.kind, TokenKind::Placeholder | TokenKind::Named)
    }
}

fn quoted(input: &str, quote: char, backslash_escapes: bool) -> IResult<&str, &str> {
    let (mut rest, _) = char(quote)(input)?;
    loop {
        let (after, _) = take_till(|c: char| c == quote || (backslash_escapes && c == '\\'))(rest)?;
        let mut chars = after.chars();
        match chars.next() {
            Some('\\') if backslash_escapes => {
                if chars.next().is_none() {
                    return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
                }
                rest = chars.as_str();
            }
            Some(_) => {
                let tail = chars.as_str();
                // doubled quote is an escaped quote
                if let Some(stripped) = tail.strip_prefix(quote) {
                    rest = stripped;
                    continue;
                }
                let consumed = input.len() - tail.len();
                return Ok((tail, &input[..consumed]));
            }
            None => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
        }
    }
}

fn named(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        char(':'),
        pair(
            satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        ),
    ))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(tag("-- "), take_till(|c: char| c == '\n'))),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

fn is_special(c: char) -> bool {
    matches!(c, '\'' | '"' | '`' | '?' | ':' | '-' | '/')
}

fn token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(|i| quoted(i, '\'', true), |t| (TokenKind::Quoted, t)),
        map(|i| quoted(i, '"', true), |t| (TokenKind::Quoted, t)),
        map(|i| quoted(i, '`', false), |t| (TokenKind::Quoted, t)),
        map(comment, |t| (TokenKind::Comment, t)),
        map(recognize(char('?')), |t| (TokenKind::Placeholder, t)),
        // `::` is never a named placeholder
        map(tag("::"), |t| (TokenKind::Text, t)),
        map(named, |t| (TokenKind::Named, t)),
        map(take_till1(is_special), |t| (TokenKind::Text, t)),
        map(recognize(anychar), |t| (TokenKind::Text, t)),
    ))(input)
}

/// Split SQL text into tokens covering the whole input.
pub fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = sql;
    while !rest.is_empty() {
        let offset = sql.len() - rest.len();
        match token(rest) {
            Ok((remaining, (kind, text))) => {
                tokens.push(Token { kind, text, offset });
                rest = remaining;
            }
            Err(_) => {
                tokens.push(Token {
                    kind: TokenKind::Text,
                    text: rest,
                    offset,
                });
                break;
            }
        }
    }
    tokens
}

/// Number of `?` placeholders outside quotes and comments.
pub fn count_placeholders(sql: &str) -> usize {
    tokenize(sql)
        .iter()
        .filter(|t| t.kind == TokenKind::Placeholder)
        .count()
}

/// Whether the text contains `:name` tokens outside quotes and comments.
pub fn has_named(sql: &str) -> bool {
    sql.contains(':') && tokenize(sql).iter().any(|t| t.kind == TokenKind::Named)
}

/// The placeholder at `tok` is the only thing between a `(` and a `)`.
pub fn wrapped_in_parens(sql: &str, tok: &Token<'_>) -> bool {
    sql[..tok.offset].trim_end().ends_with('(') && sql[tok.end()..].trim_start().starts_with(')')
}

/// The placeholder at `tok` is the operand of `IN` or `NOT IN`.
pub fn in_list_context(sql: &str, tok: &Token<'_>) -> bool {
    let before = sql[..tok.offset].trim_end();
    let before = before.strip_suffix('(').unwrap_or(before).trim_end();
    let bytes = before.as_bytes();
    if bytes.len() < 2 || !bytes[bytes.len() - 2..].eq_ignore_ascii_case(b"IN") {
        return false;
    }
    bytes.len() == 2 || !matches!(bytes[bytes.len() - 3], b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' | b'`')
}
