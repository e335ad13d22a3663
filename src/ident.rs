//! Identifier grammar and back-tick quoting.

use crate::error::{DmlError, DmlResult};

/// Longest identifier MySQL accepts.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Check a single identifier segment: ASCII alphanumerics, `$` and `_`,
/// at most 64 bytes and no leading digit.
pub fn validate_identifier(name: &str) -> DmlResult<()> {
    if name.is_empty() {
        return Err(DmlError::not_valid("identifier is empty"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(DmlError::not_valid(format!(
            "identifier {name:?} exceeds {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if name.as_bytes()[0].is_ascii_digit() {
        return Err(DmlError::not_valid(format!(
            "identifier {name:?} starts with a digit"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '$' || *c == '_'))
    {
        return Err(DmlError::not_valid(format!(
            "identifier {name:?} contains invalid character {c:?}"
        )));
    }
    Ok(())
}

/// Split `qualifier.column` once, from the right.
///
/// `"a.b.c"` yields `("a.b", "c")`; a name without a dot has an empty
/// qualifier.
pub fn split_qualifier(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("", name),
    }
}

/// Join a qualifier and a column name.
pub fn qualify(qualifier: &str, column: &str) -> String {
    if qualifier.is_empty() {
        column.to_string()
    } else {
        format!("{qualifier}.{column}")
    }
}

/// A name wrapped in back-ticks or double quotes with every inner quote
/// character doubled.
fn is_quoted(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some((&quote, rest)) = bytes.split_first() else {
        return false;
    };
    if !matches!(quote, b'`' | b'"') {
        return false;
    }
    let Some((&last, inner)) = rest.split_last() else {
        return false;
    };
    if last != quote || inner.is_empty() {
        return false;
    }
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == quote {
            if inner.get(i + 1) != Some(&quote) {
                return false;
            }
            i += 1;
        }
        i += 1;
    }
    true
}

/// Write a possibly qualified identifier, back-tick quoting each segment.
///
/// Well-formed quoted names pass through, `*` is never quoted. Names
/// failing the grammar are written raw when `allow_unsafe` is set and
/// rejected otherwise.
pub fn write_identifier(w: &mut String, name: &str, allow_unsafe: bool) -> DmlResult<()> {
    if name == "*" || is_quoted(name) {
        w.push_str(name);
        return Ok(());
    }
    if let Err(e) = check_segments(name) {
        if allow_unsafe {
            w.push_str(name);
            return Ok(());
        }
        return Err(e);
    }
    for (i, segment) in name.split('.').enumerate() {
        if i > 0 {
            w.push('.');
        }
        if segment == "*" || is_quoted(segment) {
            w.push_str(segment);
        } else {
            w.push('`');
            w.push_str(segment);
            w.push('`');
        }
    }
    Ok(())
}

fn check_segments(name: &str) -> DmlResult<()> {
    let mut segments = name.split('.').peekable();
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        if (last && segment == "*") || is_quoted(segment) {
            continue;
        }
        validate_identifier(segment)?;
    }
    Ok(())
}

/// Write `name AS alias`, omitting the alias when empty.
pub fn write_aliased(
    w: &mut String,
    name: &str,
    alias: &str,
    allow_unsafe: bool,
) -> DmlResult<()> {
    write_identifier(w, name, allow_unsafe)?;
    write_alias(w, alias, allow_unsafe)
}

pub(crate) fn write_alias(w: &mut String, alias: &str, allow_unsafe: bool) -> DmlResult<()> {
    if !alias.is_empty() {
        w.push_str(" AS ");
        write_identifier(w, alias, allow_unsafe)?;
    }
    Ok(())
}

/// Quote an identifier into a new string.
pub fn quote(name: &str) -> DmlResult<String> {
    let mut w = String::with_capacity(name.len() + 4);
    write_identifier(&mut w, name, false)?;
    Ok(w)
}

/// Quote `name AS alias` into a new string.
pub fn quote_as(name: &str, alias: &str) -> DmlResult<String> {
    let mut w = String::with_capacity(name.len() + alias.len() + 8);
    write_aliased(&mut w, name, alias, false)?;
    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_quote_segments() {
        assert_eq!(quote("id").unwrap(), "`id`");
        assert_eq!(quote("t.id").unwrap(), "`t`.`id`");
        assert_eq!(quote("db.t.id").unwrap(), "`db`.`t`.`id`");
        assert_eq!(quote("t.*").unwrap(), "`t`.*");
        assert_eq!(quote("*").unwrap(), "*");
        assert_eq!(quote_as("customer_entity", "ce").unwrap(), "`customer_entity` AS `ce`");
    }

    #[test]
    fn test_already_quoted_passes_through() {
        assert_eq!(quote("`weird name`").unwrap(), "`weird name`");
        assert_eq!(quote("t.`order`").unwrap(), "`t`.`order`");
    }

    #[test]
    fn test_quoted_must_be_well_formed() {
        assert_eq!(quote("`odd``name`").unwrap(), "`odd``name`");
        assert_eq!(quote("\"a b\"").unwrap(), "\"a b\"");

        for name in [
            "`a` FROM t; DROP TABLE t; -- `",
            "`a`b`",
            "``",
            "`",
            "'id'",
            "t.`a` OR 1=1 `",
        ] {
            let err = quote(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotValid, "{name}");
        }
    }

    #[test]
    fn test_grammar() {
        assert!(validate_identifier("entity_id").is_ok());
        assert!(validate_identifier("$price").is_ok());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("a-b").is_err());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
        assert!(validate_identifier(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_unsafe_mode() {
        let err = quote("COUNT(*)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotValid);

        let mut w = String::new();
        write_identifier(&mut w, "COUNT(*)", true).unwrap();
        assert_eq!(w, "COUNT(*)");
    }

    #[test]
    fn test_split_qualifier() {
        assert_eq!(split_qualifier("t.col"), ("t", "col"));
        assert_eq!(split_qualifier("db.t.col"), ("db.t", "col"));
        assert_eq!(split_qualifier("col"), ("", "col"));
        assert_eq!(qualify("", "col"), "col");
        assert_eq!(qualify("t", "col"), "t.col");
    }
}
