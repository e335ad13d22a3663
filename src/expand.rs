//! Placeholder expansion and named-placeholder rewriting.
//!
//! Both work on the SQL text through the scanner, so `?` and `:name` inside
//! quotes or comments are left alone.

use crate::ast::Value;
use crate::error::{DmlError, DmlResult};
use crate::transpiler::Placeholder;
use crate::transpiler::scan::{self, Token, TokenKind};

/// What fills one `?` of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fill {
    /// A scalar argument.
    Value(usize),
    /// One element of a list argument whose placeholders are already
    /// spelled out in the text.
    Element(usize, usize),
    /// A whole list argument standing behind a single placeholder.
    Whole(usize),
}

/// Only commas and whitespace lie between the `n` placeholders starting at
/// `at`.
fn spelled_out(sql: &str, marks: &[Token<'_>], at: usize, n: usize) -> bool {
    if at + n > marks.len() {
        return false;
    }
    marks[at..at + n].windows(2).all(|pair| {
        let between = &sql[pair[0].end()..pair[1].offset];
        between.trim() == ","
    })
}

/// Line up the arguments with the `?` tokens of the text.
///
/// Scalars take one placeholder. A list takes as many placeholders as it
/// has elements when the text already lists them and enough placeholders
/// remain for the arguments after it; otherwise it takes one.
pub(crate) fn reconcile(sql: &str, tokens: &[Token<'_>], args: &[Value]) -> DmlResult<Vec<Fill>> {
    let marks: Vec<Token<'_>> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Placeholder)
        .copied()
        .collect();
    let mut fills = Vec::with_capacity(marks.len());
    for (i, arg) in args.iter().enumerate() {
        let at = fills.len();
        if at >= marks.len() {
            return Err(DmlError::mismatch(format!(
                "{} arguments but only {} placeholders in {sql:?}",
                args.len(),
                marks.len()
            )));
        }
        let n = arg.arity();
        let remaining_args = args.len() - i - 1;
        if arg.is_list()
            && n > 1
            && marks.len() >= at + n + remaining_args
            && spelled_out(sql, &marks, at, n)
        {
            fills.extend((0..n).map(|e| Fill::Element(i, e)));
        } else if arg.is_list() {
            fills.push(Fill::Whole(i));
        } else {
            fills.push(Fill::Value(i));
        }
    }
    if fills.len() != marks.len() {
        return Err(DmlError::mismatch(format!(
            "{} placeholders in {sql:?} but the arguments fill {}",
            marks.len(),
            fills.len()
        )));
    }
    Ok(fills)
}

fn element(args: &[Value], i: usize, e: usize) -> DmlResult<Value> {
    args[i].element(e).ok_or_else(|| {
        DmlError::out_of_range(format!("element {} of argument {}", e + 1, i + 1))
    })
}

/// Rewrite every `?` bound to a list into one placeholder per element and
/// flatten the arguments to match.
///
/// A placeholder already wrapped in parentheses gets `?,?,?`, a bare one
/// `(?,?,?)`. An empty list as the operand of `IN` becomes `(NULL)`.
pub fn expand(sql: &str, args: &[Value]) -> DmlResult<(String, Vec<Value>)> {
    let tokens = scan::tokenize(sql);
    let fills = reconcile(sql, &tokens, args)?;
    let mut out = String::with_capacity(sql.len() + args.len() * 2);
    let mut values = Vec::with_capacity(args.len());
    let mut fills = fills.into_iter();
    for tok in &tokens {
        if tok.kind != TokenKind::Placeholder {
            out.push_str(tok.text);
            continue;
        }
        match fills.next() {
            Some(Fill::Value(i)) => {
                out.push('?');
                values.push(args[i].clone());
            }
            Some(Fill::Element(i, e)) => {
                out.push('?');
                values.push(element(args, i, e)?);
            }
            Some(Fill::Whole(i)) => {
                let list = &args[i];
                let parenthesized = scan::wrapped_in_parens(sql, tok);
                if list.arity() == 0 {
                    if !scan::in_list_context(sql, tok) {
                        return Err(DmlError::not_supported(format!(
                            "empty {} for placeholder at offset {} outside an IN list",
                            list.type_name(),
                            tok.offset
                        )));
                    }
                    out.push_str(if parenthesized { "NULL" } else { "(NULL)" });
                    continue;
                }
                if !parenthesized {
                    out.push('(');
                }
                for e in 0..list.arity() {
                    if e > 0 {
                        out.push(',');
                    }
                    out.push('?');
                }
                if !parenthesized {
                    out.push(')');
                }
                list.flatten_into(&mut values);
            }
            None => out.push('?'),
        }
    }
    Ok((out, values))
}

/// Replace `:name` tokens with `?` and return the slots in text order.
///
/// `slots` is the slot list recorded for the text. A `?` takes the next
/// recorded slot; a `:name` takes it only when it is that same name, and
/// otherwise gets a fresh named slot.
pub fn rewrite_named(sql: &str, slots: &[Placeholder]) -> (String, Vec<Placeholder>) {
    let mut out = String::with_capacity(sql.len());
    let mut rewritten = Vec::with_capacity(slots.len());
    let mut recorded = slots.iter().peekable();
    for tok in scan::tokenize(sql) {
        match tok.kind {
            TokenKind::Placeholder => {
                out.push('?');
                rewritten.push(recorded.next().cloned().unwrap_or_else(|| Placeholder::new("")));
            }
            TokenKind::Named => {
                out.push('?');
                let name = tok.name().unwrap_or_default();
                match recorded.peek() {
                    Some(slot) if slot.name() == Some(name) => {
                        rewritten.push((*slot).clone());
                        recorded.next();
                    }
                    _ => rewritten.push(Placeholder::named(name)),
                }
            }
            _ => out.push_str(tok.text),
        }
    }
    (out, rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_bare_in() {
        let (sql, values) =
            expand("SELECT * FROM t WHERE id IN ?", &[Value::Ints(vec![1, 2, 3])]).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN (?,?,?)");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_expand_keeps_other_placeholders() {
        let args = [
            Value::Int(5),
            Value::Strings(vec!["a".into(), "b".into()]),
            Value::Bool(true),
        ];
        let (sql, values) =
            expand("SELECT * FROM t WHERE a = ? AND b IN (?) AND c = ?", &args).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b IN (?,?) AND c = ?");
        assert_eq!(scan::count_placeholders(&sql), values.len());
        assert_eq!(values[0], Value::Int(5));
        assert_eq!(values[3], Value::Bool(true));
    }

    #[test]
    fn test_already_expanded() {
        let args = [Value::Ints(vec![1, 2]), Value::Int(9)];
        let (sql, values) = expand("SELECT 1 FROM t WHERE x IN (?,?) AND y = ?", &args).unwrap();
        assert_eq!(sql, "SELECT 1 FROM t WHERE x IN (?,?) AND y = ?");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(9)]);
    }

    #[test]
    fn test_arity_mismatch() {
        let err = expand("SELECT ? , ?", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Mismatch);
        let err = expand("SELECT ?", &[Value::Int(1), Value::Int(2)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Mismatch);
    }

    #[test]
    fn test_empty_list() {
        let (sql, values) = expand("SELECT 1 FROM t WHERE x IN (?)", &[Value::Ints(vec![])]).unwrap();
        assert_eq!(sql, "SELECT 1 FROM t WHERE x IN (NULL)");
        assert!(values.is_empty());
        let err = expand("SELECT ?", &[Value::Ints(vec![])]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotSupported);
    }

    #[test]
    fn test_quoted_placeholders_ignored() {
        let (sql, values) = expand("SELECT '?' FROM t WHERE id IN ?", &[Value::Ints(vec![4, 5])]).unwrap();
        assert_eq!(sql, "SELECT '?' FROM t WHERE id IN (?,?)");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_rewrite_named() {
        let slots = vec![Placeholder::new("t.a"), Placeholder::named("store")];
        let (sql, rewritten) =
            rewrite_named("SELECT * FROM t WHERE a = ? AND s = :store AND w = :website", &slots);
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND s = ? AND w = ?");
        assert_eq!(
            rewritten,
            vec![
                Placeholder::new("t.a"),
                Placeholder::named("store"),
                Placeholder::named("website"),
            ]
        );
    }

    #[test]
    fn test_rewrite_named_skips_casts_and_quotes() {
        let (sql, rewritten) = rewrite_named("SELECT ':x', a::text FROM t WHERE b = :b", &[]);
        assert_eq!(sql, "SELECT ':x', a::text FROM t WHERE b = ?");
        assert_eq!(rewritten, vec![Placeholder::named("b")]);
    }
}
