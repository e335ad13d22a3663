//! Interpolation: embedding bound values into the SQL text as literals.
//!
//! Only used when a caller opts in. The result carries no arguments and is
//! safe against injection as long as every string went through
//! [`mysql::write_string`](crate::transpiler::mysql::write_string).

use crate::ast::Value;
use crate::error::{DmlError, DmlResult, ResultExt};
use crate::expand::{Fill, reconcile};
use crate::transpiler::mysql::{self, ListContext};
use crate::transpiler::scan::{self, TokenKind};

/// Replace every `?` of `sql` with the literal of its argument.
///
/// Arguments line up with placeholders as in [`expand`](crate::expand::expand):
/// a list behind one placeholder renders as `(a,b,c)`, or `a,b,c` inside
/// existing parentheses.
pub fn interpolate(sql: &str, args: &[Value]) -> DmlResult<String> {
    let tokens = scan::tokenize(sql);
    let fills = reconcile(sql, &tokens, args)?;
    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let mut fills = fills.into_iter();
    for tok in &tokens {
        if tok.kind != TokenKind::Placeholder {
            out.push_str(tok.text);
            continue;
        }
        let written = match fills.next() {
            Some(Fill::Value(i)) => mysql::write_literal(&mut out, &args[i], ListContext::default()),
            Some(Fill::Element(i, e)) => match args[i].element(e) {
                Some(v) => mysql::write_literal(&mut out, &v, ListContext::default()),
                None => Err(DmlError::out_of_range(format!(
                    "element {} of argument {}",
                    e + 1,
                    i + 1
                ))),
            },
            Some(Fill::Whole(i)) => {
                let ctx = ListContext {
                    in_list: scan::in_list_context(sql, tok),
                    parenthesized: scan::wrapped_in_parens(sql, tok),
                };
                mysql::write_literal(&mut out, &args[i], ctx)
            }
            None => {
                out.push('?');
                Ok(())
            }
        };
        written.context_with(|| format!("placeholder at offset {} in {sql:?}", tok.offset))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interpolate_scalars() {
        let sql = interpolate(
            "SELECT * FROM `t` WHERE `name` = ? AND `id` = ? AND `active` = ?",
            &[Value::String("O'Brien".into()), Value::Int(3), Value::Bool(false)],
        )
        .unwrap();
        assert_eq!(
            sql,
            r"SELECT * FROM `t` WHERE `name` = 'O\'Brien' AND `id` = 3 AND `active` = 0"
        );
    }

    #[test]
    fn test_interpolate_lists() {
        let sql = interpolate(
            "SELECT 1 FROM t WHERE a IN (?) AND b IN ? AND c NOT IN (?)",
            &[
                Value::Ints(vec![1, 2]),
                Value::Strings(vec!["x".into()]),
                Value::Ints(vec![]),
            ],
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT 1 FROM t WHERE a IN (1,2) AND b IN ('x') AND c NOT IN (NULL)"
        );
    }

    #[test]
    fn test_injection_payloads_stay_quoted() {
        for payload in ["'; DROP TABLE t; --", "`x`", "a\\'b", "--", "\"; --"] {
            let sql = interpolate("SELECT ?", &[Value::String(payload.into())]).unwrap();
            let body = sql
                .strip_prefix("SELECT '")
                .and_then(|s| s.strip_suffix('\''))
                .unwrap();
            // every quote inside the literal is escaped
            let unescaped_quote = body
                .char_indices()
                .any(|(i, c)| c == '\'' && !body[..i].ends_with('\\'));
            assert!(!unescaped_quote, "{sql}");
        }
    }

    #[test]
    fn test_driver_values_are_rejected() {
        let err = interpolate("SELECT ?", &[Value::driver(1u8)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotSupported);
    }

    #[test]
    fn test_count_mismatch() {
        let err = interpolate("SELECT ?, ?", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Mismatch);
    }
}
