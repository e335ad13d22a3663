//! MySQL/MariaDB literal formatting.

use std::fmt::Write;

use chrono::{NaiveDateTime, Timelike};

use crate::ast::Value;
use crate::error::{DmlError, DmlResult};

/// Where a literal is written, which decides how lists render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListContext {
    /// Operand of `IN` / `NOT IN`.
    pub in_list: bool,
    /// The placeholder already sits between parentheses.
    pub parenthesized: bool,
}

pub fn bool_literal(val: bool) -> &'static str {
    if val { "1" } else { "0" }
}

/// Quote a string with backslash escaping as `mysql_real_escape_string`.
pub fn write_string(w: &mut String, s: &str) {
    w.reserve(s.len() + 2);
    w.push('\'');
    for c in s.chars() {
        match c {
            '\0' => w.push_str("\\0"),
            '\n' => w.push_str("\\n"),
            '\r' => w.push_str("\\r"),
            '\\' => w.push_str("\\\\"),
            '\'' => w.push_str("\\'"),
            '"' => w.push_str("\\\""),
            '\x1a' => w.push_str("\\Z"),
            c => w.push(c),
        }
    }
    w.push('\'');
}

/// `X'0aff'`
pub fn write_bytes(w: &mut String, b: &[u8]) {
    w.push_str("X'");
    w.push_str(&hex::encode(b));
    w.push('\'');
}

/// `'2006-01-02 15:04:05'`, with microseconds when present.
pub fn write_time(w: &mut String, t: &NaiveDateTime) {
    if t.nanosecond() % 1_000_000_000 == 0 {
        let _ = write!(w, "'{}'", t.format("%Y-%m-%d %H:%M:%S"));
    } else {
        let _ = write!(w, "'{}'", t.format("%Y-%m-%d %H:%M:%S%.6f"));
    }
}

/// Shortest representation that parses back to the same `f64`, never in
/// exponent notation.
pub fn write_float(w: &mut String, f: f64) -> DmlResult<()> {
    if !f.is_finite() {
        return Err(DmlError::not_supported(format!(
            "float {f} has no SQL literal"
        )));
    }
    let _ = write!(w, "{f}");
    Ok(())
}

fn write_scalar(w: &mut String, v: &Value) -> DmlResult<()> {
    match v {
        Value::Null => w.push_str("NULL"),
        Value::Int(n) => {
            let _ = write!(w, "{n}");
        }
        Value::Uint(n) => {
            let _ = write!(w, "{n}");
        }
        Value::Float(f) => write_float(w, *f)?,
        Value::Bool(b) => w.push_str(bool_literal(*b)),
        Value::String(s) => write_string(w, s),
        Value::Bytes(b) => write_bytes(w, b),
        Value::Time(t) => write_time(w, t),
        Value::Driver(d) => {
            return Err(DmlError::not_supported(format!(
                "driver value of type {} cannot be interpolated",
                d.type_name()
            )));
        }
        list => {
            return Err(DmlError::not_supported(format!(
                "nested list {} cannot be interpolated",
                list.type_name()
            )));
        }
    }
    Ok(())
}

/// Write `v` as a SQL literal. Lists render as `(a,b,c)`, without the
/// parentheses when the placeholder already has them.
pub fn write_literal(w: &mut String, v: &Value, ctx: ListContext) -> DmlResult<()> {
    if !v.is_list() {
        return write_scalar(w, v);
    }
    if v.arity() == 0 {
        if !ctx.in_list {
            return Err(DmlError::not_supported(format!(
                "empty {} outside an IN list",
                v.type_name()
            )));
        }
        w.push_str(if ctx.parenthesized { "NULL" } else { "(NULL)" });
        return Ok(());
    }
    if !ctx.parenthesized {
        w.push('(');
    }
    for i in 0..v.arity() {
        if i > 0 {
            w.push(',');
        }
        if let Some(e) = v.element(i) {
            write_scalar(w, &e)?;
        }
    }
    if !ctx.parenthesized {
        w.push(')');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lit(v: Value) -> String {
        let mut w = String::new();
        write_literal(&mut w, &v, ListContext::default()).unwrap();
        w
    }

    #[test]
    fn test_scalars() {
        assert_eq!(lit(Value::Int(-42)), "-42");
        assert_eq!(lit(Value::Uint(u64::MAX)), "18446744073709551615");
        assert_eq!(lit(Value::Bool(true)), "1");
        assert_eq!(lit(Value::Null), "NULL");
        assert_eq!(lit(Value::Bytes(vec![0x0a, 0xff])), "X'0aff'");
        assert_eq!(lit(Value::Float(0.1)), "0.1");
        assert_eq!(lit(Value::Float(1e21)), "1000000000000000000000");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(lit(Value::String("O'Brien".into())), r"'O\'Brien'");
        assert_eq!(lit(Value::String("a\\b\n\"c\"\0".into())), r#"'a\\b\n\"c\"\0'"#);
        assert_eq!(lit(Value::String("`; --".into())), "'`; --'");
    }

    #[test]
    fn test_time() {
        let t = NaiveDate::from_ymd_opt(2006, 1, 2)
            .unwrap()
            .and_hms_opt(15, 4, 5)
            .unwrap();
        assert_eq!(lit(Value::Time(t)), "'2006-01-02 15:04:05'");
        let t = t.with_nanosecond(123_456_000).unwrap();
        assert_eq!(lit(Value::Time(t)), "'2006-01-02 15:04:05.123456'");
    }

    #[test]
    fn test_lists() {
        assert_eq!(lit(Value::Ints(vec![1, 2, 3])), "(1,2,3)");
        assert_eq!(
            lit(Value::NullStrings(vec![Some("a".into()), None])),
            "('a',NULL)"
        );
        let mut w = String::new();
        let ctx = ListContext { in_list: true, parenthesized: true };
        write_literal(&mut w, &Value::Ints(vec![4, 5]), ctx).unwrap();
        assert_eq!(w, "4,5");
    }

    #[test]
    fn test_empty_lists() {
        let mut w = String::new();
        let err = write_literal(&mut w, &Value::Ints(vec![]), ListContext::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotSupported);

        let ctx = ListContext { in_list: true, parenthesized: false };
        write_literal(&mut w, &Value::Ints(vec![]), ctx).unwrap();
        assert_eq!(w, "(NULL)");
    }

    #[test]
    fn test_unsupported() {
        let mut w = String::new();
        assert!(write_literal(&mut w, &Value::Float(f64::NAN), ListContext::default()).is_err());
        let err = write_literal(&mut w, &Value::driver(3u8), ListContext::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotSupported);
    }
}
