//! Writers for conditions, identifier lists, joins and assignments.

use super::{Placeholder, SqlWriter, ToSql, scan};
use crate::ast::*;
use crate::error::{DmlError, DmlResult};

/// Write `keyword` followed by the joined conditions. Nothing is written
/// for an empty list.
pub fn write_clause(w: &mut SqlWriter<'_>, keyword: &str, conds: &[Condition]) -> DmlResult<()> {
    if conds.is_empty() {
        return Ok(());
    }
    w.push_str(keyword);
    for (i, c) in conds.iter().enumerate() {
        if i > 0 {
            w.push_str(c.logical.sql());
        }
        write_condition(w, c)?;
    }
    Ok(())
}

/// Write one condition wrapped in parentheses.
pub fn write_condition(w: &mut SqlWriter<'_>, c: &Condition) -> DmlResult<()> {
    if !c.using.is_empty() {
        return Err(DmlError::not_valid(
            "USING columns are only valid in a JOIN",
        ));
    }
    w.push('(');
    if c.is_left_expression {
        let pure = matches!(c.right, Right::None)
            && !matches!(c.operator, Operator::Null | Operator::NotNull);
        if pure || scan::count_placeholders(&c.left) > 0 {
            let args = match &c.right {
                Right::Argument(v) => Some(v),
                _ => None,
            };
            w.expression(&c.left, args);
            w.push(')');
            return Ok(());
        }
        w.expression(&c.left, None);
    } else if !c.operator.is_exists() {
        if c.left.is_empty() {
            return Err(DmlError::not_valid("condition has no left operand"));
        }
        w.ident(&c.left)?;
    }
    write_right(w, c)?;
    w.push(')');
    Ok(())
}

fn write_spec(w: &mut SqlWriter<'_>, spec: &PlaceholderSpec, column: &str, position: usize) {
    match spec {
        PlaceholderSpec::Positional => w.placeholder(Placeholder::new(column).at(position)),
        PlaceholderSpec::Named(name) => w.named(name, position),
    }
}

fn write_right(w: &mut SqlWriter<'_>, c: &Condition) -> DmlResult<()> {
    let op = c.operator;
    let column = c.slot_column();
    match &c.right {
        Right::None if op == Operator::NotNull => w.push_str(" IS NOT NULL"),
        Right::None => w.push_str(" IS NULL"),
        _ if matches!(op, Operator::Null | Operator::NotNull) => w.push_str(op.sql()),
        Right::Column(other) => {
            w.push_str(op.sql());
            w.ident(other)?;
        }
        Right::Expression(e) => {
            w.push_str(op.sql());
            w.expression(e, None);
        }
        Right::Subquery(select) => {
            w.push_str(op.sql());
            w.push('(');
            select.to_sql(w)?;
            w.push(')');
        }
        Right::Placeholder(spec) if op.is_list() => {
            w.push_str(op.sql());
            w.push('(');
            write_spec(w, spec, column, 0);
            w.push(')');
        }
        Right::Placeholder(spec) if op.is_between() => {
            w.push_str(op.sql());
            write_spec(w, spec, column, 1);
            w.push_str(" AND ");
            write_spec(w, spec, column, 2);
        }
        Right::Placeholder(spec) => {
            w.push_str(op.sql());
            write_spec(w, spec, column, 0);
        }
        Right::Argument(v) if op.is_list() => {
            w.push_str(op.sql());
            w.push('(');
            if !v.is_list() {
                w.placeholder(Placeholder::new(column).with_value(v.clone()));
            } else if v.arity() == 0 {
                w.push_str("NULL");
            } else {
                w.placeholder_list(column, v);
            }
            w.push(')');
        }
        Right::Argument(v) if op.is_between() => {
            if !v.is_list() || v.arity() != 2 {
                return Err(DmlError::not_valid(format!(
                    "BETWEEN on {column:?} needs exactly two values, got {}",
                    v.type_name()
                )));
            }
            w.push_str(op.sql());
            w.placeholder(Placeholder::new(column).at(1).with_value(v.clone()));
            w.push_str(" AND ");
            w.placeholder(Placeholder::new(column).at(2).with_value(v.clone()));
        }
        Right::Argument(v) => {
            w.push_str(op.sql());
            w.placeholder(Placeholder::new(column).with_value(v.clone()));
        }
    }
    Ok(())
}

/// Write an identifier with alias and sort order.
pub fn write_id(w: &mut SqlWriter<'_>, id: &Id) -> DmlResult<()> {
    match &id.source {
        IdSource::Name(name) => w.ident(name)?,
        IdSource::Expression(sql) => w.expression(sql, None),
        IdSource::Derived(select) => {
            w.push('(');
            select.to_sql(w)?;
            w.push(')');
        }
    }
    w.alias(&id.alias)?;
    w.push_str(id.sort.sql());
    Ok(())
}

pub fn write_id_list(w: &mut SqlWriter<'_>, ids: &[Id]) -> DmlResult<()> {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        write_id(w, id)?;
    }
    Ok(())
}

pub fn write_joins(w: &mut SqlWriter<'_>, joins: &[Join]) -> DmlResult<()> {
    for join in joins {
        w.push(' ');
        w.push_str(join.kind.sql());
        w.push(' ');
        write_id(w, &join.table)?;
        if let Some(using) = join.on.iter().find(|c| !c.using.is_empty()) {
            w.push_str(" USING (");
            for (i, col) in using.using.iter().enumerate() {
                if i > 0 {
                    w.push(',');
                }
                w.ident(col)?;
            }
            w.push(')');
        } else {
            write_clause(w, " ON ", &join.on)?;
        }
    }
    Ok(())
}

/// Write `col=value` pairs of a SET or ON DUPLICATE KEY UPDATE clause.
/// Without a right side, SET binds a placeholder and ON DUPLICATE KEY
/// refers to the inserted `VALUES(col)`.
pub fn write_assignments(
    w: &mut SqlWriter<'_>,
    conds: &[Condition],
    on_duplicate: bool,
) -> DmlResult<()> {
    for (i, c) in conds.iter().enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        if c.is_left_expression {
            w.expression(&c.left, None);
        } else {
            w.ident(&c.left)?;
        }
        w.push('=');
        let column = c.slot_column();
        match &c.right {
            Right::None if on_duplicate => {
                w.push_str("VALUES(");
                w.ident(&c.left)?;
                w.push(')');
            }
            Right::None | Right::Placeholder(PlaceholderSpec::Positional) => {
                w.placeholder(Placeholder::new(column));
            }
            Right::Placeholder(PlaceholderSpec::Named(name)) => w.named(name, 0),
            Right::Argument(v) => w.placeholder(Placeholder::new(column).with_value(v.clone())),
            Right::Column(other) => w.ident(other)?,
            Right::Expression(sql) => w.expression(sql, None),
            Right::Subquery(select) => {
                w.push('(');
                select.to_sql(w)?;
                w.push(')');
            }
        }
    }
    Ok(())
}
