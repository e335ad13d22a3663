//! INSERT SQL generation.

use crate::ast::*;
use crate::error::DmlResult;
use crate::pool;
use crate::transpiler::conditions::write_assignments;
use crate::transpiler::{
    BuilderBase, CachedSql, Placeholder, RowTemplate, SqlWriter, Statement, ToSql, empty,
};

/// Write `rows` tuples of `width` placeholders: `(?,?),(?,?)`.
pub fn write_tuples(buf: &mut String, width: usize, rows: usize) {
    for row in 0..rows {
        if row > 0 {
            buf.push(',');
        }
        buf.push('(');
        for col in 0..width {
            if col > 0 {
                buf.push(',');
            }
            buf.push('?');
        }
        buf.push(')');
    }
}

struct Parts {
    head: String,
    slots: Vec<Placeholder>,
    tail: String,
    trailing: Vec<Placeholder>,
}

impl Insert {
    fn rows(&self) -> usize {
        self.row_count.max(1)
    }

    fn parts(&self) -> DmlResult<Parts> {
        if self.into.is_empty() {
            return Err(empty("INSERT", "table"));
        }
        let mut head = pool::buffer();
        let mut w = SqlWriter::new(&mut head);
        w.allow_unsafe = self.base.options.unsafe_identifiers;
        w.push_str(if self.replace { "REPLACE " } else { "INSERT " });
        if self.ignore {
            w.push_str("IGNORE ");
        }
        w.push_str("INTO ");
        w.ident(&self.into)?;
        if !self.columns.is_empty() {
            w.push_str(" (");
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    w.push(',');
                }
                w.ident(col)?;
            }
            w.push(')');
        }
        let slots = match &self.select {
            Some(select) => {
                w.push(' ');
                select.to_sql(&mut w)?;
                w.placeholders
            }
            None => {
                w.push_str(" VALUES ");
                self.columns.iter().map(Placeholder::new).collect()
            }
        };

        let mut tail = pool::buffer();
        let mut tw = SqlWriter::new(&mut tail);
        tw.allow_unsafe = self.base.options.unsafe_identifiers;
        if !self.on_duplicate_key.is_empty() {
            tw.push_str(" ON DUPLICATE KEY UPDATE ");
            write_assignments(&mut tw, &self.on_duplicate_key, true)?;
        }
        let trailing = tw.placeholders;

        Ok(Parts {
            head: head.clone(),
            slots,
            tail: tail.clone(),
            trailing,
        })
    }
}

impl ToSql for Insert {
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()> {
        let parts = self.parts()?;
        w.push_str(&parts.head);
        if self.select.is_some() {
            w.placeholders.extend(parts.slots);
        } else {
            write_tuples(w.buf, self.columns.len(), self.rows());
            for _ in 0..self.rows() {
                w.placeholders.extend(parts.slots.iter().cloned());
            }
        }
        w.push_str(&parts.tail);
        w.placeholders.extend(parts.trailing);
        Ok(())
    }
}

impl Statement for Insert {
    fn base(&self) -> &BuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BuilderBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        if self.replace { "REPLACE" } else { "INSERT" }
    }

    fn default_qualifier(&self) -> String {
        crate::ident::split_qualifier(&self.into).1.to_string()
    }

    fn compile(&self) -> DmlResult<CachedSql> {
        let parts = self.parts()?;
        let mut sql = String::with_capacity(parts.head.len() + parts.tail.len() + 64);
        sql.push_str(&parts.head);
        let (template_count, rows) = if self.select.is_some() {
            (1, None)
        } else {
            write_tuples(&mut sql, self.columns.len(), self.rows());
            let rows = RowTemplate {
                head: parts.head.clone(),
                tail: parts.tail.clone(),
                columns: self.columns.clone(),
            };
            (self.rows(), Some(rows))
        };
        sql.push_str(&parts.tail);
        Ok(CachedSql {
            kind: self.kind(),
            sql,
            placeholders: parts.slots,
            template_count,
            trailing: parts.trailing,
            rows,
            qualifier: self.default_qualifier(),
        })
    }
}
