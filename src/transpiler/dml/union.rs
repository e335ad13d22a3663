//! UNION SQL generation, including templates.

use std::borrow::Cow;

use crate::ast::*;
use crate::error::{DmlError, DmlResult};
use crate::pool;
use crate::transpiler::conditions::write_id_list;
use crate::transpiler::{BuilderBase, CachedSql, Placeholder, SqlWriter, Statement, ToSql, empty};

struct Rendered {
    sql: String,
    slots: Vec<Placeholder>,
    count: usize,
    trailing: Vec<Placeholder>,
}

impl Union {
    /// Number of template repetitions.
    fn repetitions(&self) -> DmlResult<usize> {
        let Some((first_key, first)) = self.replacements.first() else {
            return Ok(1);
        };
        if first.is_empty() {
            return Err(DmlError::empty(format!(
                "UNION template key {first_key:?} has no values"
            )));
        }
        for (key, values) in &self.replacements[1..] {
            if values.len() != first.len() {
                return Err(DmlError::mismatch(format!(
                    "UNION template key {key:?} has {} values, {first_key:?} has {}",
                    values.len(),
                    first.len()
                )));
            }
        }
        Ok(first.len())
    }

    fn member<'s>(&self, select: &'s Select, index: usize) -> Cow<'s, Select> {
        if self.preserve_result_set {
            let mut select = select.clone();
            select
                .columns
                .push(Id::expression(index.to_string()).alias(PRESERVE_RESULT_SET));
            Cow::Owned(select)
        } else {
            Cow::Borrowed(select)
        }
    }

    fn render(&self) -> DmlResult<Rendered> {
        if self.selects.is_empty() {
            return Err(empty("UNION", "SELECT"));
        }
        let joiner = if self.all { " UNION ALL " } else { " UNION " };
        let mut buf = pool::buffer();
        let mut w = SqlWriter::new(&mut buf);
        w.allow_unsafe = self.base.options.unsafe_identifiers;

        let (slots, count) = if self.is_template {
            let count = self.repetitions()?;
            let mut slots = Vec::new();
            for i in 0..count {
                if i > 0 {
                    w.push_str(joiner);
                }
                let mut part = pool::buffer();
                let mut pw = SqlWriter::new(&mut part);
                pw.allow_unsafe = w.allow_unsafe;
                self.member(&self.selects[0], i).to_sql(&mut pw)?;
                if i == 0 {
                    slots = pw.placeholders;
                }
                let mut text = part.clone();
                for (key, values) in &self.replacements {
                    text = text.replace(key.as_str(), &values[i]);
                }
                w.push('(');
                w.push_str(&text);
                w.push(')');
            }
            (slots, count)
        } else {
            for (i, select) in self.selects.iter().enumerate() {
                if i > 0 {
                    w.push_str(joiner);
                }
                w.push('(');
                self.member(select, i).to_sql(&mut w)?;
                w.push(')');
            }
            (std::mem::take(&mut w.placeholders), 1)
        };

        if self.preserve_result_set || !self.order_bys.is_empty() {
            w.push_str(" ORDER BY ");
            if self.preserve_result_set {
                w.ident(PRESERVE_RESULT_SET)?;
                if !self.order_bys.is_empty() {
                    w.push_str(", ");
                }
            }
            write_id_list(&mut w, &self.order_bys)?;
        }
        let trailing = w.placeholders;
        Ok(Rendered {
            sql: buf.clone(),
            slots,
            count,
            trailing,
        })
    }
}

impl ToSql for Union {
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()> {
        let rendered = self.render()?;
        w.push_str(&rendered.sql);
        for _ in 0..rendered.count {
            w.placeholders.extend(rendered.slots.iter().cloned());
        }
        w.placeholders.extend(rendered.trailing);
        Ok(())
    }
}

impl Statement for Union {
    fn base(&self) -> &BuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BuilderBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "UNION"
    }

    fn default_qualifier(&self) -> String {
        match self.selects.first() {
            Some(select) if self.is_template => select.default_qualifier(),
            _ => String::new(),
        }
    }

    fn compile(&self) -> DmlResult<CachedSql> {
        let rendered = self.render()?;
        let mut compiled = CachedSql::plain(self.kind(), rendered.sql, rendered.slots);
        compiled.template_count = rendered.count;
        compiled.trailing = rendered.trailing;
        compiled.qualifier = self.default_qualifier();
        Ok(compiled)
    }
}
