//! SELECT SQL generation.

use crate::ast::*;
use crate::error::DmlResult;
use crate::transpiler::conditions::{write_clause, write_id, write_id_list, write_joins};
use crate::transpiler::{BuilderBase, SqlWriter, Statement, ToSql, empty};

impl ToSql for Select {
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()> {
        w.nested(self.base.options, |w| {
            if self.columns.is_empty() {
                return Err(empty("SELECT", "columns"));
            }
            w.push_str(if self.distinct { "SELECT DISTINCT " } else { "SELECT " });
            write_id_list(w, &self.columns)?;

            if let Some(table) = self.table.as_ref().filter(|t| !t.is_empty()) {
                w.push_str(" FROM ");
                write_id(w, table)?;
            }
            write_joins(w, &self.joins)?;
            write_clause(w, " WHERE ", &self.wheres)?;

            if !self.group_bys.is_empty() {
                w.push_str(" GROUP BY ");
                write_id_list(w, &self.group_bys)?;
            }
            write_clause(w, " HAVING ", &self.havings)?;

            if !self.order_bys.is_empty() {
                w.push_str(" ORDER BY ");
                write_id_list(w, &self.order_bys)?;
            }
            match self.limit {
                Some((0, count)) => w.push_str(&format!(" LIMIT {count}")),
                Some((offset, count)) => w.push_str(&format!(" LIMIT {offset},{count}")),
                None => {}
            }
            w.push_str(self.lock.sql());
            Ok(())
        })
    }
}

impl Statement for Select {
    fn base(&self) -> &BuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BuilderBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "SELECT"
    }

    fn default_qualifier(&self) -> String {
        self.table
            .as_ref()
            .map(|t| t.qualifier().to_string())
            .unwrap_or_default()
    }
}
