//! UPDATE SQL generation.

use crate::ast::*;
use crate::error::DmlResult;
use crate::transpiler::conditions::{write_assignments, write_clause, write_id, write_id_list};
use crate::transpiler::{BuilderBase, SqlWriter, Statement, ToSql, empty};

impl ToSql for Update {
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()> {
        w.nested(self.base.options, |w| {
            let table = self
                .table
                .as_ref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| empty("UPDATE", "table"))?;
            if self.set.is_empty() {
                return Err(empty("UPDATE", "columns"));
            }
            w.push_str("UPDATE ");
            write_id(w, table)?;
            w.push_str(" SET ");
            write_assignments(w, &self.set, false)?;
            write_clause(w, " WHERE ", &self.wheres)?;
            if !self.order_bys.is_empty() {
                w.push_str(" ORDER BY ");
                write_id_list(w, &self.order_bys)?;
            }
            if let Some(limit) = self.limit {
                w.push_str(&format!(" LIMIT {limit}"));
            }
            Ok(())
        })
    }
}

impl Statement for Update {
    fn base(&self) -> &BuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BuilderBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "UPDATE"
    }

    fn default_qualifier(&self) -> String {
        self.table
            .as_ref()
            .map(|t| t.qualifier().to_string())
            .unwrap_or_default()
    }
}
