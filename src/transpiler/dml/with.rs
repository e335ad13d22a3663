//! WITH (common table expression) SQL generation.

use crate::ast::*;
use crate::error::DmlResult;
use crate::transpiler::{BuilderBase, SqlWriter, Statement, ToSql, empty};

fn write_query(w: &mut SqlWriter<'_>, query: &CteQuery) -> DmlResult<()> {
    match query {
        CteQuery::Select(select) => select.to_sql(w),
        CteQuery::Union(union) => union.to_sql(w),
    }
}

impl ToSql for With {
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()> {
        w.nested(self.base.options, |w| {
            if self.ctes.is_empty() {
                return Err(empty("WITH", "common table expressions"));
            }
            let top = self.top.as_ref().ok_or_else(|| empty("WITH", "query"))?;
            w.push_str(if self.recursive { "WITH RECURSIVE " } else { "WITH " });
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                w.ident(&cte.name)?;
                if !cte.columns.is_empty() {
                    w.push_str(" (");
                    for (j, col) in cte.columns.iter().enumerate() {
                        if j > 0 {
                            w.push(',');
                        }
                        w.ident(col)?;
                    }
                    w.push(')');
                }
                w.push_str(" AS (");
                write_query(w, &cte.query)?;
                w.push(')');
            }
            w.push(' ');
            write_query(w, top)
        })
    }
}

impl Statement for With {
    fn base(&self) -> &BuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BuilderBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "WITH"
    }
}
