use crate::ast::Raw;
use crate::error::DmlResult;
use crate::transpiler::{BuilderBase, SqlWriter, Statement, ToSql, empty};

impl ToSql for Raw {
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()> {
        if self.sql.trim().is_empty() {
            return Err(empty("raw", "SQL"));
        }
        w.expression(&self.sql, None);
        Ok(())
    }
}

impl Statement for Raw {
    fn base(&self) -> &BuilderBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BuilderBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "RAW"
    }
}
