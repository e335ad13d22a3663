use super::conditions::{Condition, column};
use super::ids::Id;
use crate::transpiler::{BuilderBase, builder_base_methods};

#[derive(Debug, Clone, Default)]
pub struct Update {
    pub base: BuilderBase,
    pub table: Option<Id>,
    pub set: Vec<Condition>,
    pub wheres: Vec<Condition>,
    pub order_bys: Vec<Id>,
    pub limit: Option<u64>,
}

impl Update {
    pub fn new(table: impl Into<Id>) -> Self {
        Self {
            table: Some(table.into()),
            ..Default::default()
        }
    }

    builder_base_methods!();

    /// Add a SET assignment, e.g. `column("qty").int64(3)`.
    pub fn set(mut self, assignment: Condition) -> Self {
        self.set.push(assignment);
        self
    }

    /// `col=?` for each column, bound later.
    pub fn add_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set.extend(columns.into_iter().map(column));
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.wheres.push(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<Id>) -> Self {
        self.order_bys.push(column.into());
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }
}
