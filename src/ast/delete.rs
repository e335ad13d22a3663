use super::conditions::Condition;
use super::ids::Id;
use crate::transpiler::{BuilderBase, builder_base_methods};

#[derive(Debug, Clone, Default)]
pub struct Delete {
    pub base: BuilderBase,
    pub from: Option<Id>,
    pub wheres: Vec<Condition>,
    pub order_bys: Vec<Id>,
    pub limit: Option<u64>,
}

impl Delete {
    pub fn new(table: impl Into<Id>) -> Self {
        Self {
            from: Some(table.into()),
            ..Default::default()
        }
    }

    builder_base_methods!();

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
