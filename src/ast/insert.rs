use super::conditions::{Condition, column};
use super::select::Select;
use crate::transpiler::{BuilderBase, builder_base_methods};

/// An INSERT or REPLACE statement.
///
/// Rows come from `row_count` repetitions of the column tuple, from bound
/// records (one tuple per record row) or from a SELECT.
#[derive(Debug, Clone, Default)]
pub struct Insert {
    pub base: BuilderBase,
    pub into: String,
    pub columns: Vec<String>,
    /// Tuples to render when no records decide it; 0 means 1.
    pub row_count: usize,
    pub select: Option<Box<Select>>,
    pub on_duplicate_key: Vec<Condition>,
    pub ignore: bool,
    pub replace: bool,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            into: table.into(),
            ..Default::default()
        }
    }

    builder_base_methods!();

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn row_count(mut self, rows: usize) -> Self {
        self.row_count = rows;
        self
    }

    /// `INSERT INTO t (cols) SELECT ...`
    pub fn from_select(mut self, select: Select) -> Self {
        self.select = Some(Box::new(select));
        self
    }

    /// Add an `ON DUPLICATE KEY UPDATE` assignment. A condition without a
    /// right side renders `col=VALUES(col)`.
    pub fn on_duplicate_key(mut self, assignment: Condition) -> Self {
        self.on_duplicate_key.push(assignment);
        self
    }

    /// `col=VALUES(col)` for every inserted column.
    pub fn on_duplicate_key_values(mut self) -> Self {
        let assignments: Vec<Condition> = self.columns.iter().map(column).collect();
        self.on_duplicate_key.extend(assignments);
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }
}
