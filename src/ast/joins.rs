use super::conditions::Condition;
use super::ids::Id;
use super::operators::JoinKind;

/// A JOIN clause.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: Id,
    /// ON conditions, or a single condition carrying USING columns.
    pub on: Vec<Condition>,
}

impl Join {
    pub fn new(kind: JoinKind, table: impl Into<Id>) -> Self {
        Self {
            kind,
            table: table.into(),
            on: Vec::new(),
        }
    }

    pub fn on(mut self, condition: Condition) -> Self {
        self.on.push(condition);
        self
    }
}
