use super::select::Select;
use super::union::Union;
use crate::transpiler::{BuilderBase, builder_base_methods};

/// Body of a common table expression or of the statement's final query.
#[derive(Debug, Clone)]
pub enum CteQuery {
    Select(Box<Select>),
    Union(Box<Union>),
}

impl From<Select> for CteQuery {
    fn from(select: Select) -> Self {
        CteQuery::Select(Box::new(select))
    }
}

impl From<Union> for CteQuery {
    fn from(union: Union) -> Self {
        CteQuery::Union(Box::new(union))
    }
}

#[derive(Debug, Clone)]
pub struct Cte {
    pub name: String,
    pub columns: Vec<String>,
    pub query: CteQuery,
}

/// `WITH [RECURSIVE] name [(cols)] AS (...), ... <query>`
#[derive(Debug, Clone, Default)]
pub struct With {
    pub base: BuilderBase,
    pub ctes: Vec<Cte>,
    pub recursive: bool,
    pub top: Option<CteQuery>,
}

impl With {
    pub fn new() -> Self {
        Self::default()
    }

    builder_base_methods!();

    pub fn cte(self, name: impl Into<String>, query: impl Into<CteQuery>) -> Self {
        self.cte_columns(name, Vec::<String>::new(), query)
    }

    pub fn cte_columns<I, S>(
        mut self,
        name: impl Into<String>,
        columns: I,
        query: impl Into<CteQuery>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctes.push(Cte {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            query: query.into(),
        });
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// The query the CTEs feed.
    pub fn query(mut self, query: impl Into<CteQuery>) -> Self {
        self.top = Some(query.into());
        self
    }
}
