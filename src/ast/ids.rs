use super::operators::SortOrder;
use super::select::Select;
use crate::ident::split_qualifier;

/// What an [`Id`] refers to.
#[derive(Debug, Clone)]
pub enum IdSource {
    /// Table or column name, quoted on output.
    Name(String),
    /// Raw SQL, written as-is.
    Expression(String),
    /// Derived table.
    Derived(Box<Select>),
}

/// A table, column, expression or derived table with alias and sort order.
#[derive(Debug, Clone)]
pub struct Id {
    pub source: IdSource,
    pub alias: String,
    pub sort: SortOrder,
}

impl Id {
    pub fn name(name: impl Into<String>) -> Self {
        Self::from_source(IdSource::Name(name.into()))
    }

    pub fn expression(sql: impl Into<String>) -> Self {
        Self::from_source(IdSource::Expression(sql.into()))
    }

    pub fn derived(select: Select, alias: impl Into<String>) -> Self {
        Self::from_source(IdSource::Derived(Box::new(select))).alias(alias)
    }

    fn from_source(source: IdSource) -> Self {
        Self {
            source,
            alias: String::new(),
            sort: SortOrder::None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn asc(mut self) -> Self {
        self.sort = SortOrder::Asc;
        self
    }

    pub fn desc(mut self) -> Self {
        self.sort = SortOrder::Desc;
        self
    }

    pub fn is_empty(&self) -> bool {
        match &self.source {
            IdSource::Name(n) => n.is_empty(),
            IdSource::Expression(e) => e.is_empty(),
            IdSource::Derived(_) => false,
        }
    }

    /// Name other clauses refer to this table by: the alias, else the
    /// unqualified table name.
    pub fn qualifier(&self) -> &str {
        if !self.alias.is_empty() {
            return &self.alias;
        }
        match &self.source {
            IdSource::Name(n) => split_qualifier(n).1,
            _ => "",
        }
    }

    /// Plain column name, if the id is a name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.source {
            IdSource::Name(n) => Some(n),
            _ => None,
        }
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Id::name(name)
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Id::name(name)
    }
}

impl From<(&str, &str)> for Id {
    fn from((name, alias): (&str, &str)) -> Self {
        Id::name(name).alias(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier() {
        assert_eq!(Id::name("customer_entity").qualifier(), "customer_entity");
        assert_eq!(Id::name("db.customer_entity").qualifier(), "customer_entity");
        assert_eq!(Id::from(("customer_entity", "ce")).qualifier(), "ce");
        assert_eq!(Id::expression("NOW()").qualifier(), "");
    }
}
