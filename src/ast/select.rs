use super::conditions::Condition;
use super::ids::Id;
use super::joins::Join;
use super::operators::{JoinKind, LockMode};
use crate::transpiler::{BuilderBase, builder_base_methods};

/// A SELECT statement.
///
/// ```
/// use dml::prelude::*;
///
/// let mut sel = Select::new(["entity_id", "email"])
///     .from_alias("customer_entity", "ce")
///     .filter(column("ce.store_id").int64(2))
///     .filter(column("ce.email").like().placeholder())
///     .order_by_desc("ce.created_at")
///     .limit(0, 10);
/// assert_eq!(
///     sel.sql().unwrap(),
///     "SELECT `entity_id`, `email` FROM `customer_entity` AS `ce` \
///      WHERE (`ce`.`store_id` = ?) AND (`ce`.`email` LIKE ?) \
///      ORDER BY `ce`.`created_at` DESC LIMIT 10"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Select {
    pub base: BuilderBase,
    pub table: Option<Id>,
    pub columns: Vec<Id>,
    pub distinct: bool,
    pub joins: Vec<Join>,
    pub wheres: Vec<Condition>,
    pub group_bys: Vec<Id>,
    pub havings: Vec<Condition>,
    pub order_bys: Vec<Id>,
    /// `(offset, count)`
    pub limit: Option<(u64, u64)>,
    pub lock: LockMode,
}

impl Select {
    pub fn new<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Id>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// `SELECT *`
    pub fn star() -> Self {
        Self::new(["*"])
    }

    builder_base_methods!();

    pub fn from(mut self, table: impl Into<Id>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn from_alias(self, table: &str, alias: &str) -> Self {
        self.from(Id::name(table).alias(alias))
    }

    /// `FROM (SELECT ...) AS alias`
    pub fn from_derived(self, select: Select, alias: &str) -> Self {
        self.from(Id::derived(select, alias))
    }

    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Id>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn column_alias(mut self, column: &str, alias: &str) -> Self {
        self.columns.push(Id::name(column).alias(alias));
        self
    }

    /// Raw SQL column; `?` inside it are bound like any other placeholder.
    pub fn expr_column(mut self, sql: &str, alias: &str) -> Self {
        self.columns.push(Id::expression(sql).alias(alias));
        self
    }

    /// `COUNT(*) AS counted`
    pub fn count_star(mut self) -> Self {
        self.columns.push(Id::expression("COUNT(*)").alias("counted"));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn inner_join<I>(self, table: impl Into<Id>, on: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        self.join_kind(JoinKind::Inner, table, on)
    }

    pub fn left_join<I>(self, table: impl Into<Id>, on: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        self.join_kind(JoinKind::Left, table, on)
    }

    pub fn right_join<I>(self, table: impl Into<Id>, on: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        self.join_kind(JoinKind::Right, table, on)
    }

    pub fn cross_join(self, table: impl Into<Id>) -> Self {
        self.join_kind(JoinKind::Cross, table, [])
    }

    fn join_kind<I>(mut self, kind: JoinKind, table: impl Into<Id>, on: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        let mut join = Join::new(kind, table);
        join.on.extend(on);
        self.joins.push(join);
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.wheres.push(condition);
        self
    }

    pub fn filters<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        self.wheres.extend(conditions);
        self
    }

    pub fn group_by(mut self, column: impl Into<Id>) -> Self {
        self.group_bys.push(column.into());
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        self.havings.push(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<Id>) -> Self {
        self.order_bys.push(column.into());
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_bys.push(Id::name(column).desc());
        self
    }

    pub fn order_by_random(mut self) -> Self {
        self.order_bys.push(Id::expression("RAND()"));
        self
    }

    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some((offset, count));
        self
    }

    /// One-based page of `per_page` rows.
    pub fn paginate(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        self.limit((page - 1) * per_page, per_page)
    }

    pub fn for_update(mut self) -> Self {
        self.lock = LockMode::ForUpdate;
        self
    }

    pub fn lock_in_share_mode(mut self) -> Self {
        self.lock = LockMode::ShareMode;
        self
    }
}
