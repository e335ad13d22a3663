use super::operators::{Logical, Operator};
use super::select::Select;
use super::values::{Value, typed_values};

/// How a condition's right side is bound when no value is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderSpec {
    /// `?`
    Positional,
    /// `:name`
    Named(String),
}

/// Right-hand operand of a condition. At most one kind can be set.
#[derive(Debug, Clone, Default)]
pub enum Right {
    /// Nothing set; renders `IS NULL` (or just the left expression).
    #[default]
    None,
    Column(String),
    Placeholder(PlaceholderSpec),
    Argument(Value),
    Subquery(Box<Select>),
    Expression(String),
}

/// One WHERE, HAVING, ON, SET or ON DUPLICATE KEY fragment.
#[derive(Debug, Clone, Default)]
pub struct Condition {
    pub left: String,
    pub is_left_expression: bool,
    pub operator: Operator,
    pub right: Right,
    pub logical: Logical,
    /// Columns of a `USING (...)` join condition.
    pub using: Vec<String>,
}

/// Condition on a column, e.g. `column("t.id").in_().int64s([1, 2])`.
pub fn column(name: impl Into<String>) -> Condition {
    Condition {
        left: name.into(),
        ..Default::default()
    }
}

/// Condition from raw SQL. `?` inside the expression are bound in order;
/// a list value set on the condition feeds them element by element.
pub fn expr(sql: impl Into<String>) -> Condition {
    Condition {
        left: sql.into(),
        is_left_expression: true,
        ..Default::default()
    }
}

/// `USING (a, b)` join condition.
pub fn using<I, S>(columns: I) -> Condition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Condition {
        using: columns.into_iter().map(Into::into).collect(),
        ..Default::default()
    }
}

macro_rules! operators {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(pub fn $method(mut self) -> Self {
            self.operator = Operator::$op;
            self
        })*
    };
}

impl Condition {
    operators! {
        equal => Equal,
        not_equal => NotEqual,
        less => Less,
        greater => Greater,
        less_or_equal => LessOrEqual,
        greater_or_equal => GreaterOrEqual,
        spaceship => SpaceShip,
        like => Like,
        not_like => NotLike,
        regexp => Regexp,
        not_regexp => NotRegexp,
        in_ => In,
        not_in => NotIn,
        between => Between,
        not_between => NotBetween,
        is_null => Null,
        not_null => NotNull,
        exists => Exists,
        not_exists => NotExists,
        xor => Xor,
    }

    pub fn operator(mut self, op: Operator) -> Self {
        self.operator = op;
        self
    }

    /// Compare against a value written into the statement.
    pub fn value(mut self, v: Value) -> Self {
        self.right = Right::Argument(v);
        self
    }

    typed_values!();

    pub fn arg(self, v: impl Into<Value>) -> Self {
        self.value(v.into())
    }

    /// Compare against a `?` bound later.
    pub fn placeholder(mut self) -> Self {
        self.right = Right::Placeholder(PlaceholderSpec::Positional);
        self
    }

    /// Compare against `:name` bound later by name.
    pub fn named_arg(mut self, name: impl Into<String>) -> Self {
        self.right = Right::Placeholder(PlaceholderSpec::Named(name.into()));
        self
    }

    /// Compare against another column.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.right = Right::Column(name.into());
        self
    }

    /// Compare against a sub-select.
    pub fn sub(mut self, select: Select) -> Self {
        self.right = Right::Subquery(Box::new(select));
        self
    }

    /// Compare against raw SQL.
    pub fn expr(mut self, sql: impl Into<String>) -> Self {
        self.right = Right::Expression(sql.into());
        self
    }

    pub fn and(mut self) -> Self {
        self.logical = Logical::And;
        self
    }

    pub fn or(mut self) -> Self {
        self.logical = Logical::Or;
        self
    }

    pub fn logical(mut self, logical: Logical) -> Self {
        self.logical = logical;
        self
    }

    /// Identifier recorded for placeholders this condition emits.
    pub fn slot_column(&self) -> &str {
        if self.is_left_expression { "" } else { &self.left }
    }
}
