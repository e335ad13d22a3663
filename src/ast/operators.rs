/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    /// `<=>`, NULL-safe equality
    SpaceShip,
    Like,
    NotLike,
    Regexp,
    NotRegexp,
    In,
    NotIn,
    Between,
    NotBetween,
    Null,
    NotNull,
    Exists,
    NotExists,
    Xor,
}

impl Operator {
    /// SQL text between the operands, including surrounding spaces.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Equal => " = ",
            Operator::NotEqual => " != ",
            Operator::Less => " < ",
            Operator::Greater => " > ",
            Operator::LessOrEqual => " <= ",
            Operator::GreaterOrEqual => " >= ",
            Operator::SpaceShip => " <=> ",
            Operator::Like => " LIKE ",
            Operator::NotLike => " NOT LIKE ",
            Operator::Regexp => " REGEXP ",
            Operator::NotRegexp => " NOT REGEXP ",
            Operator::In => " IN ",
            Operator::NotIn => " NOT IN ",
            Operator::Between => " BETWEEN ",
            Operator::NotBetween => " NOT BETWEEN ",
            Operator::Null => " IS NULL",
            Operator::NotNull => " IS NOT NULL",
            Operator::Exists => "EXISTS ",
            Operator::NotExists => "NOT EXISTS ",
            Operator::Xor => " XOR ",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_between(&self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }

    pub fn is_exists(&self) -> bool {
        matches!(self, Operator::Exists | Operator::NotExists)
    }
}

/// Joiner written before a condition that is not the first of its clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logical {
    #[default]
    And,
    Or,
    Xor,
    /// `AND NOT`
    Not,
}

impl Logical {
    pub fn sql(&self) -> &'static str {
        match self {
            Logical::And => " AND ",
            Logical::Or => " OR ",
            Logical::Xor => " XOR ",
            Logical::Not => " AND NOT ",
        }
    }
}

/// Sort direction of an ORDER BY or GROUP BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::None => "",
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub fn sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// Row locking clause of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    #[default]
    None,
    ForUpdate,
    ShareMode,
}

impl LockMode {
    pub fn sql(&self) -> &'static str {
        match self {
            LockMode::None => "",
            LockMode::ForUpdate => " FOR UPDATE",
            LockMode::ShareMode => " LOCK IN SHARE MODE",
        }
    }
}
