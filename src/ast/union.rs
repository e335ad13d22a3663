use super::ids::Id;
use super::select::Select;
use crate::transpiler::{BuilderBase, builder_base_methods};

/// Column added by [`Union::preserve_result_set`].
pub const PRESERVE_RESULT_SET: &str = "_preserve_result_set";

/// A UNION of SELECTs, or one SELECT repeated as a template.
///
/// In template mode every occurrence of a replacement key in the rendered
/// SELECT is substituted by the n-th value of that key, once per
/// repetition. All keys must carry the same number of values.
#[derive(Debug, Clone, Default)]
pub struct Union {
    pub base: BuilderBase,
    pub selects: Vec<Select>,
    pub all: bool,
    pub order_bys: Vec<Id>,
    pub preserve_result_set: bool,
    pub is_template: bool,
    pub replacements: Vec<(String, Vec<String>)>,
}

impl Union {
    pub fn new<I>(selects: I) -> Self
    where
        I: IntoIterator<Item = Select>,
    {
        Self {
            selects: selects.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Repeat `select` once per replacement value.
    pub fn template(select: Select) -> Self {
        Self {
            selects: vec![select],
            is_template: true,
            ..Default::default()
        }
    }

    builder_base_methods!();

    pub fn add(mut self, select: Select) -> Self {
        self.selects.push(select);
        self
    }

    /// `UNION ALL` instead of `UNION`.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn string_replace<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replacements
            .push((key.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Add the SELECT's index as a column and order by it first, keeping
    /// rows of each SELECT together and in SELECT order.
    pub fn preserve_result_set(mut self) -> Self {
        self.preserve_result_set = true;
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
}
