use crate::transpiler::{BuilderBase, builder_base_methods};

/// Caller-written SQL that takes part in binding, named placeholder
/// rewriting, expansion and interpolation.
#[derive(Debug, Clone, Default)]
pub struct Raw {
    pub base: BuilderBase,
    pub sql: String,
}

impl Raw {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    builder_base_methods!();
}
