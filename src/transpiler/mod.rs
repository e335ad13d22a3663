//! SQL generation for statement ASTs.
//!
//! Every node writes its text into a [`SqlWriter`] and records one
//! [`Placeholder`] for each bindable `?` or `:name` it emits, in emission
//! order. That ordered list is what the binder resolves values against.

pub mod conditions;
pub mod dml;
pub mod mysql;
pub mod scan;


use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::Value;
use crate::bind::Bound;
use crate::config::BuilderOptions;
use crate::error::{DmlError, DmlResult, ResultExt};
use crate::ident;
use crate::pool;

/// One binding slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// Originating identifier, `qualifier.column`, `:name` for named
    /// placeholders, or empty for placeholders inside raw expressions.
    pub column: String,
    /// One-based element selector into a list value, 0 for the whole value.
    pub position: usize,
    /// Value written directly into the AST.
    pub inline: Option<Value>,
}

impl Placeholder {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            position: 0,
            inline: None,
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(format!(":{name}"))
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.inline = Some(value);
        self
    }

    /// Name of a named placeholder without the colon.
    pub fn name(&self) -> Option<&str> {
        self.column.strip_prefix(':')
    }
}

/// Output sink for [`ToSql`].
pub struct SqlWriter<'a> {
    pub buf: &'a mut String,
    pub placeholders: Vec<Placeholder>,
    pub allow_unsafe: bool,
}

impl<'a> SqlWriter<'a> {
    pub fn new(buf: &'a mut String) -> Self {
        Self {
            buf,
            placeholders: Vec::new(),
            allow_unsafe: false,
        }
    }

    pub fn push(&mut self, c: char) {
        self.buf.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn ident(&mut self, name: &str) -> DmlResult<()> {
        ident::write_identifier(self.buf, name, self.allow_unsafe)
    }

    pub fn aliased(&mut self, name: &str, alias: &str) -> DmlResult<()> {
        ident::write_aliased(self.buf, name, alias, self.allow_unsafe)
    }

    pub fn alias(&mut self, alias: &str) -> DmlResult<()> {
        ident::write_alias(self.buf, alias, self.allow_unsafe)
    }

    /// Write `?` for the slot.
    pub fn placeholder(&mut self, slot: Placeholder) {
        self.buf.push('?');
        self.placeholders.push(slot);
    }

    /// Write `:name`.
    pub fn named(&mut self, name: &str, position: usize) {
        self.buf.push(':');
        self.buf.push_str(name);
        self.placeholders.push(Placeholder::named(name).at(position));
    }

    /// Write `?,?,?` with one slot per element of `value`.
    pub fn placeholder_list(&mut self, column: &str, value: &Value) {
        for i in 0..value.arity() {
            if i > 0 {
                self.buf.push(',');
            }
            self.placeholder(Placeholder::new(column).at(i + 1).with_value(value.clone()));
        }
    }

    /// Write raw SQL, registering a slot for each `?` in it. A list value
    /// feeds the placeholders element by element, a scalar feeds the first.
    pub fn expression(&mut self, sql: &str, args: Option<&Value>) {
        let mut n = 0;
        for tok in scan::tokenize(sql) {
            if tok.kind != scan::TokenKind::Placeholder {
                self.buf.push_str(tok.text);
                continue;
            }
            n += 1;
            let slot = match args {
                Some(v) if v.is_list() => Placeholder::new("").at(n).with_value(v.clone()),
                Some(v) if n == 1 => Placeholder::new("").with_value(v.clone()),
                _ => Placeholder::new(""),
            };
            self.placeholder(slot);
        }
    }

    /// Run `f` with identifier options of a nested statement. Unsafe
    /// identifiers allowed by an enclosing statement stay allowed.
    pub fn nested<F>(&mut self, options: BuilderOptions, f: F) -> DmlResult<()>
    where
        F: FnOnce(&mut Self) -> DmlResult<()>,
    {
        let previous = self.allow_unsafe;
        self.allow_unsafe = previous || options.unsafe_identifiers;
        let result = f(self);
        self.allow_unsafe = previous;
        result
    }
}

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Write SQL text and record placeholders.
    fn to_sql(&self, w: &mut SqlWriter<'_>) -> DmlResult<()>;
}

/// Layout of a multi-row INSERT whose tuple count is decided at bind time.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTemplate {
    /// Text up to and including `VALUES `.
    pub head: String,
    /// Text after the tuples.
    pub tail: String,
    /// Column list; empty when records supply every field.
    pub columns: Vec<String>,
}

/// Generated SQL with its binding contract.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSql {
    pub kind: &'static str,
    pub sql: String,
    /// Slots of one template repetition.
    pub placeholders: Vec<Placeholder>,
    /// How often `placeholders` repeats in `sql`.
    pub template_count: usize,
    /// Slots after the last repetition.
    pub trailing: Vec<Placeholder>,
    pub rows: Option<RowTemplate>,
    /// Qualifier that record qualifiers and unqualified columns default to.
    pub qualifier: String,
}

impl CachedSql {
    pub fn plain(kind: &'static str, sql: String, placeholders: Vec<Placeholder>) -> Self {
        Self {
            kind,
            sql,
            placeholders,
            template_count: 1,
            trailing: Vec::new(),
            rows: None,
            qualifier: String::new(),
        }
    }

    /// Total slot count: `placeholders × template_count + trailing`.
    pub fn slot_count(&self) -> usize {
        self.placeholders.len() * self.template_count + self.trailing.len()
    }
}

/// State shared by every statement: options, cache key and the per-key
/// cache of generated SQL.
#[derive(Debug, Clone, Default)]
pub struct BuilderBase {
    /// Label used in log lines.
    pub id: String,
    pub cache_key: String,
    pub options: BuilderOptions,
    cache: HashMap<String, Arc<CachedSql>>,
}

impl BuilderBase {
    pub fn cached(&self, key: &str) -> Option<&Arc<CachedSql>> {
        self.cache.get(key)
    }

    pub fn cached_keys(&self) -> impl Iterator<Item = &str> {
        self.cache.keys().map(String::as_str)
    }
}

/// A buildable, bindable statement.
pub trait Statement: ToSql {
    fn base(&self) -> &BuilderBase;

    fn base_mut(&mut self) -> &mut BuilderBase;

    /// Short statement name for logs and errors.
    fn kind(&self) -> &'static str;

    /// Qualifier of the main table.
    fn default_qualifier(&self) -> String {
        String::new()
    }

    /// Generate SQL without consulting the cache.
    fn compile(&self) -> DmlResult<CachedSql> {
        let mut buf = pool::buffer();
        let mut w = SqlWriter::new(&mut buf);
        w.allow_unsafe = self.base().options.unsafe_identifiers;
        self.to_sql(&mut w)?;
        let placeholders = w.placeholders;
        let mut compiled = CachedSql::plain(self.kind(), buf.clone(), placeholders);
        compiled.qualifier = self.default_qualifier();
        Ok(compiled)
    }

    /// SQL for the current cache key, generated once per key.
    fn build(&mut self) -> DmlResult<Arc<CachedSql>> {
        let key = self.base().cache_key.clone();
        if !self.base().options.disable_build_cache {
            if let Some(hit) = self.base().cache.get(&key) {
                tracing::trace!("{} cache hit for key {:?}", self.kind(), key);
                return Ok(Arc::clone(hit));
            }
        }
        let compiled = Arc::new(
            self.compile()
                .context_with(|| format!("build {} {:?}", self.kind(), self.base().id))?,
        );
        tracing::debug!(
            id = %self.base().id,
            cache_key = %key,
            placeholders = compiled.slot_count(),
            "{} built: {}",
            compiled.kind,
            compiled.sql
        );
        self.base_mut().cache.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// The SQL text for the current cache key.
    fn sql(&mut self) -> DmlResult<String> {
        Ok(self.build()?.sql.clone())
    }

    /// Start binding arguments to the statement.
    fn bind<'a>(&mut self) -> DmlResult<Bound<'a>> {
        let compiled = self.build()?;
        Ok(Bound::new(compiled).with_id(self.base().id.clone()))
    }
}

/// Fluent setters every statement shares through its [`BuilderBase`].
macro_rules! builder_base_methods {
    () => {
        /// Select the cache slot for the next build. Use `format!` for
        /// parameterised keys.
        pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
            self.base.cache_key = key.into();
            self
        }

        pub fn with_id(mut self, id: impl Into<String>) -> Self {
            self.base.id = id.into();
            self
        }

        pub fn with_options(mut self, options: $crate::config::BuilderOptions) -> Self {
            self.base.options = options;
            self
        }

        /// Write identifiers failing the grammar as raw expressions.
        pub fn unsafe_identifiers(mut self) -> Self {
            self.base.options.unsafe_identifiers = true;
            self
        }

        pub fn disable_build_cache(mut self) -> Self {
            self.base.options.disable_build_cache = true;
            self
        }
    };
}

pub(crate) use builder_base_methods;

/// Error for a statement lacking something it cannot be rendered without.
pub(crate) fn empty(kind: &str, what: &str) -> DmlError {
    DmlError::empty(format!("{kind} statement has no {what}"))
}
