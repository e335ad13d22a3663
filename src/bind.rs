//! The argument binder.
//!
//! A [`Bound`] pairs the generated SQL of one statement with the sources
//! that supply its placeholders: inline values from the AST, named
//! arguments, records and positional arguments. [`Bound::prepare`] resolves
//! every slot, in that order of precedence, into one flat value list.

use std::sync::Arc;

use crate::ast::values::typed_values;
use crate::ast::{Argument, Arguments, Value};
use crate::config::BindOptions;
use crate::error::{DmlError, DmlResult, ResultExt};
use crate::expand;
use crate::ident;
use crate::interpolate;
use crate::pool;
use crate::record::{ColumnMapMode, ColumnMapper, QualifiedRecord};
use crate::transpiler::dml::write_tuples;
use crate::transpiler::scan;
use crate::transpiler::{CachedSql, Placeholder, RowTemplate};

/// Hands out unnamed arguments in order. After the first miss it stays
/// exhausted for the rest of the bind call.
struct Positional {
    values: std::vec::IntoIter<Value>,
    stopped: bool,
    /// List taken for an element-selecting slot: column, last position
    /// served and the list itself.
    group: Option<(String, usize, Value)>,
}

impl Positional {
    fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            stopped: false,
            group: None,
        }
    }

    /// Value for `slot`. A list taken at position 1 also serves the
    /// following positions of the same column, as in `BETWEEN ? AND ?`.
    fn take(&mut self, slot: &Placeholder) -> Option<Value> {
        if slot.position > 1 {
            if let Some((column, position, value)) = &mut self.group {
                if *column == slot.column && *position + 1 == slot.position {
                    *position = slot.position;
                    return Some(value.clone());
                }
            }
        }
        let value = self.next()?;
        self.group = (slot.position == 1 && value.is_list())
            .then(|| (slot.column.clone(), 1, value.clone()));
        Some(value)
    }

    fn next(&mut self) -> Option<Value> {
        if self.stopped {
            return None;
        }
        let value = self.values.next();
        self.stopped = value.is_none();
        value
    }

    fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Apply a slot's one-based element selector to a list value.
fn select(value: Value, position: usize) -> DmlResult<Value> {
    if position == 0 || !value.is_list() {
        return Ok(value);
    }
    value.element(position - 1).ok_or_else(|| {
        DmlError::out_of_range(format!(
            "position {position} selects beyond a {} of length {}",
            value.type_name(),
            value.arity()
        ))
    })
}

fn render_rows(rows: &RowTemplate, width: usize, count: usize) -> String {
    let mut sql = String::with_capacity(rows.head.len() + rows.tail.len() + count * (width * 2 + 3));
    sql.push_str(&rows.head);
    write_tuples(&mut sql, width, count);
    sql.push_str(&rows.tail);
    sql
}

/// Every slot of the statement in text order, template repetitions
/// included.
fn flat_slots(compiled: &CachedSql) -> Vec<Placeholder> {
    let mut slots = Vec::with_capacity(compiled.slot_count());
    for _ in 0..compiled.template_count {
        slots.extend(compiled.placeholders.iter().cloned());
    }
    slots.extend(compiled.trailing.iter().cloned());
    slots
}

/// Slots the positional arguments have to fill.
fn positional_need(slots: &[Placeholder]) -> usize {
    slots
        .iter()
        .filter(|p| p.inline.is_none() && p.name().is_none())
        .count()
}

/// Positional arguments needed when every element-selecting group is bound
/// to one list.
fn positional_groups(slots: &[Placeholder]) -> usize {
    slots
        .iter()
        .filter(|p| p.inline.is_none() && p.name().is_none() && p.position <= 1)
        .count()
}

/// A statement with the arguments and records bound to it.
#[derive(Debug)]
pub struct Bound<'a> {
    compiled: Arc<CachedSql>,
    id: String,
    args: Arguments,
    records: Vec<QualifiedRecord<'a>>,
    aliases: Vec<String>,
    options: BindOptions,
    named_text: bool,
    /// SQL and slots after `:name` rewriting.
    rewritten: Option<(String, Vec<Placeholder>)>,
}

impl<'a> Bound<'a> {
    pub fn new(compiled: Arc<CachedSql>) -> Self {
        let named_text = scan::has_named(&compiled.sql);
        Self {
            compiled,
            id: String::new(),
            args: Arguments::new(),
            records: Vec::new(),
            aliases: Vec::new(),
            options: BindOptions::default(),
            named_text,
            rewritten: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    /// Return SQL with the values embedded and no arguments.
    pub fn interpolate(mut self) -> Self {
        self.options.interpolate = true;
        self
    }

    /// Rewrite placeholders bound to lists into one placeholder per element.
    pub fn expand_placeholders(mut self) -> Self {
        self.options.expand_placeholders = true;
        self
    }

    pub fn value(mut self, v: Value) -> Self {
        self.args.push(Argument::new(v));
        self
    }

    typed_values!();

    pub fn arg(self, v: impl Into<Value>) -> Self {
        self.value(v.into())
    }

    /// Bind `v` to every `:name` placeholder.
    pub fn named(mut self, name: impl Into<String>, v: impl Into<Value>) -> Self {
        self.args.push(Argument::named(name, v));
        self
    }

    pub fn argument(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    pub fn arguments(mut self, args: &Arguments) -> Self {
        for arg in args {
            self.args.push(arg.clone());
        }
        self
    }

    /// Take values for columns of `qualifier` from `record`. An empty
    /// qualifier stands for the statement's main table.
    pub fn record(mut self, qualifier: impl Into<String>, record: &'a mut dyn ColumnMapper) -> Self {
        self.push_record(qualifier, record);
        self
    }

    /// Rename the slots for record lookup, one alias per slot.
    pub fn column_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn push(&mut self, arg: Argument) -> &mut Self {
        self.args.push(arg);
        self
    }

    pub fn push_record(
        &mut self,
        qualifier: impl Into<String>,
        record: &'a mut dyn ColumnMapper,
    ) -> &mut Self {
        self.records.push(QualifiedRecord::new(qualifier, record));
        self
    }

    /// Drop arguments, records and aliases, keeping options and the named
    /// rewrite.
    pub fn reset(&mut self) -> &mut Self {
        self.args.clear();
        self.records.clear();
        self.aliases.clear();
        self
    }

    pub fn compiled(&self) -> &CachedSql {
        &self.compiled
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> BindOptions {
        self.options
    }

    /// The SQL text and the flat value list for it.
    pub fn prepare(&mut self) -> DmlResult<(String, Vec<Value>)> {
        let compiled = Arc::clone(&self.compiled);
        let result = self
            .resolve(&compiled)
            .and_then(|(sql, values)| self.finish(sql, values));
        match result {
            Ok((sql, values)) => {
                tracing::trace!(
                    id = %self.id,
                    arguments = values.len(),
                    records = self.records.len(),
                    "{} bound",
                    compiled.kind
                );
                Ok((sql, values))
            }
            Err(e) => Err(e.context(format!("bind {} {:?}", compiled.kind, self.id))),
        }
    }

    /// Like [`prepare`](Self::prepare) with `raw` appended as positional
    /// arguments for this call only.
    pub fn prepare_with(&mut self, raw: Vec<Value>) -> DmlResult<(String, Vec<Value>)> {
        if (self.options.interpolate || self.options.expand_placeholders)
            && !raw.is_empty()
            && self.records.is_empty()
            && self.args.is_empty()
        {
            return Err(DmlError::not_allowed(format!(
                "{} {:?}: interpolation or expansion with a raw value list",
                self.compiled.kind, self.id
            )));
        }
        let before = self.args.len();
        self.args.extend(raw);
        let result = self.prepare();
        self.args.truncate(before);
        result
    }

    /// The SQL with every value embedded.
    pub fn interpolated(&mut self) -> DmlResult<String> {
        let previous = self.options.interpolate;
        self.options.interpolate = true;
        let result = self.prepare();
        self.options.interpolate = previous;
        Ok(result?.0)
    }

    fn is_fast_path(&self, c: &CachedSql) -> bool {
        self.records.is_empty()
            && self.aliases.is_empty()
            && !self.named_text
            && !self.args.has_named()
            && c.placeholders
                .iter()
                .chain(&c.trailing)
                .all(|p| p.inline.is_none() && p.name().is_none() && p.position == 0)
    }

    fn resolve(&mut self, c: &CachedSql) -> DmlResult<(String, Vec<Value>)> {
        if let Some(rows) = &c.rows {
            if rows.columns.is_empty() && self.records.is_empty() {
                return Err(DmlError::empty(format!(
                    "{} without columns needs records to supply its rows",
                    c.kind
                )));
            }
        }
        let positional = self.positional(c)?;
        if self.is_fast_path(c) {
            return Self::fast_path(c, positional);
        }
        let (sql, slots) = match &c.rows {
            Some(rows) if !self.records.is_empty() => self.record_rows(c, rows)?,
            _ => self.layout(c),
        };
        let slots = self.aliased(slots)?;
        let values = self.resolve_slots(&sql, &slots, &c.qualifier, positional)?;
        Ok((sql, values))
    }

    /// Unnamed arguments, repeated per template when they cover exactly one
    /// repetition.
    fn positional(&self, c: &CachedSql) -> DmlResult<Vec<Value>> {
        let unnamed = self
            .args
            .iter()
            .filter(|a| a.name.is_none())
            .map(Argument::resolve)
            .collect::<DmlResult<Vec<_>>>()?;
        if c.template_count > 1 && self.records.is_empty() {
            let trailing = positional_need(&c.trailing);
            let fits = [positional_need(&c.placeholders), positional_groups(&c.placeholders)]
                .into_iter()
                .find(|&once| once > 0 && unnamed.len() == once + trailing);
            if let Some(once) = fits {
                let mut repeated = Vec::with_capacity(once * c.template_count + trailing);
                for _ in 0..c.template_count {
                    repeated.extend_from_slice(&unnamed[..once]);
                }
                repeated.extend_from_slice(&unnamed[once..]);
                return Ok(repeated);
            }
        }
        Ok(unnamed)
    }

    fn fast_path(c: &CachedSql, values: Vec<Value>) -> DmlResult<(String, Vec<Value>)> {
        if values.len() == c.slot_count() {
            return Ok((c.sql.clone(), values));
        }
        // an INSERT without a row count takes as many rows as the values fill
        if let Some(rows) = &c.rows {
            let width = rows.columns.len();
            let body = values.len().saturating_sub(c.trailing.len());
            if c.template_count == 1 && width > 0 && body > 0 && body % width == 0 {
                return Ok((render_rows(rows, width, body / width), values));
            }
        }
        Err(DmlError::mismatch(format!(
            "{} arguments for {} placeholders in {:?}",
            values.len(),
            c.slot_count(),
            c.sql
        )))
    }

    fn layout(&mut self, c: &CachedSql) -> (String, Vec<Placeholder>) {
        let slots = flat_slots(c);
        if !self.named_text {
            return (c.sql.clone(), slots);
        }
        let (sql, slots) = self
            .rewritten
            .get_or_insert_with(|| expand::rewrite_named(&c.sql, &slots));
        (sql.clone(), slots.clone())
    }

    /// Tuples for a multi-row INSERT, one per record row.
    fn record_rows(
        &mut self,
        c: &CachedSql,
        rows: &RowTemplate,
    ) -> DmlResult<(String, Vec<Placeholder>)> {
        let mut width = rows.columns.len();
        let mut values = Vec::new();
        let mut cm = pool::column_map();
        for rec in &mut self.records {
            if rows.columns.is_empty() {
                cm.start(ColumnMapMode::ReadAllColumns, std::iter::empty::<&str>());
            } else {
                cm.start(
                    ColumnMapMode::ReadExplicitColumnSet,
                    rows.columns.iter().map(String::as_str),
                );
            }
            rec.record
                .map_columns(&mut cm)
                .context_with(|| format!("record {:?}", rec.qualifier))?;
            let pushed = cm.take_args();
            if width == 0 {
                width = if cm.field_count() > 0 {
                    cm.field_count()
                } else {
                    pushed.len()
                };
            }
            values.extend(pushed);
        }
        if width == 0 || values.is_empty() {
            return Err(DmlError::empty(format!("records supplied no values for {}", c.kind)));
        }
        if values.len() % width != 0 {
            return Err(DmlError::mismatch(format!(
                "records supplied {} values, not a multiple of {width} columns",
                values.len()
            )));
        }
        let sql = render_rows(rows, width, values.len() / width);
        let mut slots: Vec<Placeholder> = values
            .into_iter()
            .map(|v| Placeholder::new("").with_value(v))
            .collect();
        slots.extend(c.trailing.iter().cloned());
        if scan::has_named(&sql) {
            return Ok(expand::rewrite_named(&sql, &slots));
        }
        Ok((sql, slots))
    }

    fn aliased(&self, mut slots: Vec<Placeholder>) -> DmlResult<Vec<Placeholder>> {
        if self.aliases.is_empty() {
            return Ok(slots);
        }
        if self.aliases.len() != slots.len() {
            return Err(DmlError::mismatch(format!(
                "{} column aliases for {} placeholders",
                self.aliases.len(),
                slots.len()
            )));
        }
        for (slot, alias) in slots.iter_mut().zip(&self.aliases) {
            if slot.name().is_none() {
                slot.column.clone_from(alias);
            }
        }
        Ok(slots)
    }

    fn resolve_slots(
        &mut self,
        sql: &str,
        slots: &[Placeholder],
        qualifier: &str,
        positional: Vec<Value>,
    ) -> DmlResult<Vec<Value>> {
        let mut cursor = Positional::new(positional);
        let mut values = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let value = self
                .resolve_slot(slot, qualifier, &mut cursor)
                .and_then(|v| select(v, slot.position))
                .context_with(|| format!("placeholder {} {:?} in {sql:?}", i + 1, slot.column))?;
            values.push(value);
        }
        if cursor.remaining() > 0 {
            tracing::trace!(unused = cursor.remaining(), "positional arguments left over");
        }
        Ok(values)
    }

    fn resolve_slot(
        &mut self,
        slot: &Placeholder,
        qualifier: &str,
        cursor: &mut Positional,
    ) -> DmlResult<Value> {
        if let Some(v) = &slot.inline {
            return Ok(v.clone());
        }
        if let Some(name) = slot.name() {
            return self
                .args
                .get_named(name)
                .ok_or_else(|| DmlError::not_found(format!("no argument named {name:?}")))?
                .resolve();
        }
        if let Some(v) = self.from_records(&slot.column, qualifier)? {
            return Ok(v);
        }
        cursor.take(slot).ok_or_else(|| {
            DmlError::not_found("no record or positional argument left for the placeholder")
        })
    }

    /// Ask the record whose qualifier matches the column for its value.
    fn from_records(&mut self, column: &str, default: &str) -> DmlResult<Option<Value>> {
        if column.is_empty() || self.records.is_empty() {
            return Ok(None);
        }
        let (qualifier, name) = ident::split_qualifier(column);
        let qualifier = if qualifier.is_empty() { default } else { qualifier };
        let Some(rec) = self.records.iter_mut().find(|r| {
            let own = if r.qualifier.is_empty() { default } else { r.qualifier.as_str() };
            own == qualifier
        }) else {
            return Ok(None);
        };
        let mode = if rec.record.is_collection() {
            ColumnMapMode::ReadCollectionColumnSet
        } else {
            ColumnMapMode::ReadExplicitColumnSet
        };
        let mut cm = pool::column_map();
        cm.start(mode, [name]);
        rec.record.map_columns(&mut cm)?;
        let mut pushed = cm.take_args();
        match pushed.len() {
            1 => Ok(pushed.pop()),
            0 => Err(DmlError::not_found(format!(
                "record {:?} supplied no value for {name:?}",
                rec.qualifier
            ))),
            n => Err(DmlError::mismatch(format!(
                "record {:?} supplied {n} values for {name:?}",
                rec.qualifier
            ))),
        }
    }

    fn finish(&self, sql: String, values: Vec<Value>) -> DmlResult<(String, Vec<Value>)> {
        if self.options.interpolate {
            return Ok((interpolate::interpolate(&sql, &values)?, Vec::new()));
        }
        if values.iter().any(Value::is_list) {
            if !self.options.expand_placeholders {
                return Err(DmlError::not_valid(
                    "list argument bound to a single placeholder needs expand_placeholders or interpolate",
                ));
            }
            return expand::expand(&sql, &values);
        }
        Ok((sql, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(sql: &str, slots: Vec<Placeholder>) -> Bound<'static> {
        Bound::new(Arc::new(CachedSql::plain("RAW", sql.to_string(), slots)))
    }

    #[test]
    fn test_positional_stops_after_miss() {
        let mut p = Positional::new(vec![Value::Int(1)]);
        assert_eq!(p.next(), Some(Value::Int(1)));
        assert_eq!(p.next(), None);
        assert!(p.stopped);
        assert_eq!(p.next(), None);
    }

    #[test]
    fn test_fast_path_verbatim() {
        let mut b = raw("SELECT ? + ?", vec![Placeholder::new(""), Placeholder::new("")])
            .int64(1)
            .int64(2);
        let (sql, values) = b.prepare().unwrap();
        assert_eq!(sql, "SELECT ? + ?");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
        // repeatable
        assert_eq!(b.prepare().unwrap().1.len(), 2);
    }

    #[test]
    fn test_fast_path_mismatch() {
        let err = raw("SELECT ?", vec![Placeholder::new("")])
            .int64(1)
            .int64(2)
            .prepare()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Mismatch);
    }

    #[test]
    fn test_inline_wins_over_positional() {
        let slots = vec![
            Placeholder::new("a").with_value(Value::Int(9)),
            Placeholder::new("b"),
        ];
        let (_, values) = raw("SELECT ?, ?", slots).int64(5).prepare().unwrap();
        assert_eq!(values, vec![Value::Int(9), Value::Int(5)]);
    }

    #[test]
    fn test_named_arguments() {
        let (sql, values) = raw("SELECT * FROM t WHERE a = :a OR b = :a AND c = ?", vec![])
            .named("a", 4i64)
            .int64(7)
            .prepare()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? OR b = ? AND c = ?");
        assert_eq!(values, vec![Value::Int(4), Value::Int(4), Value::Int(7)]);
    }

    #[test]
    fn test_named_is_case_sensitive() {
        let err = raw("SELECT :Id", vec![])
            .named("id", 1i64)
            .prepare()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        assert!(err.to_string().contains("SELECT ?"));
    }

    #[test]
    fn test_list_needs_expansion() {
        let slots = vec![Placeholder::new("id")];
        let err = raw("SELECT 1 FROM t WHERE id IN ?", slots.clone())
            .int64s([1, 2])
            .prepare()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotValid);

        let (sql, values) = raw("SELECT 1 FROM t WHERE id IN ?", slots)
            .int64s([1, 2])
            .expand_placeholders()
            .prepare()
            .unwrap();
        assert_eq!(sql, "SELECT 1 FROM t WHERE id IN (?,?)");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_selector_on_slot() {
        let slots = || vec![Placeholder::new("x").at(1), Placeholder::new("x").at(2)];
        let sql = "SELECT 1 FROM t WHERE x BETWEEN ? AND ?";

        let (_, values) = raw(sql, slots()).int64s([10, 20]).prepare().unwrap();
        assert_eq!(values, vec![Value::Int(10), Value::Int(20)]);

        // the list bound at position 1 serves position 2 as well
        let (_, values) = raw(sql, slots())
            .named("unused", 0i64)
            .int64s([10, 20])
            .int64s([30, 40])
            .prepare()
            .unwrap();
        assert_eq!(values, vec![Value::Int(10), Value::Int(20)]);

        let (_, values) = raw(sql, slots()).int64(5).int64(9).prepare().unwrap();
        assert_eq!(values, vec![Value::Int(5), Value::Int(9)]);

        let (sql, values) = raw(sql, slots())
            .int64s([10, 20])
            .interpolate()
            .prepare()
            .unwrap();
        assert_eq!(sql, "SELECT 1 FROM t WHERE x BETWEEN 10 AND 20");
        assert!(values.is_empty());
    }

    #[test]
    fn test_selector_list_too_short() {
        let slots = vec![Placeholder::new("x").at(1), Placeholder::new("x").at(2)];
        let err = raw("SELECT 1 FROM t WHERE x BETWEEN ? AND ?", slots)
            .int64s([10])
            .prepare()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::OutOfRange);
    }

    #[test]
    fn test_prepare_with_raw_values() {
        let mut b = raw("SELECT ?", vec![Placeholder::new("")]);
        let (_, values) = b.prepare_with(vec![Value::Int(3)]).unwrap();
        assert_eq!(values, vec![Value::Int(3)]);
        assert!(b.prepare().is_err());

        let mut b = raw("SELECT ?", vec![Placeholder::new("")]).interpolate();
        let err = b.prepare_with(vec![Value::Int(3)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotAllowed);
    }

    #[test]
    fn test_aliases_length_checked() {
        let err = raw("SELECT ?", vec![Placeholder::new("a")])
            .column_aliases(["x", "y"])
            .int64(1)
            .prepare()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Mismatch);
    }
}
