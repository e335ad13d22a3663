//! The column-mapper protocol.
//!
//! A record type takes part in binding and scanning by implementing
//! [`ColumnMapper`]. The engine hands it a [`ColumnMap`] cursor whose
//! [`ColumnMapMode`] decides what the typed setters do: in
//! [`ColumnMapMode::ScanRow`] they write the current result column into the
//! record's field, in every read mode they push the field's value as a bind
//! argument.
//!
//! ```
//! use dml::{ColumnMap, ColumnMapper, DmlError, DmlResult};
//!
//! #[derive(Default)]
//! struct Customer {
//!     id: i64,
//!     email: Option<String>,
//! }
//!
//! impl ColumnMapper for Customer {
//!     fn map_columns(&mut self, cm: &mut ColumnMap) -> DmlResult<()> {
//!         while cm.next(2) {
//!             match cm.column() {
//!                 "entity_id" | "0" => cm.int64(&mut self.id)?,
//!                 "email" | "1" => cm.null_string(&mut self.email)?,
//!                 c => return Err(DmlError::unknown_column(c)),
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::ast::Value;
use crate::error::{DmlError, DmlResult};
use crate::pool::Reset;

/// What a [`ColumnMap`] asks of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnMapMode {
    /// Write the current result column into the record.
    #[default]
    ScanRow,
    /// Push every field in the record's canonical order. Columns are
    /// reported as their zero-based index.
    ReadAllColumns,
    /// Push the field of each requested column.
    ReadExplicitColumnSet,
    /// Push one list per requested column, holding that field of every
    /// element of a collection.
    ReadCollectionColumnSet,
}

impl fmt::Display for ColumnMapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnMapMode::ScanRow => "scan row",
            ColumnMapMode::ReadAllColumns => "read all columns",
            ColumnMapMode::ReadExplicitColumnSet => "read explicit columns",
            ColumnMapMode::ReadCollectionColumnSet => "read collection columns",
        };
        f.write_str(name)
    }
}

/// A type whose fields can be bound to placeholders and scanned from rows.
///
/// Collections return `true` from [`is_collection`](Self::is_collection).
/// When binding single placeholders they are driven in
/// [`ColumnMapMode::ReadCollectionColumnSet`]; when supplying INSERT rows
/// they are driven in the row modes and push each element in turn; when
/// scanning they append one element per row.
pub trait ColumnMapper {
    fn map_columns(&mut self, cm: &mut ColumnMap) -> DmlResult<()>;

    fn is_collection(&self) -> bool {
        false
    }
}

/// A record plus the qualifier its columns answer to. An empty qualifier
/// stands for the statement's main table.
pub struct QualifiedRecord<'a> {
    pub qualifier: String,
    pub record: &'a mut dyn ColumnMapper,
}

impl<'a> QualifiedRecord<'a> {
    pub fn new(qualifier: impl Into<String>, record: &'a mut dyn ColumnMapper) -> Self {
        Self {
            qualifier: qualifier.into(),
            record,
        }
    }
}

impl fmt::Debug for QualifiedRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualifiedRecord")
            .field("qualifier", &self.qualifier)
            .finish_non_exhaustive()
    }
}

/// Cursor shared between the engine and a [`ColumnMapper`].
#[derive(Debug, Default)]
pub struct ColumnMap {
    mode: ColumnMapMode,
    columns: Vec<String>,
    /// Next position `next` will visit.
    cursor: usize,
    index: usize,
    /// Decimal index, the column name in `ReadAllColumns` mode.
    current: String,
    field_count: usize,
    args: Vec<Value>,
    row: Vec<Option<Vec<u8>>>,
    count: u64,
}

impl Reset for ColumnMap {
    fn reset(&mut self) {
        self.mode = ColumnMapMode::ScanRow;
        self.columns.clear();
        self.cursor = 0;
        self.index = 0;
        self.current.clear();
        self.field_count = 0;
        self.args.clear();
        self.row.clear();
        self.count = 0;
    }
}

impl ColumnMap {
    pub fn new(mode: ColumnMapMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Prepare for a new mapping call.
    pub fn start<I, S>(&mut self, mode: ColumnMapMode, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode = mode;
        self.columns.clear();
        self.columns.extend(columns.into_iter().map(Into::into));
        self.cursor = 0;
        self.field_count = 0;
    }

    pub fn mode(&self) -> ColumnMapMode {
        self.mode
    }

    /// Advance to the next column. `field_count` is the number of fields the
    /// record owns and only matters in [`ColumnMapMode::ReadAllColumns`].
    /// Once it returns false the cursor rewinds, so a collection can loop
    /// again for its next element.
    pub fn next(&mut self, field_count: usize) -> bool {
        let len = if self.mode == ColumnMapMode::ReadAllColumns {
            self.field_count = field_count;
            field_count
        } else {
            self.columns.len()
        };
        if self.cursor >= len {
            self.cursor = 0;
            return false;
        }
        self.index = self.cursor;
        self.cursor += 1;
        if self.mode == ColumnMapMode::ReadAllColumns {
            self.current.clear();
            self.current.push_str(&self.index.to_string());
        }
        true
    }

    /// Name of the current column.
    pub fn column(&self) -> &str {
        if self.mode == ColumnMapMode::ReadAllColumns {
            return &self.current;
        }
        self.columns.get(self.index).map(String::as_str).unwrap_or("")
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Zero-based position of the current column.
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based ordinal of the row being scanned.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Values pushed so far in a read mode.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Field count announced through `next` in `ReadAllColumns` mode.
    pub(crate) fn field_count(&self) -> usize {
        self.field_count
    }

    pub(crate) fn take_args(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.args)
    }

    /// Load one result row for scanning.
    pub(crate) fn set_row(&mut self, count: u64, row: Vec<Option<Vec<u8>>>) {
        self.mode = ColumnMapMode::ScanRow;
        self.count = count;
        self.row = row;
        self.cursor = 0;
    }

    pub(crate) fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    /// Raw bytes of the current column, `None` for SQL NULL.
    pub fn raw(&self) -> Option<&[u8]> {
        self.row.get(self.index).and_then(|c| c.as_deref())
    }

    /// Push a value, typically a list in
    /// [`ColumnMapMode::ReadCollectionColumnSet`].
    pub fn push(&mut self, v: impl Into<Value>) {
        self.args.push(v.into());
    }

    fn is_scan(&self) -> bool {
        self.mode == ColumnMapMode::ScanRow
    }

    fn text(&self) -> DmlResult<Option<&str>> {
        match self.raw() {
            None => Ok(None),
            Some(b) => std::str::from_utf8(b).map(Some).map_err(|e| {
                DmlError::not_valid(format!("column {:?} is not UTF-8: {e}", self.column()))
            }),
        }
    }

    fn parse<T>(&self) -> DmlResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let Some(s) = self.text()? else {
            return Ok(None);
        };
        s.trim().parse().map(Some).map_err(|e| {
            DmlError::not_valid(format!(
                "column {:?} value {s:?} does not parse as {}: {e}",
                self.column(),
                std::any::type_name::<T>()
            ))
        })
    }

    fn parse_bool(&self) -> DmlResult<Option<bool>> {
        let Some(s) = self.text()? else {
            return Ok(None);
        };
        match s {
            "1" | "true" | "TRUE" => Ok(Some(true)),
            "0" | "false" | "FALSE" => Ok(Some(false)),
            _ => Err(DmlError::not_valid(format!(
                "column {:?} value {s:?} is not a bool",
                self.column()
            ))),
        }
    }

    fn parse_time(&self) -> DmlResult<Option<NaiveDateTime>> {
        let Some(s) = self.text()? else {
            return Ok(None);
        };
        let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").or_else(|_| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        });
        parsed.map(Some).map_err(|e| {
            DmlError::not_valid(format!(
                "column {:?} value {s:?} is not a datetime: {e}",
                self.column()
            ))
        })
    }
}

/// Setters for a plain field and its nullable form, both parsed from the
/// row text in scan mode.
macro_rules! parsed_setters {
    ($($name:ident, $null_name:ident: $t:ty => $variant:ident;)*) => {
        impl ColumnMap {
            $(
                pub fn $name(&mut self, v: &mut $t) -> DmlResult<()> {
                    if self.is_scan() {
                        *v = self.parse::<$t>()?.unwrap_or_default();
                    } else {
                        self.args.push(Value::$variant(*v));
                    }
                    Ok(())
                }

                pub fn $null_name(&mut self, v: &mut Option<$t>) -> DmlResult<()> {
                    if self.is_scan() {
                        *v = self.parse::<$t>()?;
                    } else {
                        self.args.push((*v).into());
                    }
                    Ok(())
                }
            )*
        }
    };
}

parsed_setters! {
    int64, null_int64: i64 => Int;
    uint64, null_uint64: u64 => Uint;
    float64, null_float64: f64 => Float;
}

impl ColumnMap {
    pub fn bool(&mut self, v: &mut bool) -> DmlResult<()> {
        if self.is_scan() {
            *v = self.parse_bool()?.unwrap_or_default();
        } else {
            self.args.push(Value::Bool(*v));
        }
        Ok(())
    }

    pub fn null_bool(&mut self, v: &mut Option<bool>) -> DmlResult<()> {
        if self.is_scan() {
            *v = self.parse_bool()?;
        } else {
            self.args.push((*v).into());
        }
        Ok(())
    }

    pub fn string(&mut self, v: &mut String) -> DmlResult<()> {
        if self.is_scan() {
            v.clear();
            if let Some(s) = self.text()? {
                v.push_str(s);
            }
        } else {
            self.args.push(Value::String(v.clone()));
        }
        Ok(())
    }

    pub fn null_string(&mut self, v: &mut Option<String>) -> DmlResult<()> {
        if self.is_scan() {
            *v = self.text()?.map(str::to_string);
        } else {
            self.args.push(v.clone().into());
        }
        Ok(())
    }

    pub fn bytes(&mut self, v: &mut Vec<u8>) -> DmlResult<()> {
        if self.is_scan() {
            v.clear();
            if let Some(b) = self.raw() {
                v.extend_from_slice(b);
            }
        } else {
            self.args.push(Value::Bytes(v.clone()));
        }
        Ok(())
    }

    pub fn time(&mut self, v: &mut NaiveDateTime) -> DmlResult<()> {
        if self.is_scan() {
            *v = self.parse_time()?.unwrap_or_default();
        } else {
            self.args.push(Value::Time(*v));
        }
        Ok(())
    }

    pub fn null_time(&mut self, v: &mut Option<NaiveDateTime>) -> DmlResult<()> {
        if self.is_scan() {
            *v = self.parse_time()?;
        } else {
            self.args.push((*v).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Product {
        id: i64,
        sku: String,
        price: Option<f64>,
        active: bool,
    }

    impl ColumnMapper for Product {
        fn map_columns(&mut self, cm: &mut ColumnMap) -> DmlResult<()> {
            while cm.next(4) {
                match cm.column() {
                    "id" | "0" => cm.int64(&mut self.id)?,
                    "sku" | "1" => cm.string(&mut self.sku)?,
                    "price" | "2" => cm.null_float64(&mut self.price)?,
                    "active" | "3" => cm.bool(&mut self.active)?,
                    c => return Err(DmlError::unknown_column(c)),
                }
            }
            Ok(())
        }
    }

    fn product() -> Product {
        Product {
            id: 7,
            sku: "SKU-7".into(),
            price: None,
            active: true,
        }
    }

    #[test]
    fn test_read_explicit_columns() {
        let mut cm = ColumnMap::default();
        cm.start(ColumnMapMode::ReadExplicitColumnSet, ["sku", "id"]);
        product().map_columns(&mut cm).unwrap();
        assert_eq!(
            cm.args(),
            &[Value::String("SKU-7".into()), Value::Int(7)][..]
        );
    }

    #[test]
    fn test_read_all_columns() {
        let mut cm = ColumnMap::default();
        cm.start(ColumnMapMode::ReadAllColumns, Vec::<String>::new());
        product().map_columns(&mut cm).unwrap();
        assert_eq!(cm.field_count(), 4);
        assert_eq!(
            cm.args(),
            &[
                Value::Int(7),
                Value::String("SKU-7".into()),
                Value::Null,
                Value::Bool(true)
            ][..]
        );
    }

    #[test]
    fn test_cursor_rewinds_for_next_element() {
        let mut cm = ColumnMap::default();
        cm.start(ColumnMapMode::ReadExplicitColumnSet, ["id"]);
        let mut a = product();
        let mut b = Product { id: 8, ..product() };
        a.map_columns(&mut cm).unwrap();
        b.map_columns(&mut cm).unwrap();
        assert_eq!(cm.args(), &[Value::Int(7), Value::Int(8)][..]);
    }

    #[test]
    fn test_unknown_column_aborts() {
        let mut cm = ColumnMap::default();
        cm.start(ColumnMapMode::ReadExplicitColumnSet, ["id", "colour"]);
        let err = product().map_columns(&mut cm).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_scan_row() {
        let mut cm = ColumnMap::default();
        cm.set_columns(vec!["id".into(), "sku".into(), "price".into(), "active".into()]);
        cm.set_row(
            1,
            vec![
                Some(b"42".to_vec()),
                Some(b"A-1".to_vec()),
                Some(b"9.5".to_vec()),
                Some(b"1".to_vec()),
            ],
        );
        let mut p = Product::default();
        p.map_columns(&mut cm).unwrap();
        assert_eq!(
            p,
            Product {
                id: 42,
                sku: "A-1".into(),
                price: Some(9.5),
                active: true
            }
        );
        assert_eq!(cm.count(), 1);
    }

    #[test]
    fn test_scan_rejects_bad_utf8() {
        let mut cm = ColumnMap::default();
        cm.set_columns(vec!["sku".into()]);
        cm.set_row(1, vec![Some(vec![0xff, 0xfe])]);
        let err = Product::default().map_columns(&mut cm).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotValid);
    }

    #[test]
    fn test_scan_time_and_null() {
        let mut cm = ColumnMap::default();
        cm.set_columns(vec!["t".into()]);
        cm.set_row(1, vec![Some(b"2024-03-01 10:20:30.5".to_vec())]);
        assert!(cm.next(0));
        let mut t = None;
        cm.null_time(&mut t).unwrap();
        assert_eq!(
            t.unwrap().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            "2024-03-01 10:20:30.500"
        );

        cm.set_row(2, vec![None]);
        assert!(cm.next(0));
        cm.null_time(&mut t).unwrap();
        assert_eq!(t, None);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut cm = ColumnMap::default();
        cm.start(ColumnMapMode::ReadExplicitColumnSet, ["id"]);
        cm.push(1i64);
        cm.reset();
        assert_eq!(cm.mode(), ColumnMapMode::ScanRow);
        assert!(cm.args().is_empty());
        assert!(cm.columns().is_empty());
    }
}
