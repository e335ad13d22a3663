//! Records and an in-memory driver shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dml::prelude::*;
use parking_lot::Mutex;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub price: Option<f64>,
    pub active: bool,
}

impl Product {
    pub fn new(id: i64, sku: &str) -> Self {
        Self {
            id,
            sku: sku.to_string(),
            price: None,
            active: true,
        }
    }
}

impl ColumnMapper for Product {
    fn map_columns(&mut self, cm: &mut ColumnMap) -> DmlResult<()> {
        while cm.next(4) {
            match cm.column() {
                "id" | "entity_id" | "0" => cm.int64(&mut self.id)?,
                "sku" | "1" => cm.string(&mut self.sku)?,
                "price" | "2" => cm.null_float64(&mut self.price)?,
                "active" | "3" => cm.bool(&mut self.active)?,
                c => return Err(DmlError::unknown_column(c)),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Products(pub Vec<Product>);

impl ColumnMapper for Products {
    fn map_columns(&mut self, cm: &mut ColumnMap) -> DmlResult<()> {
        match cm.mode() {
            ColumnMapMode::ScanRow => {
                let mut p = Product::default();
                p.map_columns(cm)?;
                self.0.push(p);
            }
            ColumnMapMode::ReadCollectionColumnSet => {
                while cm.next(4) {
                    match cm.column() {
                        "id" | "entity_id" => cm.push(Value::Ints(self.0.iter().map(|p| p.id).collect())),
                        "sku" => cm.push(Value::Strings(self.0.iter().map(|p| p.sku.clone()).collect())),
                        c => return Err(DmlError::unknown_column(c)),
                    }
                }
            }
            ColumnMapMode::ReadAllColumns | ColumnMapMode::ReadExplicitColumnSet => {
                for p in &mut self.0 {
                    p.map_columns(cm)?;
                }
            }
        }
        Ok(())
    }

    fn is_collection(&self) -> bool {
        true
    }
}

pub fn text_row<const N: usize>(cols: [Option<&str>; N]) -> RawRow {
    cols.into_iter()
        .map(|c| c.map(|s| s.as_bytes().to_vec()))
        .collect()
}

/// Statements seen by [`FakeDb`].
pub type Log = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

/// An in-memory database answering every query with the same rows.
#[derive(Default)]
pub struct FakeDb {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub rows_affected: u64,
    pub log: Log,
    pub closed: Arc<AtomicBool>,
    pub prepared: Arc<AtomicUsize>,
    /// Fail `next` after this many rows.
    pub fail_after: Option<usize>,
}

impl FakeDb {
    pub fn with_rows<I, S>(columns: I, rows: Vec<RawRow>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
            ..Default::default()
        }
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().clone()
    }

    pub fn cursor_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn cursor(&self) -> FakeCursor {
        FakeCursor {
            columns: self.columns.clone(),
            rows: self.rows.clone().into_iter(),
            current: None,
            read: 0,
            fail_after: self.fail_after,
            closed: Arc::clone(&self.closed),
        }
    }
}

#[async_trait]
impl QueryExecPreparer for FakeDb {
    async fn prepare(&self, sql: &str) -> DmlResult<Box<dyn PreparedStatement>> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStatement {
            sql: sql.to_string(),
            log: Arc::clone(&self.log),
            rows_affected: self.rows_affected,
        }))
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> DmlResult<ExecResult> {
        self.log.lock().push((sql.to_string(), args.to_vec()));
        Ok(ExecResult {
            last_insert_id: 42,
            rows_affected: self.rows_affected,
        })
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DmlResult<Box<dyn RowCursor>> {
        self.log.lock().push((sql.to_string(), args.to_vec()));
        Ok(Box::new(self.cursor()))
    }
}

pub struct FakeStatement {
    sql: String,
    log: Log,
    rows_affected: u64,
}

#[async_trait]
impl PreparedStatement for FakeStatement {
    async fn execute(&self, args: &[Value]) -> DmlResult<ExecResult> {
        self.log.lock().push((self.sql.clone(), args.to_vec()));
        Ok(ExecResult {
            last_insert_id: 0,
            rows_affected: self.rows_affected,
        })
    }

    async fn query(&self, _args: &[Value]) -> DmlResult<Box<dyn RowCursor>> {
        Err(DmlError::execution("prepared queries are not supported by the fake"))
    }

    async fn close(&self) -> DmlResult<()> {
        Ok(())
    }
}

pub struct FakeCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<RawRow>,
    current: Option<RawRow>,
    read: usize,
    fail_after: Option<usize>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl RowCursor for FakeCursor {
    async fn next(&mut self) -> DmlResult<bool> {
        if self.fail_after == Some(self.read) {
            return Err(DmlError::execution("connection reset"));
        }
        self.current = self.rows.next();
        if self.current.is_some() {
            self.read += 1;
        }
        Ok(self.current.is_some())
    }

    fn scan(&mut self, dest: &mut RawRow) -> DmlResult<()> {
        match &self.current {
            Some(row) => {
                dest.clone_from(row);
                Ok(())
            }
            None => Err(DmlError::execution("scan without a current row")),
        }
    }

    fn column_names(&self) -> DmlResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    async fn close(&mut self) -> DmlResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
