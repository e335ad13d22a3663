//! The execution boundary and the helpers that run bound statements
//! across it.
//!
//! The crate never talks to a server itself. A driver implements
//! [`QueryExecPreparer`] and [`RowCursor`]; rows travel as text-protocol
//! columns (`None` for NULL) and are scanned through the column-mapper
//! protocol.

use async_trait::async_trait;

use crate::ast::Value;
use crate::bind::Bound;
use crate::error::{DmlError, DmlResult, ResultExt};
use crate::iterate;
use crate::record::{ColumnMap, ColumnMapper};

/// One result row: text-protocol columns, `None` for NULL.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Summary of a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub last_insert_id: u64,
    pub rows_affected: u64,
}

/// A single row together with its column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: RawRow,
}

/// An open result set.
#[async_trait]
pub trait RowCursor: Send {
    /// Advance to the next row; false when the result set is exhausted.
    async fn next(&mut self) -> DmlResult<bool>;

    /// Copy the current row into `dest`, replacing its contents.
    fn scan(&mut self, dest: &mut RawRow) -> DmlResult<()>;

    fn column_names(&self) -> DmlResult<Vec<String>>;

    async fn close(&mut self) -> DmlResult<()>;
}

/// A statement prepared on the server.
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    async fn execute(&self, args: &[Value]) -> DmlResult<ExecResult>;

    async fn query(&self, args: &[Value]) -> DmlResult<Box<dyn RowCursor>>;

    async fn close(&self) -> DmlResult<()>;
}

/// A connection, pool or transaction able to run SQL.
#[async_trait]
pub trait QueryExecPreparer: Send + Sync {
    async fn prepare(&self, sql: &str) -> DmlResult<Box<dyn PreparedStatement>>;

    async fn execute(&self, sql: &str, args: &[Value]) -> DmlResult<ExecResult>;

    async fn query(&self, sql: &str, args: &[Value]) -> DmlResult<Box<dyn RowCursor>>;

    /// The first row of a query, if any.
    async fn query_row(&self, sql: &str, args: &[Value]) -> DmlResult<Option<Row>> {
        let mut cursor = self.query(sql, args).await?;
        let first = first_row(cursor.as_mut()).await;
        let closed = cursor.close().await;
        let row = first?;
        closed?;
        Ok(row)
    }
}

async fn first_row(cursor: &mut dyn RowCursor) -> DmlResult<Option<Row>> {
    if !cursor.next().await? {
        return Ok(None);
    }
    let mut values = RawRow::new();
    cursor.scan(&mut values)?;
    Ok(Some(Row {
        columns: cursor.column_names()?,
        values,
    }))
}

/// A server-side prepared statement and the SQL it was prepared from.
pub struct Prepared {
    sql: String,
    stmt: Box<dyn PreparedStatement>,
}

impl Prepared {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn execute(&self, args: &[Value]) -> DmlResult<ExecResult> {
        self.stmt.execute(args).await
    }

    pub async fn query(&self, args: &[Value]) -> DmlResult<Box<dyn RowCursor>> {
        self.stmt.query(args).await
    }

    pub async fn close(self) -> DmlResult<()> {
        self.stmt.close().await
    }
}

impl std::fmt::Debug for Prepared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prepared").field("sql", &self.sql).finish()
    }
}

/// Reads the first column of every row.
#[derive(Default)]
struct FirstColumn<T> {
    values: Vec<T>,
}

macro_rules! first_column {
    ($($t:ty => $setter:ident),* $(,)?) => {
        $(impl ColumnMapper for FirstColumn<$t> {
            fn map_columns(&mut self, cm: &mut ColumnMap) -> DmlResult<()> {
                let mut v = <$t>::default();
                if cm.next(1) {
                    cm.$setter(&mut v)?;
                }
                self.values.push(v);
                Ok(())
            }

            fn is_collection(&self) -> bool {
                true
            }
        })*
    };
}

first_column! {
    i64 => int64,
    String => string,
}

impl Bound<'_> {
    pub async fn exec(&mut self, db: &dyn QueryExecPreparer) -> DmlResult<ExecResult> {
        let (sql, args) = self.prepare()?;
        tracing::debug!(id = %self.id(), arguments = args.len(), "exec: {sql}");
        db.execute(&sql, &args)
            .await
            .context_with(|| format!("exec {sql:?}"))
    }

    /// Execute and require exactly `rows` affected rows.
    pub async fn exec_expecting(
        &mut self,
        db: &dyn QueryExecPreparer,
        rows: u64,
    ) -> DmlResult<ExecResult> {
        let result = self.exec(db).await?;
        if result.rows_affected != rows {
            return Err(DmlError::not_valid(format!(
                "{} {:?} affected {} rows, expected {rows}",
                self.compiled().kind,
                self.id(),
                result.rows_affected
            )));
        }
        Ok(result)
    }

    pub async fn query(&mut self, db: &dyn QueryExecPreparer) -> DmlResult<Box<dyn RowCursor>> {
        let (sql, args) = self.prepare()?;
        tracing::debug!(id = %self.id(), arguments = args.len(), "query: {sql}");
        db.query(&sql, &args)
            .await
            .context_with(|| format!("query {sql:?}"))
    }

    /// Scan every row into `record` and return the row count.
    pub async fn load(
        &mut self,
        db: &dyn QueryExecPreparer,
        record: &mut dyn ColumnMapper,
    ) -> DmlResult<u64> {
        let cursor = self.query(db).await?;
        iterate::serial(cursor, |cm| record.map_columns(cm)).await
    }

    /// The first column of the first row. No rows is `NotFound`.
    pub async fn load_int64(&mut self, db: &dyn QueryExecPreparer) -> DmlResult<i64> {
        let mut values = self.load_int64s(db).await?;
        if values.is_empty() {
            return Err(self.no_rows());
        }
        Ok(values.swap_remove(0))
    }

    /// The first column of every row.
    pub async fn load_int64s(&mut self, db: &dyn QueryExecPreparer) -> DmlResult<Vec<i64>> {
        let mut col = FirstColumn::<i64>::default();
        self.load(db, &mut col).await?;
        Ok(col.values)
    }

    pub async fn load_string(&mut self, db: &dyn QueryExecPreparer) -> DmlResult<String> {
        let mut col = FirstColumn::<String>::default();
        self.load(db, &mut col).await?;
        if col.values.is_empty() {
            return Err(self.no_rows());
        }
        Ok(col.values.swap_remove(0))
    }

    /// Prepare the bound SQL on the server.
    pub async fn prepare_statement(&mut self, db: &dyn QueryExecPreparer) -> DmlResult<Prepared> {
        if self.options().interpolate {
            return Err(DmlError::not_allowed(
                "an interpolated statement cannot be prepared",
            ));
        }
        let (sql, _) = self.prepare()?;
        tracing::debug!(id = %self.id(), "prepare: {sql}");
        let stmt = db
            .prepare(&sql)
            .await
            .context_with(|| format!("prepare {sql:?}"))?;
        Ok(Prepared { sql, stmt })
    }

    /// Execute a prepared statement with the current arguments.
    pub async fn exec_prepared(&mut self, stmt: &Prepared) -> DmlResult<ExecResult> {
        if self.options().interpolate {
            return Err(DmlError::not_allowed(
                "an interpolated statement cannot run as a prepared statement",
            ));
        }
        let (sql, args) = self.prepare()?;
        if sql != stmt.sql {
            return Err(DmlError::mismatch(format!(
                "arguments reshape the SQL to {sql:?}, prepared was {:?}",
                stmt.sql
            )));
        }
        stmt.execute(&args).await
    }

    fn no_rows(&self) -> DmlError {
        DmlError::not_found(format!(
            "{} {:?} returned no rows",
            self.compiled().kind,
            self.id()
        ))
    }
}
