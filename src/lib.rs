//! # dml
//!
//! MySQL/MariaDB statement builder and argument binder.
//!
//! Statements are built as typed ASTs, rendered once per cache key into SQL
//! with an ordered list of placeholder slots, and bound to values from
//! positional arguments, named arguments or records implementing
//! [`ColumnMapper`]. The result is either parameterized SQL plus a flat
//! value list, or, on request, a single interpolated SQL string.
//!
//! ```
//! use dml::prelude::*;
//!
//! let mut select = Select::new(["entity_id", "email"])
//!     .from_alias("customer_entity", "ce")
//!     .filter(column("ce.store_id").placeholder())
//!     .filter(column("ce.email").like().str("%@example.com"))
//!     .order_by_desc("ce.created_at")
//!     .limit(0, 10);
//!
//! assert_eq!(
//!     select.sql().unwrap(),
//!     "SELECT `entity_id`, `email` FROM `customer_entity` AS `ce` \
//!      WHERE (`ce`.`store_id` = ?) AND (`ce`.`email` LIKE ?) \
//!      ORDER BY `ce`.`created_at` DESC LIMIT 10"
//! );
//!
//! let (sql, args) = select.bind().unwrap().int64(1).prepare().unwrap();
//! assert_eq!(args, vec![Value::Int(1), Value::String("%@example.com".into())]);
//! # let _ = sql;
//! ```

pub mod ast;
pub mod bind;
pub mod config;
pub mod error;
pub mod exec;
pub mod expand;
pub mod ident;
pub mod interpolate;
pub mod iterate;
pub mod pool;
pub mod record;
pub mod transpiler;

pub use ast::{Argument, Arguments, Value};
pub use bind::Bound;
pub use config::{BindOptions, BuilderOptions, DmlConfig};
pub use error::{DmlError, DmlResult, ErrorKind};
pub use exec::{ExecResult, QueryExecPreparer, RowCursor};
pub use record::{ColumnMap, ColumnMapMode, ColumnMapper, QualifiedRecord};
pub use transpiler::{CachedSql, Placeholder, Statement, ToSql};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::bind::Bound;
    pub use crate::config::{BindOptions, BuilderOptions, DmlConfig};
    pub use crate::error::*;
    pub use crate::exec::{ExecResult, PreparedStatement, QueryExecPreparer, RawRow, Row, RowCursor};
    pub use crate::record::{ColumnMap, ColumnMapMode, ColumnMapper, QualifiedRecord};
    pub use crate::transpiler::{Statement, ToSql};
}
