//! # pgsetop
//!
//! Typed set operators for PostgreSQL SELECT queries.
//!
//! ## Features
//!
//! - **All six operators**: `union`, `union all`, `intersect`, `intersect all`,
//!   `except`, `except all`, as free functions, macros and methods
//! - **Shape checked**: both sides must share a Rust row type and select the
//!   same field names in the same order
//! - **Chains**: `union!(a, b, c)` folds into a left-deep tree
//! - **Ordering and paging** of the combined result, with column references
//!   rewritten so they are valid outside any single SELECT
//! - **Late-bound parameters**: placeholders rendered as `$n` and filled by
//!   name when a prepared statement runs
//!
//! ## Example
//!
//! ```ignore
//! use pgsetop::{Db, Executable, ParamValues, PgSession, Table, placeholder};
//!
//! let db = Db::new(PgSession::new(client));
//! let users = Table::new("users")?;
//! let admins = Table::new("admins")?;
//!
//! let q = pgsetop::union!(
//!     db.select(&users).column(&users.column("name")?).as_row::<(String,)>(),
//!     db.select(&admins).column(&admins.column("name")?).as_row::<(String,)>(),
//! )?
//! .order_by([users.column("name")?.asc()])
//! .limit(placeholder("page_size"));
//!
//! let prepared = q.prepare("people_page").await?;
//! let names = prepared
//!     .execute(&ParamValues::new().set("page_size", 20_i64))
//!     .await?;
//! ```

pub mod column;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod ident;
pub mod row;
pub mod select;
pub mod session;
pub mod setop;
pub mod shape;
pub mod sql;

pub use column::{Column, Table};
pub use dialect::{BuiltQuery, PgDialect, QueryParam, SqlQuery};
pub use error::{SqlError, SqlResult};
pub use exec::{Executable, PreparedQuery};
pub use ident::{Ident, IdentPart, IntoIdent};
pub use row::{FromRow, RowExt};
pub use select::{SelectQuery, select_from};
pub use session::{
    Db, PgConnection, PgSession, Session, SessionConfig, SessionStatement, StatementCacheConfig,
    StatementMeta,
};
pub use shape::{FieldMeta, JoinNullability, RowShape};
pub use sql::{Param, ParamValues, Placeholder, Sql, asc, desc, placeholder, sql};

pub use setop::{
    BoxedQuery, Combinable, IntoOperand, IntoRowCount, Operand, ResultFields, RowCount, SetOperation,
    SetOperationExt, SetOperator, SetOperatorConfig, SetOperatorKind, SetOperators, chain, except,
    except_all, intersect, intersect_all, union, union_all,
};
