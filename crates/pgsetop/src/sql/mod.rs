//! SQL fragment model.
//!
//! A [`Sql`] is a tree of chunks: raw text, bound values, late-bound
//! [`Placeholder`]s, [`Column`](crate::Column) references and nested
//! fragments. Query builders render to `Sql`; the tree stays structured until
//! [`PgDialect`](crate::PgDialect) lowers it, which is what lets a combined
//! query rewrite column references produced by independent sub-builders.
//!
//! # Example
//!
//! ```ignore
//! use pgsetop::{Sql, placeholder};
//!
//! let mut q = pgsetop::sql("select id from users where status = ");
//! q.push_bind("active").push(" and org_id = ").push_placeholder(placeholder("org"));
//!
//! assert_eq!(q.to_sql(), "select id from users where status = $1 and org_id = $2");
//! ```

mod builder;
mod param;


pub use builder::{Sql, SqlChunk, asc, desc};
pub use param::{Param, ParamValues, Placeholder, placeholder};

/// Start building a SQL fragment.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}
