//! Sessions: where prepared queries actually run.
//!
//! Query builders hold an optional `Arc<dyn Session>`. A builder without one
//! can still render SQL but cannot prepare or execute; see
//! [`SqlError::SessionMissing`](crate::SqlError::SessionMissing).
//!
//! [`PgSession`] runs queries on a `tokio-postgres` client (or a pooled
//! `deadpool-postgres` client with the `pool` feature). [`Db`] is the handle
//! applications keep around to create session-bound queries.

mod config;
mod pg;
mod statement_cache;

pub use config::{SessionConfig, StatementCacheConfig};
pub use pg::{PgConnection, PgSession};

use crate::column::Table;
use crate::dialect::BuiltQuery;
use crate::error::SqlResult;
use crate::select::SelectQuery;
use crate::shape::{JoinNullability, RowShape};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// What a session needs to know about the rows a statement returns.
#[derive(Debug, Clone, Default)]
pub struct StatementMeta {
    fields: RowShape,
    join_nullability: JoinNullability,
}

impl StatementMeta {
    pub fn new(fields: RowShape, join_nullability: JoinNullability) -> Self {
        Self {
            fields,
            join_nullability,
        }
    }

    /// Result fields in column order.
    pub fn fields(&self) -> &RowShape {
        &self.fields
    }

    pub fn join_nullability(&self) -> &JoinNullability {
        &self.join_nullability
    }

    /// Whether the column at `index` may be NULL, counting outer joins.
    pub fn is_nullable(&self, index: usize) -> bool {
        self.fields
            .fields()
            .get(index)
            .is_some_and(|f| self.join_nullability.field_is_nullable(f))
    }
}

/// A connection-like object able to compile statements.
#[async_trait]
pub trait Session: Send + Sync {
    /// Compile `query` into a statement. `name` identifies a reusable
    /// statement; `None` prepares an anonymous one.
    async fn prepare_query(
        &self,
        query: &BuiltQuery,
        meta: &StatementMeta,
        name: Option<&str>,
    ) -> SqlResult<Box<dyn SessionStatement>>;
}

/// A statement compiled by a [`Session`].
#[async_trait]
pub trait SessionStatement: Send + Sync {
    /// Run the statement with positional parameters.
    async fn query(&self, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>>;
}

/// A database handle: creates queries bound to its session.
///
/// # Example
/// ```ignore
/// let (client, connection) = tokio_postgres::connect(&url, NoTls).await?;
/// tokio::spawn(connection);
/// let db = Db::new(PgSession::new(client));
///
/// let users = Table::new("users")?;
/// let q = db.select(&users).column(&users.column("id")?);
/// ```
#[derive(Clone)]
pub struct Db {
    session: Arc<dyn Session>,
}

impl Db {
    pub fn new(session: impl Session + 'static) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn from_shared(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Start a SELECT bound to this database.
    pub fn select(&self, table: &Table) -> SelectQuery {
        SelectQuery::new(table).session(self.session.clone())
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}
