//! Preparing and executing queries through their session.

use crate::dialect::BuiltQuery;
use crate::error::{SqlError, SqlResult};
use crate::row::FromRow;
use crate::session::{SessionStatement, StatementMeta};
use crate::setop::Combinable;
use crate::shape::{JoinNullability, RowShape};
use crate::sql::{Param, ParamValues};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::Instrument;

/// Prepare and execute a [`Combinable`] query on the session it was built with.
///
/// Every method fails with [`SqlError::SessionMissing`] when the query (for a
/// combination: its left-most operand) was built without a session.
pub trait Executable: Combinable {
    /// Prepare as a named statement. Preparing the same name again on the same
    /// session reuses the server-side statement.
    fn prepare(
        &self,
        name: &str,
    ) -> impl Future<Output = SqlResult<PreparedQuery<Self::Row>>> + Send {
        prepare_query(self, Some(name))
    }

    /// Prepare an anonymous statement.
    fn prepare_unnamed(
        &self,
    ) -> impl Future<Output = SqlResult<PreparedQuery<Self::Row>>> + Send {
        prepare_query(self, None)
    }

    /// Prepare anonymously and execute at once, decoding every row.
    fn execute(
        &self,
        values: &ParamValues,
    ) -> impl Future<Output = SqlResult<Vec<Self::Row>>> + Send
    where
        Self::Row: FromRow,
    {
        async move { self.prepare_unnamed().await?.execute(values).await }
    }

    /// Prepare anonymously and execute at once, returning raw rows.
    fn execute_rows(
        &self,
        values: &ParamValues,
    ) -> impl Future<Output = SqlResult<Vec<Row>>> + Send {
        async move { self.prepare_unnamed().await?.execute_rows(values).await }
    }
}

impl<T: Combinable> Executable for T {}

async fn prepare_query<Q>(query: &Q, name: Option<&str>) -> SqlResult<PreparedQuery<Q::Row>>
where
    Q: Combinable + ?Sized,
{
    let config = query.set_operator_config();
    let session = config.session.ok_or(SqlError::SessionMissing)?;
    query.validate()?;

    let built = config.dialect.sql_to_query(&query.render());
    let meta = StatementMeta::new(config.fields, config.join_nullability);
    let span = tracing::debug_span!(
        "pgsetop.prepare",
        statement = name.unwrap_or("-"),
        param_count = built.params.len()
    );
    let statement = session
        .prepare_query(&built, &meta, name)
        .instrument(span)
        .await?;

    Ok(PreparedQuery {
        name: name.map(str::to_string),
        query: built,
        meta,
        statement,
        _row: PhantomData,
    })
}

/// A compiled statement, reusable with different placeholder values.
pub struct PreparedQuery<R> {
    name: Option<String>,
    query: BuiltQuery,
    meta: StatementMeta,
    statement: Box<dyn SessionStatement>,
    _row: PhantomData<fn() -> R>,
}

impl<R> PreparedQuery<R> {
    /// The statement name, `None` for anonymous statements.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sql(&self) -> &str {
        &self.query.sql
    }

    pub fn fields(&self) -> &RowShape {
        self.meta.fields()
    }

    pub fn join_nullability(&self) -> &JoinNullability {
        self.meta.join_nullability()
    }

    /// Names of the placeholders this statement needs values for.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.query.placeholders()
    }

    /// Execute, decoding every row into `R`.
    pub async fn execute(&self, values: &ParamValues) -> SqlResult<Vec<R>>
    where
        R: FromRow,
    {
        let rows = self.execute_rows(values).await?;
        rows.iter().map(R::from_row).collect()
    }

    /// Execute, returning raw rows.
    ///
    /// Placeholders are resolved by name from `values` before anything is
    /// sent; a missing value fails with [`SqlError::Validation`].
    pub async fn execute_rows(&self, values: &ParamValues) -> SqlResult<Vec<Row>> {
        let params = self.query.resolve(values)?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(Param::as_to_sql).collect();
        let span = tracing::debug_span!(
            "pgsetop.execute",
            statement = self.name().unwrap_or("-"),
            param_count = refs.len()
        );
        self.statement.query(&refs).instrument(span).await
    }
}

impl<R> fmt::Debug for PreparedQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedQuery")
            .field("name", &self.name)
            .field("sql", &self.query.sql)
            .field("fields", self.meta.fields())
            .finish_non_exhaustive()
    }
}
