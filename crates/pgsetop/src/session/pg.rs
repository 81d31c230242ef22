use super::config::SessionConfig;
use super::statement_cache::{StatementCache, is_stale_statement_error};
use super::{Session, SessionStatement, StatementMeta};
use crate::dialect::BuiltQuery;
use crate::error::{SqlError, SqlResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Row, Statement};

/// Anything that hands out a `tokio-postgres` client.
pub trait PgConnection: Send + Sync + 'static {
    fn client(&self) -> &Client;
}

impl PgConnection for Client {
    fn client(&self) -> &Client {
        self
    }
}

#[cfg(feature = "pool")]
impl PgConnection for deadpool_postgres::Client {
    fn client(&self) -> &Client {
        self
    }
}

/// A [`Session`] backed by a PostgreSQL connection.
///
/// Statements prepared under a name are kept in a per-session cache, so
/// preparing the same named query again reuses the server-side statement.
/// Anonymous statements are prepared every time.
///
/// # Example
/// ```ignore
/// let session = PgSession::with_config(
///     client,
///     SessionConfig::new().timeout(Duration::from_secs(5)),
/// );
/// let db = Db::new(session);
/// ```
pub struct PgSession<C: PgConnection = Client> {
    conn: Arc<C>,
    config: SessionConfig,
    statements: Option<Arc<StatementCache>>,
}

impl<C: PgConnection> PgSession<C> {
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, SessionConfig::default())
    }

    pub fn with_config(conn: C, config: SessionConfig) -> Self {
        let statements = config
            .statement_cache
            .enabled
            .then(|| Arc::new(StatementCache::new(config.statement_cache.capacity)));
        Self {
            conn: Arc::new(conn),
            config,
            statements,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

#[cfg(feature = "pool")]
impl PgSession<deadpool_postgres::Client> {
    /// Check a connection out of `pool` for the lifetime of the session.
    pub async fn from_pool(pool: &deadpool_postgres::Pool) -> SqlResult<Self> {
        Self::from_pool_with_config(pool, SessionConfig::default()).await
    }

    pub async fn from_pool_with_config(
        pool: &deadpool_postgres::Pool,
        config: SessionConfig,
    ) -> SqlResult<Self> {
        let client = pool.get().await?;
        Ok(Self::with_config(client, config))
    }
}

#[async_trait]
impl<C: PgConnection> Session for PgSession<C> {
    async fn prepare_query(
        &self,
        query: &BuiltQuery,
        meta: &StatementMeta,
        name: Option<&str>,
    ) -> SqlResult<Box<dyn SessionStatement>> {
        tracing::debug!(
            target: "pgsetop.sql",
            statement = name.unwrap_or("-"),
            param_count = query.params.len(),
            sql = %self.truncate_sql(&query.sql),
            "prepare"
        );

        let param_types = query.param_types();
        let cached = match (name, &self.statements) {
            (Some(name), Some(cache)) => Some((name, cache)),
            _ => None,
        };

        let hit = cached.and_then(|(name, cache)| cache.get(name, &query.sql));
        let statement = match hit {
            Some(statement) => {
                tracing::trace!(target: "pgsetop.session", statement = name, "statement cache hit");
                statement
            }
            None => {
                if cached.is_some() {
                    tracing::trace!(target: "pgsetop.session", statement = name, "statement cache miss");
                }
                let client = self.conn.client();
                let statement = with_timeout(
                    client,
                    self.config.query_timeout,
                    client.prepare_typed(&query.sql, &param_types),
                )
                .await?;
                if let Some((name, cache)) = cached {
                    cache.insert(name, &query.sql, statement.clone());
                }
                statement
            }
        };

        if statement.columns().len() != meta.fields().len() {
            if let Some((name, cache)) = cached {
                let _ = cache.remove(name);
            }
            return Err(SqlError::validation(format!(
                "Prepared statement returns {} columns, expected {}",
                statement.columns().len(),
                meta.fields().len()
            )));
        }

        Ok(Box::new(PgStatement {
            conn: self.conn.clone(),
            statement,
            sql: query.sql.clone(),
            param_types,
            cache: cached.map(|(name, cache)| (name.to_string(), cache.clone())),
            timeout: self.config.query_timeout,
        }))
    }
}

impl<C: PgConnection> std::fmt::Debug for PgSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession")
            .field("config", &self.config)
            .field("statements", &self.statements)
            .finish_non_exhaustive()
    }
}

struct PgStatement<C: PgConnection> {
    conn: Arc<C>,
    statement: Statement,
    sql: String,
    param_types: Vec<Type>,
    cache: Option<(String, Arc<StatementCache>)>,
    timeout: Option<Duration>,
}

#[async_trait]
impl<C: PgConnection> SessionStatement for PgStatement<C> {
    async fn query(&self, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        let expected = self.statement.params().len();
        if params.len() != expected {
            return Err(SqlError::validation(format!(
                "Statement expects {expected} parameters, got {}",
                params.len()
            )));
        }

        let client = self.conn.client();
        let result = with_timeout(client, self.timeout, client.query(&self.statement, params)).await;

        // A named statement can go stale under us (schema change, DISCARD ALL).
        // Prepare it again once and retry.
        match (result, &self.cache) {
            (Err(err), Some((name, cache))) if is_stale_statement_error(&err) => {
                tracing::debug!(target: "pgsetop.session", statement = %name, "re-preparing stale statement");
                let _ = cache.remove(name);
                let statement = with_timeout(
                    client,
                    self.timeout,
                    client.prepare_typed(&self.sql, &self.param_types),
                )
                .await?;
                cache.insert(name, &self.sql, statement.clone());
                with_timeout(client, self.timeout, client.query(&statement, params)).await
            }
            (result, _) => result,
        }
    }
}

async fn with_timeout<T, F>(client: &Client, timeout: Option<Duration>, future: F) -> SqlResult<T>
where
    F: Future<Output = Result<T, tokio_postgres::Error>> + Send,
{
    match timeout {
        Some(timeout) => match tokio::time::timeout(timeout, future).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                let cancel_token = client.cancel_token();
                tokio::spawn(async move {
                    let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                });
                Err(SqlError::Timeout(timeout))
            }
        },
        None => Ok(future.await?),
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
