use std::time::Duration;

/// Configuration for [`PgSession`](super::PgSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Named prepared statement cache.
    pub statement_cache: StatementCacheConfig,
    /// Timeout applied to preparing and to running a statement.
    pub query_timeout: Option<Duration>,
    /// Truncate SQL in log events (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

/// Cache of statements prepared under a name, per session.
#[derive(Debug, Clone)]
pub struct StatementCacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 64,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            statement_cache: StatementCacheConfig::default(),
            query_timeout: None,
            max_sql_length: Some(200),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set query timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Set the named statement cache capacity. `0` disables the cache.
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache.enabled = capacity > 0;
        self.statement_cache.capacity = capacity;
        self
    }

    pub fn no_statement_cache(mut self) -> Self {
        self.statement_cache.enabled = false;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}
