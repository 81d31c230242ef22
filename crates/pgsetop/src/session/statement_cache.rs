use crate::error::SqlError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_postgres::Statement;

/// Statements prepared under a name, least recently used evicted first.
///
/// A name maps to one SQL text; re-preparing a name with different SQL
/// replaces the entry.
#[derive(Debug)]
pub(super) struct StatementCache {
    inner: Mutex<StatementCacheInner>,
}

#[derive(Debug)]
struct StatementCacheInner {
    capacity: usize,
    map: HashMap<String, CachedStatement>,
    order: VecDeque<String>,
}

#[derive(Debug, Clone)]
struct CachedStatement {
    sql: String,
    statement: Statement,
}

impl StatementCache {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StatementCacheInner {
                capacity,
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatementCacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The statement cached under `name`, if it was prepared from `sql`.
    pub(super) fn get(&self, name: &str, sql: &str) -> Option<Statement> {
        let mut inner = self.lock();
        let cached = inner.map.get(name)?;
        if cached.sql != sql {
            return None;
        }
        let statement = cached.statement.clone();
        inner.touch(name);
        Some(statement)
    }

    pub(super) fn insert(&self, name: &str, sql: &str, statement: Statement) {
        let mut inner = self.lock();
        let entry = CachedStatement {
            sql: sql.to_string(),
            statement,
        };
        if inner.map.insert(name.to_string(), entry).is_some() {
            inner.touch(name);
        } else {
            inner.order.push_back(name.to_string());
        }
        inner.evict_if_needed();
    }

    pub(super) fn remove(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.map.remove(name).is_some();
        if removed {
            inner.remove_from_order(name);
        }
        removed
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().map.len()
    }

    #[cfg(test)]
    fn names(&self) -> Vec<String> {
        self.lock().order.iter().cloned().collect()
    }
}

impl StatementCacheInner {
    fn touch(&mut self, name: &str) {
        if let Some(pos) = self.order.iter().position(|k| k.as_str() == name) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove_from_order(&mut self, name: &str) {
        if let Some(pos) = self.order.iter().position(|k| k.as_str() == name) {
            let _ = self.order.remove(pos);
        }
    }

    fn evict_if_needed(&mut self) {
        if self.capacity == 0 {
            self.map.clear();
            self.order.clear();
            return;
        }

        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            let _ = self.map.remove(&oldest);
        }
    }
}

/// Errors after which a cached statement must be prepared again.
pub(super) fn is_stale_statement_error(err: &SqlError) -> bool {
    let SqlError::Query(e) = err else {
        return false;
    };
    let Some(db_err) = e.as_db_error() else {
        return false;
    };

    match db_err.code().code() {
        // "cached plan must not change result type" (e.g. after schema change)
        "0A000" => db_err
            .message()
            .to_ascii_lowercase()
            .contains("cached plan must not change result type"),
        // invalid_sql_statement_name
        "26000" => true,
        _ => false,
    }
}
