//! Lowering [`Sql`] fragments to executable PostgreSQL text.

use crate::error::{SqlError, SqlResult};
use crate::sql::{Param, ParamValues, Sql, SqlChunk};
use std::fmt::Write as _;
use tokio_postgres::types::{ToSql, Type};

/// The PostgreSQL dialect: `$n` placeholders numbered left to right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgDialect;

impl PgDialect {
    /// Flatten a fragment tree into SQL text, its parameter slots, and the
    /// declared type of each slot.
    pub fn sql_to_query(&self, sql: &Sql) -> BuiltQuery {
        let mut out = BuiltQuery::default();
        self.write(sql, &mut out);
        out
    }

    fn write(&self, sql: &Sql, out: &mut BuiltQuery) {
        for chunk in sql.chunks() {
            match chunk {
                SqlChunk::Raw(text) => out.sql.push_str(text),
                SqlChunk::Param(param) => {
                    out.types.push(param.ty().cloned());
                    out.params.push(QueryParam::Value(param.clone()));
                    let _ = write!(out.sql, "${}", out.params.len());
                }
                SqlChunk::Placeholder(placeholder) => {
                    out.types.push(placeholder.ty().cloned());
                    out.params
                        .push(QueryParam::Placeholder(placeholder.name().to_string()));
                    let _ = write!(out.sql, "${}", out.params.len());
                }
                SqlChunk::Column(column) => column.write_sql(&mut out.sql),
                SqlChunk::Sql(inner) => self.write(inner, out),
            }
        }
    }
}

/// One `$n` slot of a lowered query.
#[derive(Debug, Clone)]
pub enum QueryParam {
    /// A value bound while building.
    Value(Param),
    /// A named value supplied at execution.
    Placeholder(String),
}

/// A lowered query: SQL text, parameter slots and their declared types.
#[derive(Debug, Clone, Default)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    /// Declared type per slot; `None` lets the server infer it.
    pub types: Vec<Option<Type>>,
}

impl BuiltQuery {
    /// Types to pass to `prepare_typed`: the leading run of declared types.
    ///
    /// Postgres infers any parameter past the end of the list, so a slot
    /// without a declared type ends the run.
    pub fn param_types(&self) -> Vec<Type> {
        self.types.iter().map_while(Option::clone).collect()
    }

    /// Names of the placeholders, in slot order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter_map(|p| match p {
            QueryParam::Placeholder(name) => Some(name.as_str()),
            QueryParam::Value(_) => None,
        })
    }

    /// Fill every slot, taking placeholder values from `values`.
    ///
    /// Fails before any I/O if a placeholder has no value. Values that no
    /// placeholder refers to are ignored.
    pub fn resolve(&self, values: &ParamValues) -> SqlResult<Vec<Param>> {
        self.params
            .iter()
            .map(|p| match p {
                QueryParam::Value(param) => Ok(param.clone()),
                QueryParam::Placeholder(name) => values.get(name).cloned().ok_or_else(|| {
                    SqlError::validation(format!("No value provided for placeholder '{name}'"))
                }),
            })
            .collect()
    }

    /// Drop the type tags, keeping `{ sql, params }`.
    pub fn into_sql_query(self) -> SqlQuery {
        SqlQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Rendered SQL plus its positional parameters.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl SqlQuery {
    /// Bound values as `tokio-postgres` references, or `None` if any slot is a
    /// placeholder that still needs a value.
    pub fn bound_params(&self) -> Option<Vec<&(dyn ToSql + Sync)>> {
        self.params
            .iter()
            .map(|p| match p {
                QueryParam::Value(param) => Some(param.as_to_sql()),
                QueryParam::Placeholder(_) => None,
            })
            .collect()
    }
}
