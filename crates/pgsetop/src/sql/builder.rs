use super::param::{Param, Placeholder};
use crate::column::Column;
use crate::dialect::PgDialect;
use crate::error::SqlResult;
use crate::ident::IntoIdent;
use tokio_postgres::types::ToSql;

/// One piece of a [`Sql`] fragment.
#[derive(Clone, Debug)]
pub enum SqlChunk {
    /// Raw SQL text.
    Raw(String),
    /// A bound value, rendered as `$n`.
    Param(Param),
    /// A late-bound value, rendered as `$n` and resolved by name at execution.
    Placeholder(Placeholder),
    /// A column reference, optionally qualified by its table.
    Column(Column),
    /// An embedded sub-fragment.
    Sql(Sql),
}

/// A composable SQL fragment.
///
/// `Sql` keeps text, values and column references as separate chunks so a tree
/// of fragments can be inspected and rewritten before it is lowered to a
/// `$1, $2, ...` string by [`PgDialect`].
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Sql {
    chunks: Vec<SqlChunk>,
}

impl Sql {
    /// Create a fragment from raw SQL text.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let initial_sql = initial_sql.into();
        if initial_sql.is_empty() {
            return Self::empty();
        }
        Self {
            chunks: vec![SqlChunk::Raw(initial_sql)],
        }
    }

    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    /// A fragment holding a single column reference.
    pub fn column(column: &Column) -> Self {
        Self {
            chunks: vec![SqlChunk::Column(column.clone())],
        }
    }

    /// Join fragments, inserting `separator` between each pair.
    pub fn join(items: impl IntoIterator<Item = Sql>, separator: &str) -> Self {
        let mut out = Sql::empty();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.push_sql(item);
        }
        out
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.chunks.last_mut() {
            Some(SqlChunk::Raw(last)) => last.push_str(sql),
            _ => self.chunks.push(SqlChunk::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.push_param(Param::new(value))
    }

    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.chunks.push(SqlChunk::Param(param));
        self
    }

    /// Append a late-bound placeholder.
    pub fn push_placeholder(&mut self, placeholder: Placeholder) -> &mut Self {
        self.chunks.push(SqlChunk::Placeholder(placeholder));
        self
    }

    pub fn push_column(&mut self, column: &Column) -> &mut Self {
        self.chunks.push(SqlChunk::Column(column.clone()));
        self
    }

    /// Embed another fragment as a nested chunk, consuming it.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        if !other.is_empty() {
            self.chunks.push(SqlChunk::Sql(other));
        }
        self
    }

    /// Append a SQL identifier safely.
    ///
    /// Identifiers cannot be bound as parameters, so they are validated via
    /// [`crate::Ident`] and written as text.
    pub fn push_ident<I>(&mut self, ident: I) -> SqlResult<&mut Self>
    where
        I: IntoIdent,
    {
        let ident = ident.into_ident()?;
        Ok(self.push(&ident.to_sql()))
    }

    /// Bind a value and return `self` (consuming form of [`Sql::push_bind`]).
    pub fn bind<T>(mut self, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.push_bind(value);
        self
    }

    /// Append raw SQL and return `self` (consuming form of [`Sql::push`]).
    pub fn append(mut self, sql: &str) -> Self {
        self.push(sql);
        self
    }

    /// `<self> asc`
    pub fn asc(self) -> Self {
        self.append(" asc")
    }

    /// `<self> desc`
    pub fn desc(self) -> Self {
        self.append(" desc")
    }

    /// The top-level chunks, in order. Nested fragments appear as [`SqlChunk::Sql`].
    pub fn chunks(&self) -> &[SqlChunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// If this fragment is exactly one column reference, return it.
    pub fn as_column(&self) -> Option<&Column> {
        match self.chunks.as_slice() {
            [SqlChunk::Column(column)] => Some(column),
            [SqlChunk::Sql(inner)] => inner.as_column(),
            _ => None,
        }
    }

    /// Rebuild the fragment with every column reference passed through `f`,
    /// at any nesting depth. Everything else is copied unchanged.
    pub fn map_columns(&self, f: &impl Fn(&Column) -> Column) -> Sql {
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| match chunk {
                SqlChunk::Column(column) => SqlChunk::Column(f(column)),
                SqlChunk::Sql(inner) => SqlChunk::Sql(inner.map_columns(f)),
                other => other.clone(),
            })
            .collect();
        Sql { chunks }
    }

    /// Strip the table qualifier from every column reference.
    pub fn unqualified(&self) -> Sql {
        self.map_columns(&Column::unqualified)
    }

    /// Number of `$n` slots (bound values plus placeholders) in the whole tree.
    pub fn param_count(&self) -> usize {
        self.chunks
            .iter()
            .map(|chunk| match chunk {
                SqlChunk::Param(_) | SqlChunk::Placeholder(_) => 1,
                SqlChunk::Sql(inner) => inner.param_count(),
                SqlChunk::Raw(_) | SqlChunk::Column(_) => 0,
            })
            .sum()
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        PgDialect.sql_to_query(self).sql
    }
}

impl From<Column> for Sql {
    fn from(column: Column) -> Self {
        Sql {
            chunks: vec![SqlChunk::Column(column)],
        }
    }
}

impl From<&Column> for Sql {
    fn from(column: &Column) -> Self {
        Sql::column(column)
    }
}

/// `<expr> asc`
pub fn asc(expr: impl Into<Sql>) -> Sql {
    expr.into().asc()
}

/// `<expr> desc`
pub fn desc(expr: impl Into<Sql>) -> Sql {
    expr.into().desc()
}
