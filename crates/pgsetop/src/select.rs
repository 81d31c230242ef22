//! SELECT builder: the leaf queries that set operators combine.

use crate::column::{Column, Table};
use crate::dialect::{PgDialect, SqlQuery};
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::session::Session;
use crate::setop::{Combinable, IntoRowCount, RowCount, SetOperatorConfig, set_row_count};
use crate::shape::{FieldMeta, JoinNullability, RowShape};
use crate::sql::Sql;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_postgres::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Full => "full join",
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    table: Table,
    on: Sql,
}

#[derive(Debug, Clone)]
struct SelectField {
    expr: Sql,
    alias: Option<Ident>,
}

/// A single-table SELECT with optional joins, filters, ordering and limits.
///
/// `R` is the row type results decode into; set it with
/// [`as_row`](SelectQuery::as_row). Only queries with the same `R` can be
/// combined.
///
/// ```ignore
/// let users = Table::new("users")?;
/// let q = db
///     .select(&users)
///     .column(&users.column("id")?)
///     .field("label", sql("upper(name)"))
///     .filter(users.column("active")?.eq(true))
///     .as_row::<(i64, String)>();
/// ```
#[must_use]
pub struct SelectQuery<R = Row> {
    table: Table,
    fields: Vec<SelectField>,
    joins: Vec<Join>,
    filters: Vec<Sql>,
    order_by: Vec<Sql>,
    limit: Option<RowCount>,
    offset: Option<RowCount>,
    shape: RowShape,
    join_nullability: JoinNullability,
    session: Option<Arc<dyn Session>>,
    dialect: PgDialect,
    build_error: Option<String>,
    _row: PhantomData<fn() -> R>,
}

/// Start a SELECT on `table` that is not bound to any session.
///
/// It can be rendered and combined, but preparing it (or any combination
/// whose left-most operand it is) fails with [`SqlError::SessionMissing`].
pub fn select_from(table: &Table) -> SelectQuery {
    SelectQuery::new(table)
}

impl SelectQuery<Row> {
    pub fn new(table: &Table) -> Self {
        let mut join_nullability = JoinNullability::new();
        join_nullability.set(table.reference().to_sql(), false);
        Self {
            table: table.clone(),
            fields: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            shape: RowShape::new(),
            join_nullability,
            session: None,
            dialect: PgDialect,
            build_error: None,
            _row: PhantomData,
        }
    }
}

impl<R> SelectQuery<R> {
    /// Bind the query to a session.
    pub fn session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Decode rows into `T` instead.
    pub fn as_row<T>(self) -> SelectQuery<T> {
        SelectQuery {
            table: self.table,
            fields: self.fields,
            joins: self.joins,
            filters: self.filters,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            shape: self.shape,
            join_nullability: self.join_nullability,
            session: self.session,
            dialect: self.dialect,
            build_error: self.build_error,
            _row: PhantomData,
        }
    }

    // ==================== Fields ====================

    /// Select a column. The result field takes the column's name.
    pub fn column(mut self, column: &Column) -> Self {
        let mut meta = FieldMeta::from_ident(column.name()).nullable(column.is_nullable());
        if let Some(table) = column.table() {
            meta = meta.table(table.to_sql());
        }
        self.shape.push(meta);
        self.fields.push(SelectField {
            expr: Sql::column(column),
            alias: None,
        });
        self
    }

    /// Select several columns, in order.
    pub fn columns<'a>(self, columns: impl IntoIterator<Item = &'a Column>) -> Self {
        columns.into_iter().fold(self, Self::column)
    }

    /// Select an expression as `name`.
    ///
    /// Expressions other than a bare column are assumed nullable. An invalid
    /// `name` is reported when the query is combined or executed.
    pub fn field(mut self, name: &str, expr: impl Into<Sql>) -> Self {
        let alias = match Ident::single(name) {
            Ok(alias) => alias,
            Err(e) => {
                if self.build_error.is_none() {
                    let reason = match e {
                        SqlError::Validation(msg) => msg,
                        other => other.to_string(),
                    };
                    self.build_error = Some(format!("Invalid field name '{name}': {reason}"));
                }
                return self;
            }
        };
        let expr = expr.into();

        let mut meta = FieldMeta::from_ident(&alias);
        match expr.as_column() {
            Some(column) => {
                meta = meta.nullable(column.is_nullable());
                if let Some(table) = column.table() {
                    meta = meta.table(table.to_sql());
                }
            }
            None => meta = meta.nullable(true),
        }
        self.shape.push(meta);
        self.fields.push(SelectField {
            expr,
            alias: Some(alias),
        });
        self
    }

    // ==================== JOIN ====================

    /// Add INNER JOIN.
    pub fn inner_join(self, table: &Table, on: Sql) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    /// Add LEFT JOIN. Columns of `table` become nullable.
    pub fn left_join(self, table: &Table, on: Sql) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    /// Add RIGHT JOIN. Columns of every table joined so far become nullable.
    pub fn right_join(self, table: &Table, on: Sql) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// Add FULL JOIN. Columns of every table, `table` included, become nullable.
    pub fn full_join(self, table: &Table, on: Sql) -> Self {
        self.join(JoinKind::Full, table, on)
    }

    fn join(mut self, kind: JoinKind, table: &Table, on: Sql) -> Self {
        let reference = table.reference().to_sql();
        match kind {
            JoinKind::Inner => self.join_nullability.set(reference, false),
            JoinKind::Left => self.join_nullability.set(reference, true),
            JoinKind::Right => {
                self.join_nullability.set_all_nullable();
                self.join_nullability.set(reference, false);
            }
            JoinKind::Full => {
                self.join_nullability.set_all_nullable();
                self.join_nullability.set(reference, true);
            }
        }
        self.joins.push(Join {
            kind,
            table: table.clone(),
            on,
        });
        self
    }

    // ==================== WHERE / ORDER BY / LIMIT ====================

    /// Add a WHERE condition, ANDed with any previous ones.
    pub fn filter(mut self, condition: Sql) -> Self {
        if !condition.is_empty() {
            self.filters.push(condition);
        }
        self
    }

    /// Append an ORDER BY expression.
    pub fn order_by(mut self, expr: impl Into<Sql>) -> Self {
        self.order_by.push(expr.into());
        self
    }

    /// Set LIMIT (last call wins). A negative count fails validation.
    pub fn limit(mut self, n: impl IntoRowCount) -> Self {
        set_row_count(&mut self.limit, &mut self.build_error, "LIMIT", n);
        self
    }

    /// Set OFFSET (last call wins). A negative count fails validation.
    pub fn offset(mut self, n: impl IntoRowCount) -> Self {
        set_row_count(&mut self.offset, &mut self.build_error, "OFFSET", n);
        self
    }

    // ==================== Accessors ====================

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn join_nullability(&self) -> &JoinNullability {
        &self.join_nullability
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    // ==================== Build ====================

    pub fn render(&self) -> Sql {
        let mut sql = Sql::new("select ");
        let fields = self.fields.iter().map(|field| {
            let mut out = Sql::empty();
            out.push_sql(field.expr.clone());
            if let Some(alias) = &field.alias {
                out.push(" as ").push(&alias.to_sql());
            }
            out
        });
        sql.push_sql(Sql::join(fields, ", "));

        let mut from = String::new();
        self.table.write_sql(&mut from);
        sql.push(" from ").push(&from);

        for join in &self.joins {
            let mut table = String::new();
            join.table.write_sql(&mut table);
            sql.push(" ")
                .push(join.kind.keyword())
                .push(" ")
                .push(&table)
                .push(" on ")
                .push_sql(join.on.clone());
        }

        match self.filters.as_slice() {
            [] => {}
            [only] => {
                sql.push(" where ").push_sql(only.clone());
            }
            many => {
                let parts = many.iter().map(|cond| {
                    let mut part = Sql::new("(");
                    part.push_sql(cond.clone()).push(")");
                    part
                });
                sql.push(" where ").push_sql(Sql::join(parts, " and "));
            }
        }

        if !self.order_by.is_empty() {
            sql.push(" order by ")
                .push_sql(Sql::join(self.order_by.iter().cloned(), ", "));
        }
        if let Some(limit) = &self.limit {
            sql.push(" limit ");
            limit.push_to(&mut sql);
        }
        if let Some(offset) = &self.offset {
            sql.push(" offset ");
            offset.push_to(&mut sql);
        }
        sql
    }

    /// Render and lower to `{ sql, params }`.
    pub fn to_sql(&self) -> SqlQuery {
        self.dialect.sql_to_query(&self.render()).into_sql_query()
    }
}

impl<R> Combinable for SelectQuery<R> {
    type Row = R;

    fn fields(&self) -> &RowShape {
        &self.shape
    }

    fn render(&self) -> Sql {
        SelectQuery::render(self)
    }

    fn set_operator_config(&self) -> SetOperatorConfig {
        SetOperatorConfig {
            session: self.session.clone(),
            dialect: self.dialect,
            join_nullability: self.join_nullability.clone(),
            fields: self.shape.clone(),
        }
    }

    fn validate(&self) -> SqlResult<()> {
        if let Some(err) = &self.build_error {
            return Err(SqlError::validation(err.clone()));
        }
        if self.fields.is_empty() {
            return Err(SqlError::validation(format!(
                "SELECT from {} has no fields",
                self.table.name()
            )));
        }
        Ok(())
    }
}

impl<R> fmt::Debug for SelectQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("table", &self.table)
            .field("fields", &self.shape)
            .field("joins", &self.joins.len())
            .field("filters", &self.filters.len())
            .field("session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}
