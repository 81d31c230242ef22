use super::operand::{BoxedQuery, IntoOperand};
use super::{Combinable, SetOperator, SetOperatorConfig};
use crate::column::Column;
use crate::dialect::{PgDialect, SqlQuery};
use crate::error::{SqlError, SqlResult};
use crate::session::Session;
use crate::shape::{JoinNullability, RowShape};
use crate::sql::{Placeholder, Sql};
use std::fmt;
use std::sync::Arc;
use tokio_postgres::Row;

/// A LIMIT or OFFSET value: a literal count, or a placeholder bound at execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowCount {
    Value(u64),
    Deferred(Placeholder),
}

impl RowCount {
    pub(crate) fn push_to(&self, sql: &mut Sql) {
        match self {
            RowCount::Value(n) => {
                sql.push(&n.to_string());
            }
            RowCount::Deferred(placeholder) => {
                sql.push_placeholder(placeholder.clone());
            }
        }
    }
}

/// A value `limit` and `offset` accept: an integer count or a [`Placeholder`].
///
/// Signed integers are accepted so plain literals work; a negative count is
/// a validation error.
pub trait IntoRowCount {
    fn into_row_count(self) -> SqlResult<RowCount>;
}

impl IntoRowCount for RowCount {
    fn into_row_count(self) -> SqlResult<RowCount> {
        Ok(self)
    }
}

impl IntoRowCount for Placeholder {
    fn into_row_count(self) -> SqlResult<RowCount> {
        Ok(RowCount::Deferred(self))
    }
}

impl IntoRowCount for u64 {
    fn into_row_count(self) -> SqlResult<RowCount> {
        Ok(RowCount::Value(self))
    }
}

impl IntoRowCount for u32 {
    fn into_row_count(self) -> SqlResult<RowCount> {
        Ok(RowCount::Value(u64::from(self)))
    }
}

impl IntoRowCount for usize {
    fn into_row_count(self) -> SqlResult<RowCount> {
        Ok(RowCount::Value(self as u64))
    }
}

impl IntoRowCount for i64 {
    fn into_row_count(self) -> SqlResult<RowCount> {
        u64::try_from(self)
            .map(RowCount::Value)
            .map_err(|_| SqlError::validation(format!("Row count must not be negative, got {self}")))
    }
}

impl IntoRowCount for i32 {
    fn into_row_count(self) -> SqlResult<RowCount> {
        i64::from(self).into_row_count()
    }
}

/// Store a LIMIT/OFFSET value, or remember the first invalid one.
pub(crate) fn set_row_count(
    slot: &mut Option<RowCount>,
    build_error: &mut Option<String>,
    clause: &str,
    n: impl IntoRowCount,
) {
    match n.into_row_count() {
        Ok(count) => *slot = Some(count),
        Err(e) => {
            if build_error.is_none() {
                let reason = match e {
                    SqlError::Validation(msg) => msg,
                    other => other.to_string(),
                };
                *build_error = Some(format!("Invalid {clause}: {reason}"));
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Modifiers {
    order_by: Vec<Sql>,
    limit: Option<RowCount>,
    offset: Option<RowCount>,
}

/// One application of a set operator to two queries, plus the ORDER BY,
/// LIMIT and OFFSET of the combined result.
///
/// The left operand is canonical: the result fields, the join-nullability map
/// and the session are all taken from it. The right operand only has to agree
/// on the field names and their order.
#[must_use]
pub struct SetOperation<R = Row> {
    operator: SetOperator,
    left: BoxedQuery<R>,
    right: BoxedQuery<R>,
    fields: RowShape,
    join_nullability: JoinNullability,
    session: Option<Arc<dyn Session>>,
    dialect: PgDialect,
    modifiers: Modifiers,
    build_error: Option<String>,
}

impl<R: 'static> SetOperation<R> {
    /// Combine `left` and `right` with `operator`.
    ///
    /// A deferred `right` operand is built first; then both sides are validated
    /// and their shapes compared. Fails with [`SqlError::ShapeMismatch`] if the
    /// field names differ in content or order.
    pub fn new<L, Q>(operator: SetOperator, left: L, right: Q) -> SqlResult<Self>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        let right = right.into_operand().resolve()?;
        left.validate()?;
        right.validate()?;

        if !left.fields().is_compatible(right.fields()) {
            return Err(SqlError::ShapeMismatch {
                operator,
                left: left.fields().name_list(),
                right: right.fields().name_list(),
            });
        }

        let config = left.set_operator_config();
        Ok(Self {
            operator,
            left: Box::new(left),
            right,
            fields: config.fields,
            join_nullability: config.join_nullability,
            session: config.session,
            dialect: config.dialect,
            modifiers: Modifiers::default(),
            build_error: None,
        })
    }
}

impl<R> SetOperation<R> {
    pub fn operator(&self) -> SetOperator {
        self.operator
    }

    pub fn join_nullability(&self) -> &JoinNullability {
        &self.join_nullability
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Replace the ORDER BY list.
    ///
    /// Column references in the expressions are rendered unqualified, since the
    /// combined result has no table scope to qualify them with.
    pub fn order_by<I>(mut self, exprs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Sql>,
    {
        self.modifiers.order_by = exprs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the ORDER BY list with expressions built from the result fields.
    ///
    /// # Example
    /// ```ignore
    /// let q = union(a, b)?.order_by_with(|f| Ok([f.field("name")?.desc(), f.field("id")?]))?;
    /// ```
    pub fn order_by_with<F, I>(self, f: F) -> SqlResult<Self>
    where
        F: FnOnce(&ResultFields<'_>) -> SqlResult<I>,
        I: IntoIterator,
        I::Item: Into<Sql>,
    {
        let exprs = f(&ResultFields {
            fields: &self.fields,
        })?;
        Ok(self.order_by(exprs))
    }

    /// Set LIMIT (last call wins).
    ///
    /// A negative count is reported when the node is combined or executed.
    pub fn limit(mut self, n: impl IntoRowCount) -> Self {
        set_row_count(&mut self.modifiers.limit, &mut self.build_error, "LIMIT", n);
        self
    }

    /// Set OFFSET (last call wins).
    ///
    /// A negative count is reported when the node is combined or executed.
    pub fn offset(mut self, n: impl IntoRowCount) -> Self {
        set_row_count(&mut self.modifiers.offset, &mut self.build_error, "OFFSET", n);
        self
    }

    /// Render `(<left>) <op>[ all] (<right>)[ order by ..][ limit ..][ offset ..]`.
    pub fn render(&self) -> Sql {
        let mut sql = Sql::new("(");
        sql.push_sql(self.left.render())
            .push(") ")
            .push(self.operator.keyword())
            .push(" ");
        if self.operator.is_all() {
            sql.push("all ");
        }
        sql.push("(").push_sql(self.right.render()).push(")");

        let Modifiers {
            order_by,
            limit,
            offset,
        } = &self.modifiers;
        if !order_by.is_empty() {
            sql.push(" order by ")
                .push_sql(Sql::join(order_by.iter().map(Sql::unqualified), ", "));
        }
        if let Some(limit) = limit {
            sql.push(" limit ");
            limit.push_to(&mut sql);
        }
        if let Some(offset) = offset {
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

impl<R> Combinable for SetOperation<R> {
    type Row = R;

    fn fields(&self) -> &RowShape {
        &self.fields
    }

    fn render(&self) -> Sql {
        SetOperation::render(self)
    }

    fn set_operator_config(&self) -> SetOperatorConfig {
        SetOperatorConfig {
            session: self.session.clone(),
            dialect: self.dialect,
            join_nullability: self.join_nullability.clone(),
            fields: self.fields.clone(),
        }
    }

    fn validate(&self) -> SqlResult<()> {
        match &self.build_error {
            Some(err) => Err(SqlError::validation(err.clone())),
            None => Ok(()),
        }
    }
}

impl<R> fmt::Debug for SetOperation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetOperation")
            .field("operator", &self.operator)
            .field("fields", &self.fields)
            .field("order_by", &self.modifiers.order_by.len())
            .field("limit", &self.modifiers.limit)
            .field("offset", &self.modifiers.offset)
            .field("session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

/// Read-only view of a combination's result fields, for
/// [`SetOperation::order_by_with`].
pub struct ResultFields<'a> {
    fields: &'a RowShape,
}

impl ResultFields<'_> {
    /// A bare reference to the result field `name`, quoted the way the field
    /// was selected. `name` is given without quotes.
    pub fn field(&self, name: &str) -> SqlResult<Sql> {
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| SqlError::validation(format!("Unknown result field '{name}'")))?;
        Ok(Sql::from(Column::bare(field.ident().clone())))
    }

    pub fn shape(&self) -> &RowShape {
        self.fields
    }
}
