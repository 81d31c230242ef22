//! Set operators: UNION, INTERSECT and EXCEPT, with and without ALL.
//!
//! Any [`Combinable`] query can be combined with another query of the same
//! row type. Combinations are left-deep trees of [`SetOperation`] nodes; the
//! result can be ordered, limited and offset as a whole, rendered with
//! [`SetOperation::to_sql`], or prepared and executed through
//! [`Executable`](crate::Executable).
//!
//! # Example
//!
//! ```ignore
//! use pgsetop::{SetOperationExt, Executable, ParamValues};
//!
//! let users = Table::new("users")?;
//! let admins = Table::new("admins")?;
//!
//! let people = db
//!     .select(&users)
//!     .column(&users.column("id")?)
//!     .column(&users.column("name")?)
//!     .as_row::<(i64, String)>()
//!     .union(
//!         db.select(&admins)
//!             .column(&admins.column("id")?)
//!             .column(&admins.column("name")?)
//!             .as_row::<(i64, String)>(),
//!     )?
//!     .order_by([users.column("name")?.asc()])
//!     .limit(20)
//!     .execute(&ParamValues::new())
//!     .await?;
//! ```

mod chain;
mod ext;
mod node;
mod operand;

#[cfg(test)]
mod tests;

pub use chain::{chain, except, except_all, intersect, intersect_all, union, union_all};
pub use ext::SetOperationExt;
pub use node::{IntoRowCount, ResultFields, RowCount, SetOperation};
pub(crate) use node::set_row_count;
pub use operand::{BoxedQuery, IntoOperand, Operand, SetOperators};

use crate::dialect::PgDialect;
use crate::error::SqlResult;
use crate::session::Session;
use crate::shape::{JoinNullability, RowShape};
use crate::sql::Sql;
use std::fmt;
use std::sync::Arc;

/// The kind of a set operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperatorKind {
    Union,
    Intersect,
    Except,
}

/// A set operator together with its duplicate handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetOperator {
    kind: SetOperatorKind,
    all: bool,
}

impl SetOperator {
    pub const UNION: Self = Self::new(SetOperatorKind::Union, false);
    pub const UNION_ALL: Self = Self::new(SetOperatorKind::Union, true);
    pub const INTERSECT: Self = Self::new(SetOperatorKind::Intersect, false);
    pub const INTERSECT_ALL: Self = Self::new(SetOperatorKind::Intersect, true);
    pub const EXCEPT: Self = Self::new(SetOperatorKind::Except, false);
    pub const EXCEPT_ALL: Self = Self::new(SetOperatorKind::Except, true);

    pub const fn new(kind: SetOperatorKind, all: bool) -> Self {
        Self { kind, all }
    }

    pub fn kind(&self) -> SetOperatorKind {
        self.kind
    }

    /// Whether duplicate rows are kept (`ALL`).
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// The lowercase SQL keyword, without `all`.
    pub fn keyword(&self) -> &'static str {
        match self.kind {
            SetOperatorKind::Union => "union",
            SetOperatorKind::Intersect => "intersect",
            SetOperatorKind::Except => "except",
        }
    }
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        if self.all {
            f.write_str(" all")?;
        }
        Ok(())
    }
}

/// What the left-most query of a combination hands to the combined node.
#[derive(Clone, Default)]
pub struct SetOperatorConfig {
    pub session: Option<Arc<dyn Session>>,
    pub dialect: PgDialect,
    pub join_nullability: JoinNullability,
    pub fields: RowShape,
}

impl fmt::Debug for SetOperatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetOperatorConfig")
            .field("session", &self.session.is_some())
            .field("dialect", &self.dialect)
            .field("join_nullability", &self.join_nullability)
            .field("fields", &self.fields)
            .finish()
    }
}

/// A SELECT-shaped query that can be an operand of a set operator.
///
/// `Row` is the Rust type a result row decodes into. Both operands of a set
/// operator must share it, which is the compile-time half of the row-shape
/// check; [`RowShape::is_compatible`] is the run-time half.
pub trait Combinable: Send + Sync {
    type Row;

    /// The fields the query returns, in order.
    fn fields(&self) -> &RowShape;

    /// Render the query as a fragment.
    fn render(&self) -> Sql;

    /// Session, dialect and nullability metadata carried into a combination.
    fn set_operator_config(&self) -> SetOperatorConfig;

    /// Validate builder state before it is combined or executed.
    fn validate(&self) -> SqlResult<()> {
        Ok(())
    }
}

/// Build a combination of `left` with any number of further operands.
///
/// Expands to [`union`](crate::setop::union) for two operands and to
/// [`chain`](crate::setop::chain) for more.
///
/// ```ignore
/// let all = pgsetop::union!(q0, q1, q2)?;
/// ```
#[macro_export]
macro_rules! union {
    ($left:expr, $right:expr $(,)?) => {
        $crate::setop::union($left, $right)
    };
    ($left:expr, $right:expr, $($rest:expr),+ $(,)?) => {
        $crate::__set_operation_chain!($crate::SetOperator::UNION, $left, $right, $($rest),+)
    };
}

/// `union all` over two or more operands. See [`union!`](crate::union).
#[macro_export]
macro_rules! union_all {
    ($left:expr, $right:expr $(,)?) => {
        $crate::setop::union_all($left, $right)
    };
    ($left:expr, $right:expr, $($rest:expr),+ $(,)?) => {
        $crate::__set_operation_chain!($crate::SetOperator::UNION_ALL, $left, $right, $($rest),+)
    };
}

/// `intersect` over two or more operands. See [`union!`](crate::union).
#[macro_export]
macro_rules! intersect {
    ($left:expr, $right:expr $(,)?) => {
        $crate::setop::intersect($left, $right)
    };
    ($left:expr, $right:expr, $($rest:expr),+ $(,)?) => {
        $crate::__set_operation_chain!($crate::SetOperator::INTERSECT, $left, $right, $($rest),+)
    };
}

/// `intersect all` over two or more operands. See [`union!`](crate::union).
#[macro_export]
macro_rules! intersect_all {
    ($left:expr, $right:expr $(,)?) => {
        $crate::setop::intersect_all($left, $right)
    };
    ($left:expr, $right:expr, $($rest:expr),+ $(,)?) => {
        $crate::__set_operation_chain!($crate::SetOperator::INTERSECT_ALL, $left, $right, $($rest),+)
    };
}

/// `except` over two or more operands. See [`union!`](crate::union).
#[macro_export]
macro_rules! except {
    ($left:expr, $right:expr $(,)?) => {
        $crate::setop::except($left, $right)
    };
    ($left:expr, $right:expr, $($rest:expr),+ $(,)?) => {
        $crate::__set_operation_chain!($crate::SetOperator::EXCEPT, $left, $right, $($rest),+)
    };
}

/// `except all` over two or more operands. See [`union!`](crate::union).
#[macro_export]
macro_rules! except_all {
    ($left:expr, $right:expr $(,)?) => {
        $crate::setop::except_all($left, $right)
    };
    ($left:expr, $right:expr, $($rest:expr),+ $(,)?) => {
        $crate::__set_operation_chain!($crate::SetOperator::EXCEPT_ALL, $left, $right, $($rest),+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __set_operation_chain {
    ($op:expr, $left:expr, $right:expr, $($rest:expr),+) => {
        $crate::setop::chain(
            $op,
            $left,
            $right,
            [$(::core::option::Option::Some($crate::IntoOperand::into_operand($rest))),+],
        )
    };
}
