use super::node::SetOperation;
use super::operand::IntoOperand;
use super::{Combinable, SetOperator};
use crate::error::SqlResult;

/// Set operators as methods, available on every [`Combinable`] query.
///
/// ```ignore
/// use pgsetop::SetOperationExt;
///
/// let q = active_users.except_all(banned_users)?.limit(10);
/// ```
pub trait SetOperationExt: Combinable + Sized + 'static
where
    Self::Row: 'static,
{
    fn union<Q: IntoOperand<Self::Row>>(self, right: Q) -> SqlResult<SetOperation<Self::Row>> {
        SetOperation::new(SetOperator::UNION, self, right)
    }

    fn union_all<Q: IntoOperand<Self::Row>>(self, right: Q) -> SqlResult<SetOperation<Self::Row>> {
        SetOperation::new(SetOperator::UNION_ALL, self, right)
    }

    fn intersect<Q: IntoOperand<Self::Row>>(self, right: Q) -> SqlResult<SetOperation<Self::Row>> {
        SetOperation::new(SetOperator::INTERSECT, self, right)
    }

    fn intersect_all<Q: IntoOperand<Self::Row>>(
        self,
        right: Q,
    ) -> SqlResult<SetOperation<Self::Row>> {
        SetOperation::new(SetOperator::INTERSECT_ALL, self, right)
    }

    fn except<Q: IntoOperand<Self::Row>>(self, right: Q) -> SqlResult<SetOperation<Self::Row>> {
        SetOperation::new(SetOperator::EXCEPT, self, right)
    }

    fn except_all<Q: IntoOperand<Self::Row>>(self, right: Q) -> SqlResult<SetOperation<Self::Row>> {
        SetOperation::new(SetOperator::EXCEPT_ALL, self, right)
    }
}

impl<T> SetOperationExt for T
where
    T: Combinable + 'static,
    T::Row: 'static,
{
}
