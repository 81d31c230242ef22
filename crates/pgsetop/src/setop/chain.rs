use super::node::SetOperation;
use super::operand::{IntoOperand, Operand};
use super::{Combinable, SetOperator};
use crate::error::{SqlError, SqlResult};

/// Fold `[left, right, rest...]` into a left-deep tree of `operator` nodes:
/// `((left op right) op rest[0]) op rest[1] ...`.
///
/// A `None` entry in `rest` fails the whole chain with
/// [`SqlError::MissingOperand`] before anything is combined. Every step is
/// checked against the shape of `left`, which each node carries forward.
pub fn chain<L, Q, I>(
    operator: SetOperator,
    left: L,
    right: Q,
    rest: I,
) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
    I: IntoIterator<Item = Option<Operand<L::Row>>>,
{
    let rest = rest
        .into_iter()
        .enumerate()
        .map(|(i, operand)| {
            operand.ok_or(SqlError::MissingOperand {
                operator,
                position: i + 2,
            })
        })
        .collect::<SqlResult<Vec<_>>>()?;

    let mut node = SetOperation::new(operator, left, right)?;
    for operand in rest {
        node = SetOperation::new(operator, node, operand)?;
    }
    Ok(node)
}

/// `(left) union (right)`
pub fn union<L, Q>(left: L, right: Q) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
{
    SetOperation::new(SetOperator::UNION, left, right)
}

/// `(left) union all (right)`
pub fn union_all<L, Q>(left: L, right: Q) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
{
    SetOperation::new(SetOperator::UNION_ALL, left, right)
}

/// `(left) intersect (right)`
pub fn intersect<L, Q>(left: L, right: Q) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
{
    SetOperation::new(SetOperator::INTERSECT, left, right)
}

/// `(left) intersect all (right)`
pub fn intersect_all<L, Q>(left: L, right: Q) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
{
    SetOperation::new(SetOperator::INTERSECT_ALL, left, right)
}

/// `(left) except (right)`
pub fn except<L, Q>(left: L, right: Q) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
{
    SetOperation::new(SetOperator::EXCEPT, left, right)
}

/// `(left) except all (right)`
pub fn except_all<L, Q>(left: L, right: Q) -> SqlResult<SetOperation<L::Row>>
where
    L: Combinable + 'static,
    L::Row: 'static,
    Q: IntoOperand<L::Row>,
{
    SetOperation::new(SetOperator::EXCEPT_ALL, left, right)
}
