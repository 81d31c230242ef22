use super::node::SetOperation;
use super::{Combinable, SetOperator};
use crate::error::SqlResult;
use std::fmt;
use std::marker::PhantomData;

/// A type-erased query producing rows of type `R`.
pub type BoxedQuery<R> = Box<dyn Combinable<Row = R>>;

type DeferredFn<R> = Box<dyn FnOnce(&SetOperators<R>) -> SqlResult<BoxedQuery<R>> + Send>;

/// The right-hand side of a set operator: a query, or a callback that builds
/// one from the operator constructors (for inline nested combinations).
pub enum Operand<R> {
    Literal(BoxedQuery<R>),
    Deferred(DeferredFn<R>),
}

impl<R: 'static> Operand<R> {
    pub fn literal<Q>(query: Q) -> Self
    where
        Q: Combinable<Row = R> + 'static,
    {
        Operand::Literal(Box::new(query))
    }

    /// An operand built by `f` when the combination is constructed.
    ///
    /// # Example
    /// ```ignore
    /// // a union (b except c)
    /// let q = a.union(Operand::deferred(|ops| ops.except(b, c)))?;
    /// ```
    pub fn deferred<F, Q>(f: F) -> Self
    where
        F: FnOnce(&SetOperators<R>) -> SqlResult<Q> + Send + 'static,
        Q: Combinable<Row = R> + 'static,
    {
        Operand::Deferred(Box::new(move |ops| {
            f(ops).map(|q| Box::new(q) as BoxedQuery<R>)
        }))
    }

    pub(crate) fn resolve(self) -> SqlResult<BoxedQuery<R>> {
        match self {
            Operand::Literal(query) => Ok(query),
            Operand::Deferred(f) => f(&SetOperators::new()),
        }
    }
}

impl<R> fmt::Debug for Operand<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(query) => f.debug_tuple("Literal").field(query.fields()).finish(),
            Operand::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Convert a value into an [`Operand`].
pub trait IntoOperand<R> {
    fn into_operand(self) -> Operand<R>;
}

impl<R: 'static, Q> IntoOperand<R> for Q
where
    Q: Combinable<Row = R> + 'static,
{
    fn into_operand(self) -> Operand<R> {
        Operand::literal(self)
    }
}

impl<R> IntoOperand<R> for Operand<R> {
    fn into_operand(self) -> Operand<R> {
        self
    }
}

/// The six operator constructors, handed to deferred operands.
pub struct SetOperators<R> {
    _row: PhantomData<fn() -> R>,
}

impl<R: 'static> SetOperators<R> {
    pub(crate) fn new() -> Self {
        Self { _row: PhantomData }
    }

    fn combine<L, Q>(&self, operator: SetOperator, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        SetOperation::new(operator, left, right)
    }

    pub fn union<L, Q>(&self, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        self.combine(SetOperator::UNION, left, right)
    }

    pub fn union_all<L, Q>(&self, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        self.combine(SetOperator::UNION_ALL, left, right)
    }

    pub fn intersect<L, Q>(&self, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        self.combine(SetOperator::INTERSECT, left, right)
    }

    pub fn intersect_all<L, Q>(&self, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        self.combine(SetOperator::INTERSECT_ALL, left, right)
    }

    pub fn except<L, Q>(&self, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        self.combine(SetOperator::EXCEPT, left, right)
    }

    pub fn except_all<L, Q>(&self, left: L, right: Q) -> SqlResult<SetOperation<R>>
    where
        L: Combinable<Row = R> + 'static,
        Q: IntoOperand<R>,
    {
        self.combine(SetOperator::EXCEPT_ALL, left, right)
    }
}
