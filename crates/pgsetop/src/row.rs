//! Row mapping traits

use crate::error::{SqlError, SqlResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Decode a result row into a Rust value.
///
/// Implemented for tuples of [`FromSql`] types, which decode by position.
/// Implement it by hand for structs:
///
/// ```ignore
/// struct Person { id: i64, name: String }
///
/// impl FromRow for Person {
///     fn from_row(row: &Row) -> SqlResult<Self> {
///         Ok(Self { id: row.try_get_column("id")?, name: row.try_get_column("name")? })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> SqlResult<Self>;
}

/// Typed column access with [`SqlError::Decode`] errors.
pub trait RowExt {
    /// Try to get a column value by name
    fn try_get_column<T>(&self, column: &str) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Try to get a column value by position
    fn try_get_index<T>(&self, index: usize) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| SqlError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, index: usize) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(index).map_err(|e| {
            let column = self
                .columns()
                .get(index)
                .map_or_else(|| format!("#{index}"), |c| c.name().to_string());
            SqlError::decode(column, e.to_string())
        })
    }
}

macro_rules! impl_from_row_for_tuple {
    ($($idx:tt => $ty:ident),+) => {
        impl<$($ty),+> FromRow for ($($ty,)+)
        where
            $($ty: for<'a> FromSql<'a>),+
        {
            fn from_row(row: &Row) -> SqlResult<Self> {
                Ok(($(row.try_get_index::<$ty>($idx)?,)+))
            }
        }
    };
}

impl_from_row_for_tuple!(0 => A);
impl_from_row_for_tuple!(0 => A, 1 => B);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C, 3 => D);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);
