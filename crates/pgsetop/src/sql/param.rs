//! Bound values, late-bound placeholders and the values that fill them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_postgres::types::{ToSql, Type};

/// A clone-friendly bound parameter.
///
/// Fragments are cloned when they are embedded into larger trees, so values are
/// shared behind an `Arc` instead of being copied.
#[derive(Clone)]
pub struct Param {
    value: Arc<dyn ToSql + Send + Sync>,
    ty: Option<Type>,
}

impl Param {
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            ty: None,
        }
    }

    /// A parameter with an explicit Postgres type, used when preparing the statement.
    pub fn typed<T: ToSql + Send + Sync + 'static>(value: T, ty: Type) -> Self {
        Self {
            value: Arc::new(value),
            ty: Some(ty),
        }
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    /// The inner value as a `tokio-postgres` parameter reference.
    pub fn as_to_sql(&self) -> &(dyn ToSql + Sync) {
        &*self.value as &(dyn ToSql + Sync)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("value", &self.value)
            .field("ty", &self.ty)
            .finish()
    }
}

/// A named parameter whose value is supplied at execution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    name: String,
    ty: Option<Type>,
}

impl Placeholder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }
}

/// Create an untyped [`Placeholder`].
pub fn placeholder(name: impl Into<String>) -> Placeholder {
    Placeholder::new(name)
}

/// Values for named placeholders, supplied when a prepared query runs.
///
/// # Example
/// ```ignore
/// let values = ParamValues::new().set("status", "active").set("page_size", 20_i64);
/// let rows = prepared.execute(&values).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ParamValues {
    values: HashMap<String, Param>,
}

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value (consuming builder form).
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a value in place. A later value for the same name wins.
    pub fn insert<T: ToSql + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.values.insert(name.into(), Param::new(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
