//! Table and column references.

use crate::error::{SqlError, SqlResult};
use crate::ident::{Ident, IdentPart, IntoIdent};
use crate::sql::{Placeholder, Sql};
use tokio_postgres::types::ToSql;

/// A table in a FROM or JOIN clause, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: Ident,
    alias: Option<Ident>,
}

impl Table {
    /// Create a table reference (`users`, `public.users`).
    pub fn new(name: impl IntoIdent) -> SqlResult<Self> {
        Ok(Self {
            name: name.into_ident()?,
            alias: None,
        })
    }

    /// Give the table an alias (`users u`). Columns created afterwards are
    /// qualified by the alias.
    pub fn alias(mut self, alias: &str) -> SqlResult<Self> {
        self.alias = Some(Ident::single(alias)?);
        Ok(self)
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    /// The name columns of this table are qualified with: the alias if
    /// present, otherwise the table name.
    pub fn reference(&self) -> &Ident {
        self.alias.as_ref().unwrap_or(&self.name)
    }

    /// A column of this table, qualified by [`Table::reference`].
    pub fn column(&self, name: &str) -> SqlResult<Column> {
        Ok(Column {
            table: Some(self.reference().clone()),
            name: Ident::single(name)?,
            nullable: false,
        })
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        self.name.write_sql(out);
        if let Some(alias) = &self.alias {
            out.push(' ');
            alias.write_sql(out);
        }
    }
}

/// A column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    table: Option<Ident>,
    name: Ident,
    nullable: bool,
}

impl Column {
    /// An unqualified column.
    pub fn new(name: &str) -> SqlResult<Self> {
        Ok(Self {
            table: None,
            name: Ident::single(name)?,
            nullable: false,
        })
    }

    /// An unqualified column named by an already validated segment.
    pub(crate) fn bare(name: IdentPart) -> Self {
        Self {
            table: None,
            name: Ident::from_parts(vec![name]),
            nullable: false,
        }
    }

    /// Parse `table.column` (or `schema.table.column`) into a qualified column.
    pub fn parse(qualified: &str) -> SqlResult<Self> {
        let mut parts = Ident::parse(qualified)?.into_parts();
        let name = parts
            .pop()
            .ok_or_else(|| SqlError::validation("Empty column reference"))?;
        let table = (!parts.is_empty()).then(|| Ident::from_parts(parts));
        Ok(Self {
            table,
            name: Ident::from_parts(vec![name]),
            nullable: false,
        })
    }

    /// Mark the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn table(&self) -> Option<&Ident> {
        self.table.as_ref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_qualified(&self) -> bool {
        self.table.is_some()
    }

    /// The same column without its table qualifier.
    pub fn unqualified(&self) -> Column {
        Column {
            table: None,
            name: self.name.clone(),
            nullable: self.nullable,
        }
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        if let Some(table) = &self.table {
            table.write_sql(out);
            out.push('.');
        }
        self.name.write_sql(out);
    }

    fn compare<T>(&self, op: &str, value: T) -> Sql
    where
        T: ToSql + Send + Sync + 'static,
    {
        let mut sql = Sql::column(self);
        sql.push(op).push_bind(value);
        sql
    }

    /// `column = $n`
    pub fn eq<T: ToSql + Send + Sync + 'static>(&self, value: T) -> Sql {
        self.compare(" = ", value)
    }

    /// `column <> $n`
    pub fn ne<T: ToSql + Send + Sync + 'static>(&self, value: T) -> Sql {
        self.compare(" <> ", value)
    }

    /// `column > $n`
    pub fn gt<T: ToSql + Send + Sync + 'static>(&self, value: T) -> Sql {
        self.compare(" > ", value)
    }

    /// `column >= $n`
    pub fn gte<T: ToSql + Send + Sync + 'static>(&self, value: T) -> Sql {
        self.compare(" >= ", value)
    }

    /// `column < $n`
    pub fn lt<T: ToSql + Send + Sync + 'static>(&self, value: T) -> Sql {
        self.compare(" < ", value)
    }

    /// `column <= $n`
    pub fn lte<T: ToSql + Send + Sync + 'static>(&self, value: T) -> Sql {
        self.compare(" <= ", value)
    }

    /// `column = $n` where `$n` is bound at execution time.
    pub fn eq_placeholder(&self, placeholder: Placeholder) -> Sql {
        let mut sql = Sql::column(self);
        sql.push(" = ").push_placeholder(placeholder);
        sql
    }

    /// `column is null`
    pub fn is_null(&self) -> Sql {
        Sql::column(self).append(" is null")
    }

    /// `column is not null`
    pub fn is_not_null(&self) -> Sql {
        Sql::column(self).append(" is not null")
    }

    /// `column = other`
    pub fn eq_column(&self, other: &Column) -> Sql {
        let mut sql = Sql::column(self);
        sql.push(" = ").push_column(other);
        sql
    }

    /// `column asc`
    pub fn asc(&self) -> Sql {
        Sql::column(self).asc()
    }

    /// `column desc`
    pub fn desc(&self) -> Sql {
        Sql::column(self).desc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_use_alias_when_present() {
        let users = Table::new("users").unwrap();
        assert_eq!(Sql::from(users.column("id").unwrap()).to_sql(), "users.id");

        let u = Table::new("public.users").unwrap().alias("u").unwrap();
        assert_eq!(Sql::from(u.column("id").unwrap()).to_sql(), "u.id");

        let mut out = String::new();
        u.write_sql(&mut out);
        assert_eq!(out, "public.users u");
    }

    #[test]
    fn rejects_dotted_column_and_alias_names() {
        let users = Table::new("users").unwrap();
        assert!(users.column("users.id").is_err());
        assert!(users.clone().alias("a.b").is_err());
        assert!(Column::new("x y").is_err());
    }

    #[test]
    fn parse_splits_qualifier() {
        let c = Column::parse("public.users.id").unwrap();
        assert_eq!(c.table().map(Ident::to_sql).as_deref(), Some("public.users"));
        assert_eq!(c.name().to_sql(), "id");

        let c = Column::parse(r#"u."Name""#).unwrap();
        assert_eq!(Sql::from(&c).to_sql(), r#"u."Name""#);
        assert_eq!(Sql::from(c.unqualified()).to_sql(), r#""Name""#);

        assert!(!Column::parse("id").unwrap().is_qualified());
    }

    #[test]
    fn comparison_helpers_bind_values() {
        let id = Table::new("users").unwrap().column("id").unwrap();
        assert_eq!(id.eq(1_i64).to_sql(), "users.id = $1");
        assert_eq!(id.gte(1_i64).to_sql(), "users.id >= $1");
        assert_eq!(id.is_null().to_sql(), "users.id is null");
        assert_eq!(
            id.eq_placeholder(Placeholder::new("id")).to_sql(),
            "users.id = $1"
        );
    }
}
