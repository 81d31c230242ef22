//! Result row shapes and join nullability.

use crate::ident::{Ident, IdentPart};
use std::collections::BTreeMap;

/// One output column of a query.
///
/// The name keeps the quoting it was selected with, so a field selected as
/// `"Name"` is referred to as `"Name"` again in an outer ORDER BY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    ident: IdentPart,
    table: Option<String>,
    nullable: bool,
}

impl FieldMeta {
    /// A field called `name`, quoted when it is not a plain lowercase identifier.
    pub fn new(name: &str) -> Self {
        Self::from_part(IdentPart::for_name(name))
    }

    /// A field named after the last segment of `ident`.
    pub fn from_ident(ident: &Ident) -> Self {
        match ident.last_part() {
            Some(part) => Self::from_part(part.clone()),
            None => Self::new(ident.last()),
        }
    }

    fn from_part(ident: IdentPart) -> Self {
        Self {
            ident,
            table: None,
            nullable: false,
        }
    }

    /// Record the table reference (alias or name) the field is read from.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// The field name without quotes.
    pub fn name(&self) -> &str {
        self.ident.as_str()
    }

    pub fn ident(&self) -> &IdentPart {
        &self.ident
    }

    pub fn source_table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// The ordered list of fields a query returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowShape {
    fields: Vec<FieldMeta>,
}

impl RowShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a shape from bare field names (no table, not nullable).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fields: names
                .into_iter()
                .map(|name| FieldMeta::new(name.as_ref()))
                .collect(),
        }
    }

    pub fn push(&mut self, field: FieldMeta) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldMeta::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Two shapes are compatible when they list the same field names in the
    /// same order. Types are checked statically through `Combinable::Row`.
    pub fn is_compatible(&self, other: &RowShape) -> bool {
        self.len() == other.len() && self.names().eq(other.names())
    }

    pub(crate) fn name_list(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }
}

/// Which joined tables may contribute NULL columns to a result row.
///
/// Keys are table references (alias or name) as used to qualify columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinNullability {
    tables: BTreeMap<String, bool>,
}

impl JoinNullability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, table: impl Into<String>, nullable: bool) {
        self.tables.insert(table.into(), nullable);
    }

    /// Mark every table recorded so far as nullable (the effect of a RIGHT or
    /// FULL join on the tables to its left).
    pub fn set_all_nullable(&mut self) {
        for nullable in self.tables.values_mut() {
            *nullable = true;
        }
    }

    /// Unknown tables are reported as not nullable.
    pub fn is_nullable(&self, table: &str) -> bool {
        self.tables.get(table).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.tables.iter().map(|(t, n)| (t.as_str(), *n))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Whether `field` can be NULL in a result row: either the field itself is
    /// nullable or the table it comes from was outer-joined.
    pub fn field_is_nullable(&self, field: &FieldMeta) -> bool {
        field.is_nullable() || field.source_table().is_some_and(|t| self.is_nullable(t))
    }
}
