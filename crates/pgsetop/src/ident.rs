//! Validated SQL identifiers.
//!
//! [`Ident`] is a table, alias or column name, optionally dotted
//! (`public.users`) and optionally quoted (`"UserTable"`).
//!
//! - Unquoted parts match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow anything except NUL; `"` is escaped as `""`

use crate::error::{SqlError, SqlResult};
use std::fmt;

/// One dot-separated segment of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

impl IdentPart {
    /// The segment text without quotes.
    pub fn as_str(&self) -> &str {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }

    /// The segment that names `name` exactly: bare for a plain lowercase
    /// identifier, quoted otherwise so case and spaces survive.
    pub fn for_name(name: &str) -> Self {
        let mut chars = name.chars();
        let plain = chars
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_lowercase())
            && chars.all(|c| c == '_' || c == '$' || c.is_ascii_lowercase() || c.is_ascii_digit());
        if plain {
            IdentPart::Unquoted(name.to_string())
        } else {
            IdentPart::Quoted(name.to_string())
        }
    }

    /// Render the segment as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    fn write_sql(&self, out: &mut String) {
        match self {
            IdentPart::Unquoted(s) => out.push_str(s),
            IdentPart::Quoted(s) => {
                out.push('"');
                for ch in s.chars() {
                    if ch == '"' {
                        out.push('"');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
        }
    }
}

/// A SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier, accepting dotted and quoted forms
    /// (`users`, `public.users`, `public."UserTable".id`).
    pub fn parse(s: &str) -> SqlResult<Self> {
        if s.is_empty() {
            return Err(SqlError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(SqlError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = if rest.starts_with('"') {
                parse_quoted(rest)?
            } else {
                parse_unquoted(rest)?
            };
            parts.push(part);

            match tail.strip_prefix('.') {
                Some("") => return Err(SqlError::validation("Trailing '.' in identifier")),
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    let c = tail.chars().next().unwrap_or_default();
                    return Err(SqlError::validation(format!(
                        "Expected '.' between identifier parts, got '{c}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// Parse an identifier that must consist of exactly one segment
    /// (a column name or a table alias).
    pub fn single(s: &str) -> SqlResult<Self> {
        let ident = Self::parse(s)?;
        if ident.parts.len() != 1 {
            return Err(SqlError::validation(format!(
                "Expected a single identifier segment, got '{s}'"
            )));
        }
        Ok(ident)
    }

    pub fn parts(&self) -> &[IdentPart] {
        &self.parts
    }

    pub(crate) fn into_parts(self) -> Vec<IdentPart> {
        self.parts
    }

    /// Callers guarantee `parts` is non-empty and already validated.
    pub(crate) fn from_parts(parts: Vec<IdentPart>) -> Self {
        Self { parts }
    }

    /// The last segment with its quoting, e.g. `"Name"` for `u."Name"`.
    pub fn last_part(&self) -> Option<&IdentPart> {
        self.parts.last()
    }

    /// The last segment, e.g. `users` for `public.users`.
    pub fn last(&self) -> &str {
        self.parts.last().map(IdentPart::as_str).unwrap_or_default()
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            part.write_sql(out);
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn parse_quoted(s: &str) -> SqlResult<(IdentPart, &str)> {
    let mut name = String::new();
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        // `""` is an escaped quote.
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            name.push('"');
            continue;
        }
        if name.is_empty() {
            return Err(SqlError::validation("Empty quoted identifier"));
        }
        return Ok((IdentPart::Quoted(name), &s[i + 1..]));
    }
    Err(SqlError::validation("Unclosed quoted identifier"))
}

fn parse_unquoted(s: &str) -> SqlResult<(IdentPart, &str)> {
    let end = s.find('.').unwrap_or(s.len());
    let segment = &s[..end];

    let mut chars = segment.chars();
    match chars.next() {
        None => return Err(SqlError::validation("Empty identifier segment")),
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(SqlError::validation(format!(
                "Invalid identifier start character: '{c}'"
            )));
        }
    }
    if let Some(c) = chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        return Err(SqlError::validation(format!(
            "Invalid character in identifier: '{c}'"
        )));
    }

    Ok((IdentPart::Unquoted(segment.to_string()), &s[end..]))
}

/// Convert an input into an [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> SqlResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> SqlResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> SqlResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> SqlResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> SqlResult<Ident> {
        Ident::parse(&self)
    }
}
