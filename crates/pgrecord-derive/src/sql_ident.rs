use std::collections::HashSet;

use proc_macro2::Span;
use syn::{Error, Result};

pub(crate) fn is_valid_sql_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn parse_sql_ident_with_span(s: &str, span: Span, what: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::new(span, format!("{what} must not be empty")));
    }
    if !is_valid_sql_ident(s) {
        return Err(Error::new(
            span,
            format!("{what} must be a valid SQL identifier (expected [A-Za-z_][A-Za-z0-9_]*)"),
        ));
    }
    Ok(s.to_string())
}

/// Tracks column names already mapped by a struct.
#[derive(Default)]
pub(crate) struct ColumnSet {
    seen: HashSet<String>,
}

impl ColumnSet {
    pub(crate) fn insert(&mut self, column: &str, span: Span) -> Result<()> {
        if !self.seen.insert(column.to_string()) {
            return Err(Error::new(
                span,
                format!("column '{column}' is mapped by more than one field"),
            ));
        }
        Ok(())
    }
}
