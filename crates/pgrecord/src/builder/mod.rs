//! Statement builders.
//!
//! Each builder combines a [`Record`]'s field descriptors with the template
//! engine and returns a [`Statement`]: final SQL text plus the ordered
//! parameter list. Builders never touch a connection, so the exact SQL can be
//! inspected and tested on its own.
//!
//! ## Column policy
//!
//! For every mapped field, in declaration order:
//!
//! - `skip`: never written
//! - `omitempty` and empty: column left out
//! - `nullable` and empty: column written as literal `NULL`, no parameter
//! - `raw`: the field's text is spliced into the statement
//! - otherwise: bound to the next `$n`
//!
//! Audit columns (`created_by`, `updated_by`) bind the actor id as a parameter.
//! UPDATE and soft delete refuse an empty WHERE.

pub mod delete;
pub mod insert;
pub mod update;

pub use delete::soft_delete;
pub use insert::{insert_many, insert_one};
pub use update::update;


use crate::error::{OrmError, OrmResult};
use crate::record::{FieldValue, Record};
use std::fmt;
use tokio_postgres::types::ToSql;

pub(crate) const CREATED_BY: &str = "created_by";
pub(crate) const UPDATED_BY: &str = "updated_by";
pub(crate) const UPDATED_AT: &str = "updated_at";
pub(crate) const DELETED_AT: &str = "deleted_at";

/// Final SQL text plus its positional parameters.
pub struct Statement<'a> {
    pub sql: String,
    pub params: Vec<&'a (dyn ToSql + Sync)>,
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("param_count", &self.params.len())
            .finish()
    }
}

/// Options shared by the insert and update builders.
#[derive(Debug, Clone)]
pub struct MutateOptions {
    audit: bool,
    conflict_key: Option<String>,
}

impl Default for MutateOptions {
    fn default() -> Self {
        Self {
            audit: true,
            conflict_key: None,
        }
    }
}

impl MutateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not stamp `created_by` / `updated_by` (e.g. self-registration, where
    /// there is no authenticated actor yet).
    pub fn without_actor(mut self) -> Self {
        self.audit = false;
        self
    }

    /// Turn an insert into an upsert keyed by `key` (`"email"` or `"a, b"`).
    pub fn on_conflict(mut self, key: impl Into<String>) -> Self {
        self.conflict_key = Some(key.into());
        self
    }

    pub fn audit(&self) -> bool {
        self.audit
    }

    pub fn conflict_key(&self) -> Option<&str> {
        self.conflict_key.as_deref()
    }
}

/// How one included column is written.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<'a> {
    Bind(&'a (dyn ToSql + Sync)),
    Null,
    Raw(&'a str),
}

/// Apply the column policy to `record`.
///
/// The result is aligned with `R::FIELDS`; `None` means the field is not written.
pub(crate) fn field_slots<R: Record>(record: &R) -> OrmResult<Vec<Option<Slot<'_>>>> {
    let values = record.values();
    if values.len() != R::FIELDS.len() {
        return Err(OrmError::shape(format!(
            "{} declares {} fields but produced {} values",
            R::NAME,
            R::FIELDS.len(),
            values.len()
        )));
    }

    R::FIELDS
        .iter()
        .zip(values)
        .map(|(field, value)| {
            use crate::record::FieldFlags as F;

            if field.is_skipped() {
                return Ok(None);
            }
            let empty = value.is_empty();
            if empty && field.flags.contains(F::OMIT_EMPTY) {
                return Ok(None);
            }
            if empty && field.flags.contains(F::NULLABLE) {
                return Ok(Some(Slot::Null));
            }
            match value {
                FieldValue::Bind { value, .. } => Ok(Some(Slot::Bind(value))),
                FieldValue::Raw { sql: Some(sql), .. } if !sql.trim().is_empty() => {
                    Ok(Some(Slot::Raw(sql)))
                }
                FieldValue::Raw { .. } => Err(OrmError::shape(format!(
                    "raw field '{}' of {} holds no SQL text",
                    field.column,
                    R::NAME
                ))),
            }
        })
        .collect()
}

/// Accumulates parameters and hands out `$n` placeholders.
#[derive(Default)]
pub(crate) struct Binder<'a> {
    params: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Binder<'a> {
    pub(crate) fn bind(&mut self, value: &'a (dyn ToSql + Sync)) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub(crate) fn render(&mut self, slot: Slot<'a>) -> String {
        match slot {
            Slot::Bind(value) => self.bind(value),
            Slot::Null => "NULL".to_string(),
            Slot::Raw(sql) => sql.to_string(),
        }
    }

    /// Index the next bound value would take.
    pub(crate) fn next_index(&self) -> usize {
        self.params.len() + 1
    }

    pub(crate) fn extend(&mut self, more: Vec<&'a (dyn ToSql + Sync)>) {
        self.params.extend(more);
    }

    pub(crate) fn finish(self, sql: String) -> Statement<'a> {
        Statement {
            sql,
            params: self.params,
        }
    }
}

/// The actor id to stamp, or `MissingActor` when auditing without one.
pub(crate) fn audit_actor<'a>(
    opts: &MutateOptions,
    actor: Option<&'a uuid::Uuid>,
) -> OrmResult<Option<&'a uuid::Uuid>> {
    if !opts.audit {
        return Ok(None);
    }
    actor.map(Some).ok_or(OrmError::MissingActor)
}

pub(crate) fn returning_clause(returning: &[&str]) -> String {
    if returning.is_empty() {
        String::new()
    } else {
        format!(" RETURNING {}", returning.join(", "))
    }
}

pub(crate) fn require_where(where_clause: &str, what: &str) -> OrmResult<()> {
    if where_clause.trim().is_empty() {
        return Err(OrmError::validation(format!(
            "{what} requires a WHERE clause"
        )));
    }
    Ok(())
}
