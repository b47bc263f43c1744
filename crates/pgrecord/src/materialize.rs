//! Scanning result rows into records.

use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use tokio_postgres::Row;

/// Scan every column of `row` into `dest`.
///
/// Columns are matched by name. A column with no mapped field is a
/// [`OrmError::Mapping`] error; a value that cannot be decoded into the
/// field's type is [`OrmError::Decode`].
pub fn scan_row<R: Record>(row: &Row, dest: &mut R) -> OrmResult<()> {
    for (idx, column) in row.columns().iter().enumerate() {
        if !dest.assign(column.name(), row, idx)? {
            return Err(OrmError::unmapped(column.name(), R::NAME));
        }
    }
    Ok(())
}

/// Where the rows of a `RETURNING` clause (or a query) end up.
///
/// Implemented for a single record (`&mut T`) and a collection
/// (`&mut Vec<T>`).
pub trait Destination {
    /// Record type each row is scanned into.
    type Item: Record;

    /// Scan `rows` into the destination, returning how many were consumed.
    fn fill(self, rows: Vec<Row>) -> OrmResult<usize>;
}

/// Zero rows leave the record untouched; more than one is a cardinality error.
///
/// The row is scanned into a fresh record first, so a decode or mapping error
/// leaves `self` as it was.
impl<T: Record + Default> Destination for &mut T {
    type Item = T;

    fn fill(self, rows: Vec<Row>) -> OrmResult<usize> {
        match rows.as_slice() {
            [] => Ok(0),
            [row] => {
                let mut staged = T::default();
                scan_row(row, &mut staged)?;
                *self = staged;
                Ok(1)
            }
            _ => Err(OrmError::cardinality(1, rows.len())),
        }
    }
}

/// The collection is replaced by every row in result order. On error it keeps
/// its previous contents.
impl<T: Record + Default> Destination for &mut Vec<T> {
    type Item = T;

    fn fill(self, rows: Vec<Row>) -> OrmResult<usize> {
        let mut staged = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut item = T::default();
            scan_row(row, &mut item)?;
            staged.push(item);
        }
        *self = staged;
        Ok(rows.len())
    }
}

/// Options for single-row selects.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    not_found: Option<String>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`OrmError::NotFound`] carrying `message` when no row matches.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            not_found: Some(message.into()),
        }
    }

    pub fn not_found_message(&self) -> Option<&str> {
        self.not_found.as_deref()
    }
}
