//! Derive macros for pgrecord
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod record;
mod sql_ident;

/// Derive the `Record` mapping descriptor for a struct.
///
/// # Example
///
/// ```ignore
/// use pgrecord::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct Todo {
///     #[orm(column = "id", skip)]
///     id: uuid::Uuid,
///     #[orm(column = "title")]
///     title: String,
///     #[orm(column = "description", nullable)]
///     description: Option<String>,
///     #[orm(column = "due_date", omitempty)]
///     due_date: Option<chrono::NaiveDate>,
///     #[orm(column = "completed_at", raw, omitempty)]
///     completed_at: Option<String>,
///     // no #[orm(column ..)]: transient, never read or written
///     labels: Vec<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map the field to a column (`#[orm(column)]` uses the field name)
/// - `omitempty` - Leave the column out of INSERT/UPDATE when the value is empty
/// - `nullable` - Write literal `NULL` when the value is empty
/// - `skip` - Never write the column (still scanned when a query returns it)
/// - `raw` - The field holds SQL text spliced into the statement (e.g. `now()`)
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
