use super::{
    Binder, CREATED_BY, MutateOptions, Slot, Statement, UPDATED_BY, audit_actor, field_slots,
    returning_clause,
};
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::record::Record;

/// Build `INSERT INTO table (...) VALUES (...)` for one record.
///
/// `returning` lists the destination columns (empty for no `RETURNING`).
pub fn insert_one<'a, R: Record>(
    record: &'a R,
    table: &str,
    returning: &[&str],
    opts: &MutateOptions,
    actor: Option<&'a uuid::Uuid>,
) -> OrmResult<Statement<'a>> {
    let table = ident::table_name(table)?;
    let actor = audit_actor(opts, actor)?;
    let slots = field_slots(record)?;

    let mut binder = Binder::default();
    let mut columns: Vec<&'static str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    for (field, slot) in R::FIELDS.iter().zip(slots) {
        if let Some(slot) = slot {
            columns.push(field.column);
            values.push(binder.render(slot));
        }
    }

    let audit = audit_columns(&columns, actor.is_some());
    if let (Some(actor), false) = (actor, audit.is_empty()) {
        let placeholder = binder.bind(actor);
        for column in audit {
            columns.push(column);
            values.push(placeholder.clone());
        }
    }

    let mut sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    };
    if let Some(key) = opts.conflict_key() {
        sql.push_str(&upsert_clause(key, &columns)?);
    }
    sql.push_str(&returning_clause(returning));

    Ok(binder.finish(sql))
}

/// Build one multi-row `INSERT` for `records`, keeping input order.
///
/// The column list is the union of the columns each row writes. A row that
/// leaves an `omitempty` column out gets `DEFAULT` in that position, which is
/// what omitting the column means for a single-row insert.
pub fn insert_many<'a, R: Record>(
    records: &'a [R],
    table: &str,
    returning: &[&str],
    opts: &MutateOptions,
    actor: Option<&'a uuid::Uuid>,
) -> OrmResult<Statement<'a>> {
    if records.is_empty() {
        return Err(OrmError::shape(format!(
            "insert_many into '{table}' needs at least one {}",
            R::NAME
        )));
    }
    if records.len() == 1 {
        return insert_one(&records[0], table, returning, opts, actor);
    }

    let table = ident::table_name(table)?;
    let actor = audit_actor(opts, actor)?;
    let rows: Vec<Vec<Option<Slot<'a>>>> = records
        .iter()
        .map(field_slots)
        .collect::<OrmResult<_>>()?;

    let included: Vec<usize> = (0..R::FIELDS.len())
        .filter(|&i| rows.iter().any(|row| row[i].is_some()))
        .collect();
    let mut columns: Vec<&'static str> = included.iter().map(|&i| R::FIELDS[i].column).collect();
    let audit = audit_columns(&columns, actor.is_some());

    if columns.is_empty() && audit.is_empty() {
        return Err(OrmError::shape(format!(
            "insert_many into '{table}': {} writes no columns",
            R::NAME
        )));
    }

    let mut binder = Binder::default();
    let mut tuples: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in &rows {
        let tuple = included
            .iter()
            .map(|&i| match row[i] {
                Some(slot) => binder.render(slot),
                None => "DEFAULT".to_string(),
            })
            .collect();
        tuples.push(tuple);
    }

    if let (Some(actor), false) = (actor, audit.is_empty()) {
        let placeholder = binder.bind(actor);
        for tuple in &mut tuples {
            tuple.extend(audit.iter().map(|_| placeholder.clone()));
        }
        columns.extend(audit.iter().copied());
    }

    let values = tuples
        .iter()
        .map(|t| format!("({})", t.join(", ")))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("INSERT INTO {table} ({}) VALUES {values}", columns.join(", "));
    if let Some(key) = opts.conflict_key() {
        sql.push_str(&upsert_clause(key, &columns)?);
    }
    sql.push_str(&returning_clause(returning));

    Ok(binder.finish(sql))
}

/// Audit columns to append; a column the record already writes is left alone.
fn audit_columns(columns: &[&str], audit: bool) -> Vec<&'static str> {
    if !audit {
        return Vec::new();
    }
    [CREATED_BY, UPDATED_BY]
        .into_iter()
        .filter(|c| !columns.contains(c))
        .collect()
}

fn upsert_clause(key: &str, columns: &[&str]) -> OrmResult<String> {
    let key_columns = ident::conflict_columns(key)?;
    let set: Vec<String> = columns
        .iter()
        .filter(|c| **c != CREATED_BY && !key_columns.contains(c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();

    if set.is_empty() {
        Ok(format!(" ON CONFLICT ({}) DO NOTHING", key_columns.join(", ")))
    } else {
        Ok(format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            key_columns.join(", "),
            set.join(", ")
        ))
    }
}
