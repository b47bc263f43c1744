use super::{
    Binder, MutateOptions, Statement, UPDATED_AT, UPDATED_BY, audit_actor, field_slots,
    require_where, returning_clause,
};
use crate::error::OrmResult;
use crate::ident;
use crate::record::Record;
use crate::template::{self, Params};

/// Build `UPDATE table SET ... WHERE <where_template>`.
///
/// The SET clause follows the column policy of the record, then always sets
/// `updated_at = now()` and, when auditing, `updated_by`. The WHERE template
/// is numbered from the SET clause's last placeholder + 1, so both parameter
/// lists concatenate in order.
pub fn update<'a, R: Record>(
    record: &'a R,
    table: &str,
    where_template: &str,
    params: &'a Params,
    returning: &[&str],
    opts: &MutateOptions,
    actor: Option<&'a uuid::Uuid>,
) -> OrmResult<Statement<'a>> {
    let table = ident::table_name(table)?;
    require_where(where_template, "update")?;
    let actor = audit_actor(opts, actor)?;
    let slots = field_slots(record)?;

    let mut binder = Binder::default();
    let mut columns: Vec<&'static str> = Vec::new();
    let mut assignments: Vec<String> = Vec::new();

    for (field, slot) in R::FIELDS.iter().zip(slots) {
        if let Some(slot) = slot {
            columns.push(field.column);
            assignments.push(format!("{} = {}", field.column, binder.render(slot)));
        }
    }
    if let Some(actor) = actor {
        if !columns.contains(&UPDATED_BY) {
            assignments.push(format!("{UPDATED_BY} = {}", binder.bind(actor)));
        }
    }
    if !columns.contains(&UPDATED_AT) {
        assignments.push(format!("{UPDATED_AT} = now()"));
    }

    let rendered = template::render(where_template, params, binder.next_index())?;
    binder.extend(rendered.params);

    let sql = format!(
        "UPDATE {table} SET {} WHERE {}{}",
        assignments.join(", "),
        rendered.sql,
        returning_clause(returning)
    );
    Ok(binder.finish(sql))
}
