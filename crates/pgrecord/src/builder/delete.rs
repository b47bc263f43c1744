use super::{Binder, DELETED_AT, Statement, require_where, returning_clause};
use crate::error::OrmResult;
use crate::ident;
use crate::template::{self, Params};

/// Build `UPDATE table SET deleted_at = now() WHERE <where_template>`.
///
/// Rows are never removed; the WHERE template is numbered from `$1`.
pub fn soft_delete<'a>(
    table: &str,
    where_template: &str,
    params: &'a Params,
    returning: &[&str],
) -> OrmResult<Statement<'a>> {
    let table = ident::table_name(table)?;
    require_where(where_template, "soft delete")?;

    let rendered = template::render(where_template, params, 1)?;
    let mut binder = Binder::default();
    binder.extend(rendered.params);

    let sql = format!(
        "UPDATE {table} SET {DELETED_AT} = now() WHERE {}{}",
        rendered.sql,
        returning_clause(returning)
    );
    Ok(binder.finish(sql))
}
