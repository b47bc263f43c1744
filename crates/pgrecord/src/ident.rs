//! Identifier checks for the table and conflict-key names that statement
//! builders splice into SQL text.
//!
//! Identifiers cannot be bound as parameters, so anything a caller passes as a
//! table name or conflict key is validated before it reaches the statement:
//!
//! - unquoted segments match `[A-Za-z_][A-Za-z0-9_$]*`
//! - quoted segments (`"Name"`) allow anything except NUL, with `""` as the escape
//! - segments may be joined with `.` (`public.users`, `public."UserTable"`)

use crate::error::{OrmError, OrmResult};

/// Validate a (possibly schema-qualified) table name and return it unchanged.
pub fn table_name(name: &str) -> OrmResult<&str> {
    check_dotted(name.trim(), "table name")?;
    Ok(name.trim())
}

/// Validate a conflict key (`"email"` or `"user_id, label_id"`) and return its columns.
pub fn conflict_columns(key: &str) -> OrmResult<Vec<&str>> {
    let columns: Vec<&str> = key.split(',').map(str::trim).collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(OrmError::validation("conflict key must name at least one column"));
    }
    for column in &columns {
        check_dotted(column, "conflict key column")?;
    }
    Ok(columns)
}

fn check_dotted(s: &str, what: &str) -> OrmResult<()> {
    if s.is_empty() {
        return Err(OrmError::validation(format!("{what} cannot be empty")));
    }
    if s.contains('\0') {
        return Err(OrmError::validation(format!(
            "{what} cannot contain NUL character"
        )));
    }

    let mut chars = s.chars().peekable();
    let mut first_part = true;

    while chars.peek().is_some() || first_part {
        if !first_part {
            match chars.next() {
                Some('.') if chars.peek().is_some() => {}
                Some('.') => {
                    return Err(OrmError::validation(format!("Trailing '.' in {what} '{s}'")));
                }
                Some(c) => {
                    return Err(OrmError::validation(format!(
                        "Expected '.' between parts of {what} '{s}', got '{c}'"
                    )));
                }
                None => break,
            }
        }
        first_part = false;

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut len = 0usize;
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        len += 1;
                    }
                    Some('"') => break,
                    Some(_) => len += 1,
                    None => {
                        return Err(OrmError::validation(format!(
                            "Unclosed quoted identifier in {what} '{s}'"
                        )));
                    }
                }
            }
            if len == 0 {
                return Err(OrmError::validation(format!(
                    "Empty quoted identifier in {what} '{s}'"
                )));
            }
            continue;
        }

        let mut len = 0usize;
        while let Some(&c) = chars.peek() {
            if c == '.' {
                break;
            }
            let ok = if len == 0 {
                c == '_' || c.is_ascii_alphabetic()
            } else {
                c == '_' || c == '$' || c.is_ascii_alphanumeric()
            };
            if !ok {
                return Err(OrmError::validation(format!(
                    "Invalid character '{c}' in {what} '{s}'"
                )));
            }
            len += 1;
            chars.next();
        }
        if len == 0 {
            return Err(OrmError::validation(format!("Empty segment in {what} '{s}'")));
        }
    }

    Ok(())
}
