//! Named-parameter SQL templates.
//!
//! Hand-written SQL refers to parameters by name instead of position:
//!
//! | token           | renders as              | binds            |
//! |-----------------|-------------------------|------------------|
//! | `$<name>`       | `$n`                    | one value        |
//! | `$<name:list>`  | `$n, $n+1, ...`         | one per element  |
//! | `$<name:raw>`   | the text itself         | nothing          |
//!
//! `raw` is for tokens the caller has already whitelisted (sort column, sort
//! direction). Never bind untrusted input as raw.
//!
//! # Example
//!
//! ```ignore
//! use pgrecord::{Params, template};
//!
//! let params = Params::new()
//!     .bind("user_id", user_id)
//!     .bind_list("priorities", vec!["high", "medium"])
//!     .bind_raw("order", "DESC");
//!
//! let rendered = template::render(
//!     "SELECT id FROM todos WHERE user_id = $<user_id> \
//!      AND priority IN ($<priorities:list>) ORDER BY created_at $<order:raw>",
//!     &params,
//!     1,
//! )?;
//! assert_eq!(
//!     rendered.sql,
//!     "SELECT id FROM todos WHERE user_id = $1 AND priority IN ($2, $3) ORDER BY created_at DESC"
//! );
//! ```

use crate::error::{OrmError, OrmResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};
use tokio_postgres::types::ToSql;

/// Shared, owned parameter value.
pub type SharedParam = Arc<dyn ToSql + Sync + Send>;

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| {
        Regex::new(r"\$<([^>]*)>").expect("invalid built-in template token regex")
    })
}

/// A value bound to a template name.
#[derive(Clone)]
pub enum ParamValue {
    Scalar(SharedParam),
    List(Vec<SharedParam>),
    Raw(String),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "list",
            Self::Raw(_) => "raw",
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            Self::List(vs) => f.debug_tuple("List").field(vs).finish(),
            Self::Raw(s) => f.debug_tuple("Raw").field(s).finish(),
        }
    }
}

/// Name -> value mapping for a template.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a scalar value (`$<name>`).
    pub fn bind<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.insert(name, ParamValue::Scalar(Arc::new(value)));
        self
    }

    /// Bind an ordered collection (`$<name:list>`).
    pub fn bind_list<T>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        let values = values
            .into_iter()
            .map(|v| Arc::new(v) as SharedParam)
            .collect();
        self.insert(name, ParamValue::List(values));
        self
    }

    /// Bind literal SQL text (`$<name:raw>`).
    pub fn bind_raw(mut self, name: impl Into<String>, text: impl fmt::Display) -> Self {
        self.insert(name, ParamValue::Raw(text.to_string()));
        self
    }

    /// Insert or replace a value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A template rewritten to positional placeholders.
#[derive(Debug)]
pub struct Rendered<'p> {
    pub sql: String,
    pub params: Vec<&'p (dyn ToSql + Sync)>,
    /// The placeholder index the next bound value would take.
    pub next_index: usize,
}

/// Rewrite `template` to `$n` placeholders, numbering from `start`.
///
/// Tokens are replaced left to right; a name used twice binds twice. An empty
/// list is a [`OrmError::Shape`] error and a malformed token a
/// [`OrmError::ParamKind`] error.
pub fn render<'p>(template: &str, params: &'p Params, start: usize) -> OrmResult<Rendered<'p>> {
    let re = token_regex();
    let mut sql = String::with_capacity(template.len());
    let mut bound: Vec<&'p (dyn ToSql + Sync)> = Vec::new();
    let mut index = start;
    let mut last = 0;

    for caps in re.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        sql.push_str(&template[last..whole.start()]);
        last = whole.end();

        let inner = caps.get(1).map_or("", |m| m.as_str());
        let (name, kind) = token_parts(inner)?;
        let value = params
            .get(name)
            .ok_or_else(|| OrmError::MissingParam(name.to_string()))?;

        match (kind, value) {
            (TokenKind::Scalar, ParamValue::Scalar(v)) => {
                let _ = write!(sql, "${index}");
                index += 1;
                bound.push(v.as_ref() as &(dyn ToSql + Sync));
            }
            (TokenKind::List, ParamValue::List(vs)) => {
                if vs.is_empty() {
                    return Err(OrmError::shape(format!("list parameter '{name}' is empty")));
                }
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    let _ = write!(sql, "${index}");
                    index += 1;
                    bound.push(v.as_ref() as &(dyn ToSql + Sync));
                }
            }
            (TokenKind::Raw, ParamValue::Raw(text)) => sql.push_str(text),
            (TokenKind::Unknown(other), _) => {
                return Err(OrmError::ParamKind {
                    name: format!("{name}:{other}"),
                    expected: "scalar, list or raw",
                    found: value.kind(),
                });
            }
            (kind, value) => {
                return Err(OrmError::ParamKind {
                    name: name.to_string(),
                    expected: kind.as_str(),
                    found: value.kind(),
                });
            }
        }
    }
    sql.push_str(&template[last..]);

    Ok(Rendered {
        sql,
        params: bound,
        next_index: index,
    })
}

#[derive(Debug, Clone, Copy)]
enum TokenKind<'t> {
    Scalar,
    List,
    Raw,
    Unknown(&'t str),
}

impl TokenKind<'_> {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::List => "list",
            Self::Raw => "raw",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Split the inside of `$<...>` into name and kind.
fn token_parts(inner: &str) -> OrmResult<(&str, TokenKind<'_>)> {
    let mut parts = inner.split(':').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let kind = parts.next();
    if name.is_empty() || kind == Some("") || parts.next().is_some() {
        return Err(OrmError::ParamKind {
            name: inner.to_string(),
            expected: "$<name>, $<name:list> or $<name:raw>",
            found: "malformed token",
        });
    }
    let kind = match kind {
        None => TokenKind::Scalar,
        Some("list") => TokenKind::List,
        Some("raw") => TokenKind::Raw,
        Some(other) => TokenKind::Unknown(other),
    };
    Ok((name, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debug_params(params: &[&(dyn ToSql + Sync)]) -> String {
        format!("{params:?}")
    }

    #[test]
    fn scalar_list_and_raw_tokens() {
        let params = Params::new()
            .bind("a", 1_i32)
            .bind_list("b", vec![2_i32, 3])
            .bind_raw("c", "now()");

        let out = render(
            "SELECT * FROM t WHERE a = $<a> AND b IN ($<b:list>) AND c = $<c:raw>",
            &params,
            1,
        )
        .unwrap();

        assert_eq!(
            out.sql,
            "SELECT * FROM t WHERE a = $1 AND b IN ($2, $3) AND c = now()"
        );
        assert_eq!(debug_params(&out.params), "[1, 2, 3]");
        assert_eq!(out.next_index, 4);
    }

    #[test]
    fn numbering_continues_from_start() {
        let params = Params::new().bind("id", 42_i64);
        let out = render("id = $<id>", &params, 4).unwrap();
        assert_eq!(out.sql, "id = $4");
        assert_eq!(out.next_index, 5);
    }

    #[test]
    fn repeated_name_binds_each_occurrence() {
        let params = Params::new().bind("search", "%milk%".to_string());
        let out = render(
            "(LOWER(title) LIKE LOWER($<search>) OR LOWER(description) LIKE LOWER($<search>))",
            &params,
            2,
        )
        .unwrap();
        assert_eq!(
            out.sql,
            "(LOWER(title) LIKE LOWER($2) OR LOWER(description) LIKE LOWER($3))"
        );
        assert_eq!(out.params.len(), 2);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let params = Params::new().bind("a", 1_i32);
        let err = render("a = $<a> AND b = $<b>", &params, 1).unwrap_err();
        assert!(matches!(err, OrmError::MissingParam(ref name) if name == "b"));
    }

    #[test]
    fn missing_parameter_with_empty_params_is_an_error() {
        let err = render("id = $<id>", &Params::new(), 1).unwrap_err();
        assert!(matches!(err, OrmError::MissingParam(_)));
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let params = Params::new().bind("ids", 1_i32);
        let err = render("id IN ($<ids:list>)", &params, 1).unwrap_err();
        assert!(matches!(
            err,
            OrmError::ParamKind {
                expected: "list",
                found: "scalar",
                ..
            }
        ));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let params = Params::new().bind("id", 1_i32);
        let err = render("id = $<id:json>", &params, 1).unwrap_err();
        assert!(matches!(err, OrmError::ParamKind { ref name, .. } if name == "id:json"));
    }

    #[test]
    fn empty_list_is_a_shape_error() {
        let params = Params::new().bind_list("ids", Vec::<i64>::new());
        let err = render("id NOT IN ($<ids:list>)", &params, 1).unwrap_err();
        assert!(matches!(err, OrmError::Shape(ref m) if m.contains("'ids'")));
    }

    #[test]
    fn malformed_tokens_are_errors() {
        let params = Params::new().bind("name", 1_i32).bind("a", 2_i32);
        for template in ["x = $<name:>", "x = $<a:b:c>", "x = $<>", "x = $<:raw>"] {
            let err = render(template, &params, 1).unwrap_err();
            assert!(
                matches!(err, OrmError::ParamKind { found: "malformed token", .. }),
                "{template}: {err:?}"
            );
        }
    }

    #[test]
    fn text_without_tokens_is_unchanged() {
        let params = Params::new();
        let out = render("SELECT 1 WHERE $1 = $2", &params, 1).unwrap();
        assert_eq!(out.sql, "SELECT 1 WHERE $1 = $2");
        assert!(out.params.is_empty());
    }

    #[test]
    fn raw_accepts_any_display_value() {
        let params = Params::new().bind_raw("limit", 5).bind_raw("order", "desc");
        let out = render("ORDER BY created_at $<order:raw> LIMIT $<limit:raw>", &params, 1).unwrap();
        assert_eq!(out.sql, "ORDER BY created_at desc LIMIT 5");
        assert!(out.params.is_empty());
    }
}
