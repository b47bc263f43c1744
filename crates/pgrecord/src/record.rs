//! Record mapping metadata.
//!
//! A [`Record`] is a struct whose fields carry `#[orm(column ..)]` metadata. The
//! derive macro turns that metadata into a static descriptor table once, at
//! compile time, so statement builders and the materializer never inspect types
//! at runtime.
//!
//! ```ignore
//! use pgrecord::Record;
//!
//! #[derive(Debug, Default, Record)]
//! struct NewTodo {
//!     #[orm(column = "title")]
//!     title: String,
//!     #[orm(column = "description", nullable)]
//!     description: Option<String>,
//!     #[orm(column = "due_date", omitempty)]
//!     due_date: Option<chrono::NaiveDate>,
//!     // transient: not part of any generated SQL
//!     label_ids: Vec<uuid::Uuid>,
//! }
//! ```

use crate::error::OrmResult;
use std::fmt;
use std::ops::BitOr;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Behavior flags attached to a mapped column.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FieldFlags(u8);

impl FieldFlags {
    /// No flags: the value is always bound.
    pub const NONE: Self = Self(0);
    /// `omitempty`: leave the column out when the value is empty.
    pub const OMIT_EMPTY: Self = Self(1);
    /// `nullable`: write literal `NULL` when the value is empty.
    pub const NULLABLE: Self = Self(1 << 1);
    /// `skip`: never part of generated SQL.
    pub const SKIP: Self = Self(1 << 2);
    /// `raw`: the value is SQL text spliced into the statement (e.g. `now()`).
    pub const RAW: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for FieldFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for FieldFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::OMIT_EMPTY, "omitempty"),
            (Self::NULLABLE, "nullable"),
            (Self::SKIP, "skip"),
            (Self::RAW, "raw"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in names {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Column name plus behavior flags for one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub column: &'static str,
    pub flags: FieldFlags,
}

impl FieldDescriptor {
    pub const fn new(column: &'static str, flags: FieldFlags) -> Self {
        Self { column, flags }
    }

    pub const fn is_skipped(&self) -> bool {
        self.flags.contains(FieldFlags::SKIP)
    }

    /// Whether the column can be scanned back from a result row.
    ///
    /// `raw` fields hold SQL text, not the column's value, so they are write-only.
    pub const fn is_readable(&self) -> bool {
        !self.flags.contains(FieldFlags::RAW)
    }
}

/// The value side of one mapped field, borrowed from a record instance.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    /// Bound as a positional parameter.
    Bind {
        value: &'a (dyn ToSql + Sync),
        empty: bool,
    },
    /// Spliced verbatim into the statement (`raw` fields). `None` when the
    /// field holds no SQL text.
    Raw { sql: Option<&'a str>, empty: bool },
}

impl<'a> FieldValue<'a> {
    pub fn bind<T>(value: &'a T) -> Self
    where
        T: ToSql + Sync + Zero,
    {
        Self::Bind {
            value,
            empty: value.is_zero(),
        }
    }

    pub fn raw<T>(value: &'a T) -> Self
    where
        T: RawSql + Zero,
    {
        Self::Raw {
            sql: value.raw_sql(),
            empty: value.is_zero(),
        }
    }

    /// Placeholder for a `skip` field, which never reaches generated SQL.
    pub const fn skipped() -> Self {
        Self::Raw {
            sql: None,
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bind { empty, .. } | Self::Raw { empty, .. } => *empty,
        }
    }
}

/// A struct mapped to table columns.
///
/// Usually derived with `#[derive(Record)]`; the implementation is the
/// per-type mapping descriptor.
pub trait Record {
    /// Type name used in error messages.
    const NAME: &'static str;

    /// Mapped fields in declaration order. Unmapped (transient) fields are absent.
    const FIELDS: &'static [FieldDescriptor];

    /// Values of the mapped fields, in the same order as [`Record::FIELDS`].
    fn values(&self) -> Vec<FieldValue<'_>>;

    /// Decode column `idx` of `row` into the field mapped to `column`.
    ///
    /// Returns `Ok(false)` when no field is mapped to `column`.
    fn assign(&mut self, column: &str, row: &Row, idx: usize) -> OrmResult<bool>;

    /// Columns listed in a `RETURNING` clause when this type is the destination.
    ///
    /// Every mapped column except `skip` and `raw` ones.
    fn returning_columns() -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|f| !f.is_skipped() && f.is_readable())
            .map(|f| f.column)
            .collect()
    }
}

/// Zero-value test used by `omitempty` and `nullable`.
///
/// Nilable values (`Option`) are empty when `None`; value types are empty when
/// equal to their zero value.
pub trait Zero {
    fn is_zero(&self) -> bool;
}

impl<T> Zero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

macro_rules! impl_zero_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Zero for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty as Default>::default()
                }
            }
        )*
    };
}

impl_zero_default!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    char,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    uuid::Uuid,
);

impl Zero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Zero for &str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Zero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Zero for serde_json::Value {
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

impl<T> Zero for tokio_postgres::types::Json<T>
where
    T: Default + PartialEq,
{
    fn is_zero(&self) -> bool {
        self.0 == T::default()
    }
}

/// Field types that can carry a raw SQL fragment.
pub trait RawSql {
    fn raw_sql(&self) -> Option<&str>;
}

impl RawSql for String {
    fn raw_sql(&self) -> Option<&str> {
        Some(self)
    }
}

impl RawSql for &str {
    fn raw_sql(&self) -> Option<&str> {
        Some(self)
    }
}

impl RawSql for Option<String> {
    fn raw_sql(&self) -> Option<&str> {
        self.as_deref()
    }
}

impl RawSql for Option<&str> {
    fn raw_sql(&self) -> Option<&str> {
        *self
    }
}
