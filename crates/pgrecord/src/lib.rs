//! # pgrecord
//!
//! Hand-written SQL with named parameters, plus record-driven INSERT/UPDATE
//! generation for PostgreSQL.
//!
//! ## Features
//!
//! - **Named parameters**: `$<name>`, `$<name:list>` and `$<name:raw>` tokens
//!   are rewritten to positional `$n` placeholders
//! - **Record mapping**: `#[derive(Record)]` with `#[orm(column = "..")]` field
//!   metadata drives both statement generation and row scanning
//! - **Column policy**: `omitempty`, `nullable`, `skip` and `raw` flags decide
//!   how each field is written
//! - **Audit stamping**: `created_by` / `updated_by` from the accessor's actor,
//!   `updated_at = now()` on updates, soft delete through `deleted_at`
//! - **Transactions**: [`Db::tx`] commits on `Ok`, rolls back on `Err`
//!
//! ## Example
//!
//! ```ignore
//! use pgrecord::{Db, DbConfig, MutateOptions, Params, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct NewTodo {
//!     #[orm(column = "title")]
//!     title: String,
//!     #[orm(column = "due_date", omitempty)]
//!     due_date: Option<chrono::NaiveDate>,
//!     #[orm(column = "user_id")]
//!     user_id: uuid::Uuid,
//! }
//!
//! #[derive(Debug, Default, Record)]
//! struct TodoId {
//!     #[orm(column = "id")]
//!     id: uuid::Uuid,
//! }
//!
//! let mut db = Db::connect(&DbConfig::from_env()?)?;
//! db.set_actor_id(user_id);
//!
//! let mut created = TodoId::default();
//! db.insert_one_returning(&new_todo, "todos", &mut created, MutateOptions::default())
//!     .await?;
//!
//! let mut todos: Vec<TodoRow> = Vec::new();
//! db.select_many(
//!     "SELECT id, title FROM todos WHERE user_id = $<user_id> AND deleted_at IS NULL",
//!     &mut todos,
//!     &Params::new().bind("user_id", user_id),
//! )
//! .await?;
//! ```

pub mod accessor;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod ident;
pub mod materialize;
pub mod pool;
pub mod record;
pub mod template;
pub mod transaction;

pub use accessor::{Accessor, ActorContext, Db, TxAccessor};
pub use builder::{MutateOptions, Statement};
pub use client::GenericClient;
pub use config::DbConfig;
pub use error::{OrmError, OrmResult};
pub use materialize::{Destination, SelectOptions, scan_row};
pub use pool::{create_pool, create_pool_with_config};
pub use record::{FieldDescriptor, FieldFlags, FieldValue, RawSql, Record, Zero};
pub use template::{ParamValue, Params};

// Used by the code `#[derive(Record)]` generates.
pub use tokio_postgres;

#[cfg(feature = "derive")]
pub use pgrecord_derive::Record;
