//! The database accessor: templated reads and record-driven writes.
//!
//! [`Accessor`] pairs a [`GenericClient`] with the acting user's identity.
//! [`Db`] wraps the connection pool and is meant to be constructed once and
//! cloned per request; [`TxAccessor`] is the same API bound to one open
//! transaction (see [`Db::tx`]).
//!
//! ```ignore
//! use pgrecord::{Db, DbConfig, MutateOptions, Params};
//!
//! let mut db = Db::connect(&DbConfig::from_env()?)?;
//! db.set_actor_id(user_id);
//!
//! db.insert_one(&new_label, "label_todos", MutateOptions::default()).await?;
//!
//! let mut labels: Vec<Label> = Vec::new();
//! db.select_many(
//!     "SELECT id, name FROM label_todos WHERE user_id = $<user_id> AND deleted_at IS NULL",
//!     &mut labels,
//!     &Params::new().bind("user_id", user_id),
//! )
//! .await?;
//! ```

use crate::builder::{self, MutateOptions, Statement};
use crate::client::GenericClient;
use crate::config::DbConfig;
use crate::error::{OrmError, OrmResult};
use crate::materialize::{Destination, SelectOptions, scan_row};
use crate::pool::create_pool_with_config;
use crate::record::Record;
use crate::template::{self, Params};
use tokio_postgres::Row;
use uuid::Uuid;

/// Identity of the user performing writes, stamped into audit columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorContext {
    actor_id: Option<Uuid>,
}

impl ActorContext {
    pub fn new(actor_id: Uuid) -> Self {
        Self {
            actor_id: Some(actor_id),
        }
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        self.actor_id
    }
}

/// Database operations over a client of type `C`.
#[derive(Debug, Clone)]
pub struct Accessor<C> {
    client: C,
    actor: ActorContext,
}

/// Pool-backed accessor.
pub type Db = Accessor<deadpool_postgres::Pool>;

/// Accessor bound to an open transaction.
pub type TxAccessor<'t> = Accessor<deadpool_postgres::Transaction<'t>>;

impl<C> Accessor<C> {
    pub fn new(client: C) -> Self {
        Self::with_actor(client, ActorContext::default())
    }

    pub fn with_actor(client: C, actor: ActorContext) -> Self {
        Self { client, actor }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    pub fn set_actor_id(&mut self, actor_id: Uuid) {
        self.actor = ActorContext::new(actor_id);
    }

    pub fn clear_actor_id(&mut self) {
        self.actor = ActorContext::default();
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        self.actor.actor_id
    }

    pub fn actor(&self) -> ActorContext {
        self.actor
    }
}

impl Db {
    /// Build the pool described by `config`. No connection is opened yet.
    pub fn connect(config: &DbConfig) -> OrmResult<Self> {
        Ok(Self::new(create_pool_with_config(config)?))
    }
}

impl<C: GenericClient> Accessor<C> {
    // ==================== reads ====================

    /// Run `query` and scan at most one row into `dest`.
    ///
    /// Returns `Ok(false)` and leaves `dest` untouched when nothing matches;
    /// more than one row is [`OrmError::Cardinality`].
    pub async fn select_one<T: Record + Default>(
        &self,
        query: &str,
        dest: &mut T,
        params: &Params,
    ) -> OrmResult<bool> {
        self.select_one_with(query, dest, params, SelectOptions::default())
            .await
    }

    /// [`select_one`](Self::select_one) with options, e.g.
    /// `SelectOptions::not_found("todo not found")` to turn "no row" into
    /// [`OrmError::NotFound`].
    pub async fn select_one_with<T: Record + Default>(
        &self,
        query: &str,
        dest: &mut T,
        params: &Params,
        opts: SelectOptions,
    ) -> OrmResult<bool> {
        let rows = self.query_template("select_one", query, params).await?;
        if rows.is_empty() {
            return match opts.not_found_message() {
                Some(message) => Err(OrmError::not_found(message)),
                None => Ok(false),
            };
        }
        Ok(dest.fill(rows)? == 1)
    }

    /// Run `query` and replace the contents of `dest` with every row.
    pub async fn select_many<T: Record + Default>(
        &self,
        query: &str,
        dest: &mut Vec<T>,
        params: &Params,
    ) -> OrmResult<()> {
        let rows = self.query_template("select_many", query, params).await?;
        dest.fill(rows)?;
        Ok(())
    }

    /// Owned form of [`select_one`](Self::select_one).
    pub async fn fetch_one<T: Record + Default>(
        &self,
        query: &str,
        params: &Params,
    ) -> OrmResult<Option<T>> {
        let rows = self.query_template("fetch_one", query, params).await?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => {
                let mut item = T::default();
                scan_row(row, &mut item)?;
                Ok(Some(item))
            }
            _ => Err(OrmError::cardinality(1, rows.len())),
        }
    }

    /// Owned form of [`select_many`](Self::select_many).
    pub async fn fetch_all<T: Record + Default>(
        &self,
        query: &str,
        params: &Params,
    ) -> OrmResult<Vec<T>> {
        let mut items = Vec::new();
        self.select_many(query, &mut items, params).await?;
        Ok(items)
    }

    // ==================== inserts ====================

    /// Insert one record, returning the affected row count.
    pub async fn insert_one<R: Record>(
        &self,
        record: &R,
        table: &str,
        opts: MutateOptions,
    ) -> OrmResult<u64> {
        let actor = self.actor.actor_id;
        let stmt = builder::insert_one(record, table, &[], &opts, actor.as_ref())?;
        self.execute_statement("insert_one", &stmt).await
    }

    /// Insert one record and scan the `RETURNING` row into `dest`.
    ///
    /// `Ok(false)` means no row came back (an upsert that did nothing); `dest`
    /// is untouched then.
    pub async fn insert_one_returning<R: Record, T: Record + Default>(
        &self,
        record: &R,
        table: &str,
        dest: &mut T,
        opts: MutateOptions,
    ) -> OrmResult<bool> {
        let actor = self.actor.actor_id;
        let returning = T::returning_columns();
        let stmt = builder::insert_one(record, table, &returning, &opts, actor.as_ref())?;
        let rows = self.query_statement("insert_one", &stmt).await?;
        Ok(dest.fill(rows)? == 1)
    }

    /// Insert every record with one multi-row statement.
    pub async fn insert_many<R: Record>(
        &self,
        records: &[R],
        table: &str,
        opts: MutateOptions,
    ) -> OrmResult<u64> {
        let actor = self.actor.actor_id;
        let stmt = builder::insert_many(records, table, &[], &opts, actor.as_ref())?;
        self.execute_statement("insert_many", &stmt).await
    }

    /// Insert every record and collect the `RETURNING` rows into `dest`.
    ///
    /// `dest[i]` corresponds to `records[i]`. Without a conflict key the number
    /// of returned rows must equal `records.len()`.
    pub async fn insert_many_returning<R: Record, T: Record + Default>(
        &self,
        records: &[R],
        table: &str,
        dest: &mut Vec<T>,
        opts: MutateOptions,
    ) -> OrmResult<()> {
        let actor = self.actor.actor_id;
        let returning = T::returning_columns();
        let stmt = builder::insert_many(records, table, &returning, &opts, actor.as_ref())?;
        let rows = self.query_statement("insert_many", &stmt).await?;
        if opts.conflict_key().is_none() && rows.len() != records.len() {
            return Err(OrmError::cardinality(records.len(), rows.len()));
        }
        dest.fill(rows)?;
        Ok(())
    }

    // ==================== updates ====================

    /// Update the rows matched by `where_clause`, returning the affected count.
    pub async fn update<R: Record>(
        &self,
        record: &R,
        table: &str,
        where_clause: &str,
        params: &Params,
        opts: MutateOptions,
    ) -> OrmResult<u64> {
        let actor = self.actor.actor_id;
        let stmt = builder::update(
            record,
            table,
            where_clause,
            params,
            &[],
            &opts,
            actor.as_ref(),
        )?;
        self.execute_statement("update", &stmt).await
    }

    /// Update and scan the `RETURNING` rows into `dest` (`&mut T` or
    /// `&mut Vec<T>`), returning how many rows were scanned.
    ///
    /// The UPDATE has already run when the rows are scanned. A
    /// [`OrmError::Cardinality`] error from a `&mut T` destination that matched
    /// several rows therefore does not undo the update; run it inside
    /// [`Db::tx`] when the change must be all or nothing.
    pub async fn update_returning<R: Record, D: Destination>(
        &self,
        record: &R,
        table: &str,
        where_clause: &str,
        params: &Params,
        dest: D,
        opts: MutateOptions,
    ) -> OrmResult<usize> {
        let actor = self.actor.actor_id;
        let returning = <D::Item as Record>::returning_columns();
        let stmt = builder::update(
            record,
            table,
            where_clause,
            params,
            &returning,
            &opts,
            actor.as_ref(),
        )?;
        let rows = self.query_statement("update", &stmt).await?;
        dest.fill(rows)
    }

    /// Mark the matched rows deleted (`deleted_at = now()`).
    pub async fn soft_delete(
        &self,
        table: &str,
        where_clause: &str,
        params: &Params,
    ) -> OrmResult<u64> {
        let stmt = builder::soft_delete(table, where_clause, params, &[])?;
        self.execute_statement("soft_delete", &stmt).await
    }

    /// Soft delete and collect the `RETURNING` rows into `dest`.
    pub async fn soft_delete_returning<T: Record + Default>(
        &self,
        table: &str,
        where_clause: &str,
        params: &Params,
        dest: &mut Vec<T>,
    ) -> OrmResult<()> {
        let returning = T::returning_columns();
        let stmt = builder::soft_delete(table, where_clause, params, &returning)?;
        let rows = self.query_statement("soft_delete", &stmt).await?;
        dest.fill(rows)?;
        Ok(())
    }

    // ==================== execution ====================

    async fn query_template(
        &self,
        op: &'static str,
        query: &str,
        params: &Params,
    ) -> OrmResult<Vec<Row>> {
        let rendered = template::render(query, params, 1)?;
        let stmt = Statement {
            sql: rendered.sql,
            params: rendered.params,
        };
        self.query_statement(op, &stmt).await
    }

    async fn query_statement(&self, op: &'static str, stmt: &Statement<'_>) -> OrmResult<Vec<Row>> {
        log_statement(op, stmt);
        self.client.query(&stmt.sql, &stmt.params).await
    }

    async fn execute_statement(&self, op: &'static str, stmt: &Statement<'_>) -> OrmResult<u64> {
        log_statement(op, stmt);
        self.client.execute(&stmt.sql, &stmt.params).await
    }
}

fn log_statement(op: &'static str, stmt: &Statement<'_>) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgrecord.sql",
        op,
        param_count = stmt.params.len(),
        sql = %stmt.sql,
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (op, stmt);
}
