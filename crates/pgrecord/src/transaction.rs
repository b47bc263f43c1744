//! Transaction coordinator.
//!
//! [`Db::tx`] runs a unit of work on one pooled connection inside a
//! transaction:
//!
//! - `Ok(_)` from the unit of work commits.
//! - `Err(_)` rolls back and returns the original error.
//! - Dropping the future (or panicking) drops the uncommitted transaction,
//!   which rolls back.
//!
//! # Example
//!
//! ```ignore
//! let todo = db
//!     .tx(async |tx| {
//!         let mut created = Todo::default();
//!         tx.insert_one_returning(&new_todo, "todos", &mut created, MutateOptions::default())
//!             .await?;
//!         let pivots: Vec<TodoLabel> = label_ids
//!             .iter()
//!             .map(|label_id| TodoLabel { todo_id: created.id, label_id: *label_id })
//!             .collect();
//!         tx.insert_many(&pivots, "todo_label_pivot", MutateOptions::default())
//!             .await?;
//!         Ok(created)
//!     })
//!     .await?;
//! ```

use crate::accessor::{Db, TxAccessor};
use crate::error::{OrmError, OrmResult};

impl Db {
    /// Run `unit_of_work` inside a transaction on a single connection.
    ///
    /// The [`TxAccessor`] handed to the closure carries this accessor's actor
    /// and borrows the transaction, so it cannot escape the unit of work.
    pub async fn tx<T, F>(&self, unit_of_work: F) -> OrmResult<T>
    where
        F: AsyncFnOnce(&TxAccessor<'_>) -> OrmResult<T>,
    {
        let mut client = self
            .client()
            .get()
            .await
            .map_err(|e| OrmError::transaction("begin", e))?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| OrmError::transaction("begin", e))?;
        log_tx("begin");

        let accessor = TxAccessor::with_actor(transaction, self.actor());
        let outcome = unit_of_work(&accessor).await;
        let transaction = accessor.into_client();

        match outcome {
            Ok(value) => {
                transaction
                    .commit()
                    .await
                    .map_err(|e| OrmError::transaction("commit", e))?;
                log_tx("commit");
                Ok(value)
            }
            Err(error) => {
                match transaction.rollback().await {
                    Ok(()) => log_tx("rollback"),
                    #[cfg(feature = "tracing")]
                    Err(rollback_error) => tracing::warn!(
                        target: "pgrecord.tx",
                        error = %rollback_error,
                        original = %error,
                        "rollback failed",
                    ),
                    #[cfg(not(feature = "tracing"))]
                    Err(_) => {}
                }
                Err(error)
            }
        }
    }
}

fn log_tx(stage: &'static str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(target: "pgrecord.tx", stage);
    #[cfg(not(feature = "tracing"))]
    let _ = stage;
}
