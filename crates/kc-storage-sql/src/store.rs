//! The `PostgreSQL` storage session.

use async_trait::async_trait;
use kc_storage::error::StorageResult;
use kc_storage::{StorageError, Transactional};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use crate::error::from_sqlx_error;

/// `PostgreSQL` implementation of every storage provider.
///
/// One `PgStore` is one session. Outside a transaction, statements run on
/// the pool; between [`Transactional::begin`] and commit or rollback they
/// run on a single connection. Create a session per unit of work with
/// [`PgStore::session`].
pub struct PgStore {
    pub(crate) pool: PgPool,
    pub(crate) tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgStore {
    /// Creates a new session over a pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: Mutex::new(None),
        }
    }

    /// Opens another session over the same pool.
    #[must_use]
    pub fn session(&self) -> Self {
        Self::new(self.pool.clone())
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Runs `$body` with `$ex` bound to the active transaction, or to the pool
/// when none is active.
macro_rules! with_executor {
    ($store:expr, |$ex:ident| $body:expr) => {{
        let mut guard = $store.tx.lock().await;
        match guard.as_mut() {
            Some(tx) => {
                let $ex = &mut **tx;
                $body
            }
            None => {
                let $ex = &$store.pool;
                $body
            }
        }
    }};
}

pub(crate) use with_executor;

#[async_trait]
impl Transactional for PgStore {
    async fn begin(&self) -> StorageResult<()> {
        let mut guard = self.tx.lock().await;
        if guard.is_some() {
            return Err(StorageError::Transaction(
                "transaction already active".to_string(),
            ));
        }

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        *guard = Some(tx);
        tracing::trace!("database transaction started");
        Ok(())
    }

    async fn commit(&self) -> StorageResult<()> {
        let Some(tx) = self.tx.lock().await.take() else {
            return Err(StorageError::Transaction(
                "no active transaction".to_string(),
            ));
        };

        tx.commit().await.map_err(from_sqlx_error)?;
        tracing::trace!("database transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> StorageResult<()> {
        let Some(tx) = self.tx.lock().await.take() else {
            return Err(StorageError::Transaction(
                "no active transaction".to_string(),
            ));
        };

        tx.rollback().await.map_err(from_sqlx_error)?;
        tracing::trace!("database transaction rolled back");
        Ok(())
    }
}
