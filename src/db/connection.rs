//! Database Connection Module
//!
//! Pool setup, per-statement timeouts and transactions over `sqlx::Any`.

use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use sqlx::any::AnyConnectOptions;
use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::{Any, AnyConnection, AnyPool, ConnectOptions, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};

type SharedTransaction = Arc<Mutex<Transaction<'static, Any>>>;

// == Database ==
/// Owner of the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    timeout: Duration,
}

impl Database {
    // == Connect ==
    /// Connects to Postgres using `config`.
    ///
    /// Statement logging is only enabled when `is_debug` is set.
    pub async fn connect(config: &DatabaseConfig, is_debug: bool) -> DbResult<Self> {
        let options = Self::pool_options(config);
        Self::connect_url(&config.to_url(), options, is_debug, config.query_timeout()).await
    }

    /// Pool sizing for `config`. sqlx pools have no idle cap, so idle
    /// connections are left to the pool's idle timeout and none are opened
    /// up front.
    pub fn pool_options(config: &DatabaseConfig) -> PoolOptions<Any> {
        PoolOptions::<Any>::new()
            .max_connections(config.max_open_connections)
            .min_connections(0)
    }

    /// Connects to any URL the installed sqlx drivers understand.
    pub async fn connect_url(
        url: &str,
        options: PoolOptions<Any>,
        is_debug: bool,
        timeout: Duration,
    ) -> DbResult<Self> {
        sqlx::any::install_default_drivers();

        let mut connect_options = AnyConnectOptions::from_str(url)?;
        if !is_debug {
            connect_options = connect_options.disable_statement_logging();
        }

        let pool = options.connect_with(connect_options).await?;
        info!(timeout = ?timeout, "database pool connected");

        Ok(Self { pool, timeout })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// A handle that runs each statement on a pooled connection.
    pub fn handle(&self) -> DbHandle {
        DbHandle {
            inner: HandleInner::Pool(self.pool.clone()),
            timeout: self.timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // == With Transaction ==
    /// Runs `f` inside a transaction.
    ///
    /// `f` receives a [`DbHandle`] bound to the transaction. The transaction
    /// commits when `f` returns `Ok`, rolls back when it returns `Err`, and
    /// rolls back before the panic is resumed when `f` panics.
    pub async fn with_transaction<F, Fut, R>(&self, f: F) -> DbResult<R>
    where
        F: FnOnce(DbHandle) -> Fut,
        Fut: Future<Output = DbResult<R>>,
    {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::Transaction(e.to_string()))?;
        let shared: SharedTransaction = Arc::new(Mutex::new(tx));
        let handle = DbHandle {
            inner: HandleInner::Transaction(shared.clone()),
            timeout: self.timeout,
        };
        debug!("transaction started");

        let outcome = AssertUnwindSafe(async move { f(handle).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => {
                let tx = Self::reclaim(shared)?;
                tx.commit()
                    .await
                    .map_err(|e| DbError::Transaction(e.to_string()))?;
                debug!("transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "transaction failed, rolling back");
                Self::rollback(shared).await;
                Err(err)
            }
            Err(panic) => {
                warn!("transaction panicked, rolling back");
                Self::rollback(shared).await;
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Takes the transaction back once the closure's handles are gone.
    fn reclaim(shared: SharedTransaction) -> DbResult<Transaction<'static, Any>> {
        Arc::try_unwrap(shared)
            .map(Mutex::into_inner)
            .map_err(|_| {
                DbError::Transaction("transaction handle outlived the transaction closure".to_string())
            })
    }

    /// Rolls back explicitly when possible. A transaction that is still
    /// shared is rolled back by sqlx when its last handle drops.
    async fn rollback(shared: SharedTransaction) {
        match Self::reclaim(shared) {
            Ok(tx) => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "rollback failed");
                }
            }
            Err(e) => warn!(error = %e, "deferring rollback to drop"),
        }
    }
}

// == Handle ==
#[derive(Clone)]
enum HandleInner {
    Pool(AnyPool),
    Transaction(SharedTransaction),
}

/// Cloneable access point repositories run their statements through.
///
/// Bound either to the pool or to an open transaction.
#[derive(Clone)]
pub struct DbHandle {
    inner: HandleInner,
    timeout: Duration,
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle")
            .field("in_transaction", &self.in_transaction())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DbHandle {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.inner, HandleInner::Transaction(_))
    }

    /// Acquires a connection: a pooled one, or the transaction's.
    pub(crate) async fn acquire(&self) -> DbResult<ConnectionGuard> {
        match &self.inner {
            HandleInner::Pool(pool) => Ok(ConnectionGuard::Pooled(pool.acquire().await?)),
            HandleInner::Transaction(tx) => {
                Ok(ConnectionGuard::Transaction(tx.clone().lock_owned().await))
            }
        }
    }

    /// Runs `fut` under the handle's timeout.
    pub(crate) async fn run<T, Fut>(&self, fut: Fut) -> DbResult<T>
    where
        Fut: Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.timeout, "database call timed out");
                Err(DbError::Timeout(self.timeout))
            }
        }
    }
}

/// A connection borrowed for the duration of one repository call.
pub(crate) enum ConnectionGuard {
    Pooled(PoolConnection<Any>),
    Transaction(OwnedMutexGuard<Transaction<'static, Any>>),
}

impl Deref for ConnectionGuard {
    type Target = AnyConnection;

    fn deref(&self) -> &AnyConnection {
        match self {
            ConnectionGuard::Pooled(conn) => &**conn,
            ConnectionGuard::Transaction(tx) => &***tx,
        }
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut AnyConnection {
        match self {
            ConnectionGuard::Pooled(conn) => &mut **conn,
            ConnectionGuard::Transaction(tx) => &mut ***tx,
        }
    }
}
